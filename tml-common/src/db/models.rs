//! Database models

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::timeline::Discriminant;

/// Primary key of a timeline row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimelineId(pub i64);

impl fmt::Display for TimelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored timeline row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineRecord {
    pub id: TimelineId,
    pub user_id: u32,
    pub category: u8,
    pub subtype: u16,
    /// Primary subject of the event, as text
    pub related: String,
    pub memo: Vec<u8>,
    pub image: Vec<u8>,
    pub batch: bool,
    pub source: u8,
    pub replies: u32,
    /// Unix seconds
    pub dateline: i64,
}

impl TimelineRecord {
    pub fn discriminant(&self) -> Discriminant {
        Discriminant::new(self.category, self.subtype)
    }
}

/// A row about to be inserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimelineRecord {
    pub user_id: u32,
    pub category: u8,
    pub subtype: u16,
    pub related: String,
    pub memo: Vec<u8>,
    pub image: Vec<u8>,
    pub batch: bool,
    pub source: u8,
    pub dateline: i64,
}

impl NewTimelineRecord {
    pub fn discriminant(&self) -> Discriminant {
        Discriminant::new(self.category, self.subtype)
    }
}
