//! Decoded view of a stored timeline row

use serde::{Deserialize, Serialize};

use super::batch::Batch;
use super::discriminant::Discriminant;
use super::image::{decode_image, ImagePayload};
use super::memo::{decode_memo, MemoVariant};
use crate::db::models::{TimelineId, TimelineRecord};
use crate::error::CodecError;

/// Memo and image of a row, shaped by its `batch` flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum EntryContent {
    Single {
        memo: MemoVariant,
        image: Option<ImagePayload>,
    },
    Batch(Batch),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: TimelineId,
    pub user_id: u32,
    pub discriminant: Discriminant,
    pub related: String,
    pub dateline: i64,
    pub content: EntryContent,
}

impl TimelineEntry {
    /// Decode a stored row; empty image bytes mean no image
    pub fn decode(record: &TimelineRecord) -> Result<Self, CodecError> {
        let discriminant = record.discriminant();
        let content = if record.batch {
            EntryContent::Batch(Batch::decode(discriminant, &record.memo, &record.image)?)
        } else {
            let memo = decode_memo(discriminant, &record.memo)?;
            let image = if record.image.is_empty() {
                None
            } else {
                Some(decode_image(&record.image)?)
            };
            EntryContent::Single { memo, image }
        };

        Ok(Self {
            id: record.id,
            user_id: record.user_id,
            discriminant,
            related: record.related.clone(),
            dateline: record.dateline,
            content,
        })
    }

    pub fn is_batch(&self) -> bool {
        matches!(self.content, EntryContent::Batch(_))
    }
}
