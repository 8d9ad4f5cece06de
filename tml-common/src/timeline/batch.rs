//! Keyed batch payloads
//!
//! A batch row stores its memo and image blobs as grammar arrays keyed by
//! the stringified subject id. Keys are written as strings; integer keys
//! found in old rows are accepted and stringified.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::discriminant::{Discriminant, MemoKind};
use super::image::{ImagePayload, ImageRecord};
use super::memo::MemoVariant;
use crate::error::CodecError;
use crate::legacy::{self, Key, Value};

/// Memo and image maps of one batch row, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub memos: IndexMap<String, MemoVariant>,
    pub images: IndexMap<String, ImageRecord>,
}

fn keyed_pairs(value: &Value, what: &str) -> Result<Vec<(String, Value)>, CodecError> {
    let pairs = value.as_array().ok_or_else(|| {
        CodecError::UnexpectedShape(format!("{} batch is a {}, expected array", what, value.kind()))
    })?;
    Ok(pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect())
}

fn unbatchable(discriminant: Discriminant) -> CodecError {
    CodecError::Unbatchable {
        category: discriminant.category,
        subtype: discriminant.subtype,
    }
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Promote a singleton row's payload into a one-entry batch under `key`
    ///
    /// A record with no fields (found in old rows) leaves the entry without
    /// an image.
    /// A singleton whose image is already a sequence is not a state the
    /// producer leaves behind, so it is rejected rather than guessed at.
    pub fn promote(
        key: String,
        memo: MemoVariant,
        image: Option<ImagePayload>,
    ) -> Result<Self, CodecError> {
        if memo.kind() == MemoKind::Say {
            return Err(unbatchable(memo.default_discriminant()));
        }
        let image = match image {
            None => None,
            Some(ImagePayload::Single(record)) if record.is_empty() => None,
            Some(ImagePayload::Single(record)) => Some(record),
            Some(ImagePayload::Many(records)) => {
                return Err(CodecError::UnexpectedShape(format!(
                    "singleton row carries {} image records",
                    records.len()
                )))
            }
        };
        let mut batch = Self::new();
        batch.upsert(key, memo, image);
        Ok(batch)
    }

    /// Insert or replace the entry for `key`; last write wins for both maps
    ///
    /// A replacement without an image drops the previous image of that key.
    pub fn upsert(&mut self, key: String, memo: MemoVariant, image: Option<ImageRecord>) {
        match image {
            Some(record) => {
                self.images.insert(key.clone(), record);
            }
            None => {
                self.images.shift_remove(&key);
            }
        }
        self.memos.insert(key, memo);
    }

    pub fn len(&self) -> usize {
        self.memos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memos.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.memos.keys().map(String::as_str)
    }

    /// Decode the blobs of a row whose `batch` flag is set
    ///
    /// Empty image bytes yield an empty image map; records with no fields
    /// are dropped.
    pub fn decode(
        discriminant: Discriminant,
        memo: &[u8],
        image: &[u8],
    ) -> Result<Self, CodecError> {
        let kind = discriminant.resolve()?;
        if kind == MemoKind::Say {
            return Err(unbatchable(discriminant));
        }

        let mut memos = IndexMap::new();
        for (key, value) in keyed_pairs(&legacy::decode(memo)?, "memo")? {
            memos.insert(key, MemoVariant::from_value(kind, &value)?);
        }

        let mut images = IndexMap::new();
        if !image.is_empty() {
            for (key, value) in keyed_pairs(&legacy::decode(image)?, "image")? {
                let record = ImageRecord::from_value(&value)?;
                if !record.is_empty() {
                    images.insert(key, record);
                }
            }
        }
        Ok(Self { memos, images })
    }

    /// Encode both maps for a row of `discriminant`; returns (memo, image) bytes
    ///
    /// An empty image map encodes as an empty array.
    pub fn encode(&self, discriminant: Discriminant) -> Result<(Vec<u8>, Vec<u8>), CodecError> {
        let mut memo_pairs = Vec::with_capacity(self.memos.len());
        for (key, memo) in &self.memos {
            let value = memo.to_value().ok_or_else(|| unbatchable(discriminant))?;
            memo_pairs.push((Key::from(key.as_str()), value));
        }

        let mut image_pairs = Vec::with_capacity(self.images.len());
        for (key, record) in &self.images {
            image_pairs.push((Key::from(key.as_str()), record.to_value(discriminant.category)?));
        }

        Ok((
            legacy::encode(&Value::Array(memo_pairs)),
            legacy::encode(&Value::Array(image_pairs)),
        ))
    }
}
