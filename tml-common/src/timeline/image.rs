//! Image payload schema and single/sequence disambiguation
//!
//! Stored image blobs carry no tag telling a bare record apart from a
//! sequence of records; both are grammar arrays. Decoding tries the bare
//! record first and falls back to the sequence shape.

use serde::{Deserialize, Serialize};

use super::discriminant::Category;
use super::schema::{FieldWriter, Fields};
use crate::error::CodecError;
use crate::legacy::{self, Key, Value};

/// Every field name an image record may carry
pub const IMAGE_FIELDS: &[&str] = &[
    "cat",
    "grp_id",
    "grp_name",
    "name",
    "title",
    "id",
    "uid",
    "subject_id",
    "images",
];

/// Display thumbnail reference for one timeline subject
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub cat: Option<u32>,
    pub group_id: Option<String>,
    pub group_name: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    /// Written as a string for doujin (category 9) rows, an integer otherwise
    pub id: Option<u32>,
    pub user_id: Option<String>,
    pub subject_id: Option<String>,
    pub images: Option<String>,
}

impl ImageRecord {
    /// Record used by subject activities: subject id plus cover path
    pub fn for_subject(subject_id: u32, images: impl Into<String>) -> Self {
        Self {
            subject_id: Some(subject_id.to_string()),
            images: Some(images.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == ImageRecord::default()
    }

    fn read(f: &Fields<'_>) -> Self {
        Self {
            cat: f.int("cat"),
            group_id: f.string("grp_id"),
            group_name: f.string("grp_name"),
            name: f.string("name"),
            title: f.string("title"),
            id: f.int("id"),
            user_id: f.string("uid"),
            subject_id: f.string("subject_id"),
            images: f.string("images"),
        }
    }

    pub(crate) fn to_value(&self, category: u8) -> Result<Value, CodecError> {
        let mut w = FieldWriter::new();
        w.int("cat", self.cat)
            .str("grp_id", &self.group_id)
            .str("grp_name", &self.group_name)
            .str("name", &self.name)
            .str("title", &self.title);
        if category == Category::Doujin.as_u8() {
            w.int_text("id", self.id);
        } else {
            w.int("id", self.id);
        }
        w.str("uid", &self.user_id)
            .str("subject_id", &self.subject_id)
            .str("images", &self.images);

        if w.is_empty() {
            return Err(CodecError::EmptyImageRecord);
        }
        Ok(w.finish())
    }

    /// Read one bare record; any non-field key or nested array disqualifies it
    pub(crate) fn from_value(value: &Value) -> Result<Self, CodecError> {
        let fields = Fields::new(value, "image record")?;
        for (key, v) in value.as_array().unwrap_or_default() {
            let known = matches!(key, Key::Str(name) if IMAGE_FIELDS.contains(&name.as_str()));
            if !known {
                return Err(CodecError::UnexpectedShape(format!(
                    "image record has unknown key {:?}",
                    key.to_string()
                )));
            }
            if v.is_array() {
                return Err(CodecError::UnexpectedShape(format!(
                    "image field {} holds an array",
                    key
                )));
            }
        }
        Ok(Self::read(&fields))
    }
}

/// A bare record, or two or more records in order
///
/// `Many` holding a single record is encoded bare and reads back as
/// `Single`; build payloads with [`ImagePayload::from_records`] to get the
/// canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePayload {
    Single(ImageRecord),
    Many(Vec<ImageRecord>),
}

impl ImagePayload {
    /// Normalize a record list: one record becomes `Single`
    pub fn from_records(mut records: Vec<ImageRecord>) -> Result<Self, CodecError> {
        match records.len() {
            0 => Err(CodecError::EmptyImagePayload),
            1 => Ok(ImagePayload::Single(records.remove(0))),
            _ => Ok(ImagePayload::Many(records)),
        }
    }

    pub fn records(&self) -> &[ImageRecord] {
        match self {
            ImagePayload::Single(r) => std::slice::from_ref(r),
            ImagePayload::Many(rs) => rs,
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

fn record_sequence(value: &Value) -> Result<Vec<ImageRecord>, CodecError> {
    let pairs = value.as_array().ok_or_else(|| {
        CodecError::UnexpectedShape(format!("image payload is a {}, expected array", value.kind()))
    })?;
    if pairs.is_empty() {
        return Err(CodecError::EmptyImagePayload);
    }
    pairs
        .iter()
        .map(|(_, v)| ImageRecord::from_value(v))
        .collect()
}

/// Decode an image blob, bare record first, record sequence second
///
/// An empty array is read as a single record with no fields: old rows
/// contain it and it must not be rejected.
pub fn decode_image(bytes: &[u8]) -> Result<ImagePayload, CodecError> {
    let value = legacy::decode(bytes)?;
    decode_image_value(&value)
}

pub(crate) fn decode_image_value(value: &Value) -> Result<ImagePayload, CodecError> {
    let single = match ImageRecord::from_value(value) {
        Ok(record) => return Ok(ImagePayload::Single(record)),
        Err(e) => e,
    };
    match record_sequence(value) {
        Ok(records) => ImagePayload::from_records(records),
        Err(sequence) => Err(CodecError::Ambiguous {
            single: Box::new(single),
            sequence: Box::new(sequence),
        }),
    }
}

/// Encode an image payload for a row of `category`
///
/// A single record is written bare; two or more as a sequence keyed 0..n.
pub fn encode_image(payload: &ImagePayload, category: u8) -> Result<Vec<u8>, CodecError> {
    let value = match payload.records() {
        [] => return Err(CodecError::EmptyImagePayload),
        [record] => record.to_value(category)?,
        records => Value::Array(
            records
                .iter()
                .enumerate()
                .map(|(i, r)| Ok::<_, CodecError>((Key::Int(i as i64), r.to_value(category)?)))
                .collect::<Result<Vec<_>, CodecError>>()?,
        ),
    };
    Ok(legacy::encode(&value))
}
