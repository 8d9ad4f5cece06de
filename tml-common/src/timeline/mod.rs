//! Timeline payload model and codecs
//!
//! A timeline row stores two grammar blobs, memo and image, whose schema is
//! chosen by the row's (category, subtype) discriminant. This module maps
//! those blobs to typed values and back.

pub mod batch;
pub mod discriminant;
pub mod entry;
pub mod image;
pub mod memo;
mod schema;
pub mod subject;

pub use batch::Batch;
pub use discriminant::{Category, Discriminant, MemoKind};
pub use entry::{EntryContent, TimelineEntry};
pub use image::{decode_image, encode_image, ImagePayload, ImageRecord, IMAGE_FIELDS};
pub use memo::{
    decode_memo, decode_memo_strict, encode_memo, BlogMemo, DoujinMemo, GroupMemo, IndexMemo,
    MemoVariant, MonoMemo, ProgressMemo, RelationMemo, SayEditMemo, SubjectMemo, Total, WikiMemo,
};
pub use subject::{collection_type, subject_collect_subtype, subject_type};
