//! # Timeline Writer
//!
//! Records user activity as timeline rows, folding consecutive activity of
//! the same kind into batch rows.

pub mod activity;
pub mod merge;

pub use activity::{ActivityRecorder, EpisodeSummary, SubjectActivity, SubjectSummary};
pub use merge::{plan_merge, Activity, FreshReason, MergeEngine, MergeOutcome, MergePlan, MergePolicy};
