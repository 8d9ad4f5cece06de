//! Batch merge engine
//!
//! A new single-subject activity either becomes a fresh row or is folded
//! into the user's latest row of the same discriminant. Planning is a pure
//! function of the previous row and the activity; applying the plan is the
//! only step that touches the store.

use std::sync::Arc;

use serde::Serialize;
use tml_common::config::MergeConfig;
use tml_common::db::{NewTimelineRecord, TimelineId, TimelineRecord, TimelineStore};
use tml_common::time::{elapsed_secs, format_dateline};
use tml_common::timeline::{
    decode_image, decode_memo, encode_image, encode_memo, Batch, Discriminant, ImagePayload,
    ImageRecord, MemoVariant,
};
use tml_common::{CodecError, Result};
use tracing::{debug, info, warn};

/// Which rows may merge, and for how long
#[derive(Debug, Clone, PartialEq)]
pub struct MergePolicy {
    pub window_secs: u64,
    pub eligible_categories: Vec<u8>,
}

impl Default for MergePolicy {
    fn default() -> Self {
        MergePolicy::from(&MergeConfig::default())
    }
}

impl From<&MergeConfig> for MergePolicy {
    fn from(config: &MergeConfig) -> Self {
        Self {
            window_secs: config.window_secs,
            eligible_categories: config.eligible_categories.clone(),
        }
    }
}

impl MergePolicy {
    pub fn is_eligible(&self, category: u8) -> bool {
        self.eligible_categories.contains(&category)
    }

    /// True when a row written at `previous` is still open at `now`
    pub fn within_window(&self, previous: i64, now: i64) -> bool {
        elapsed_secs(previous, now) <= self.window_secs
    }
}

/// A new single-subject activity to record
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub user_id: u32,
    pub discriminant: Discriminant,
    /// Primary subject id as text
    pub related: String,
    pub memo: MemoVariant,
    pub image: Option<ImageRecord>,
    pub dateline: i64,
    /// Cleared for activities that must always stand alone
    pub mergeable: bool,
}

impl Activity {
    fn fresh_record(&self) -> std::result::Result<NewTimelineRecord, CodecError> {
        let image = match &self.image {
            Some(record) => encode_image(
                &ImagePayload::Single(record.clone()),
                self.discriminant.category,
            )?,
            None => Vec::new(),
        };
        Ok(NewTimelineRecord {
            user_id: self.user_id,
            category: self.discriminant.category,
            subtype: self.discriminant.subtype,
            related: self.related.clone(),
            memo: encode_memo(&self.memo)?,
            image,
            batch: false,
            source: 0,
            dateline: self.dateline,
        })
    }
}

/// Why an activity went to a fresh row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshReason {
    NoPrevious,
    /// Category not eligible, or the memo has no batch key
    Ineligible,
    /// The activity itself opted out of merging
    Standalone,
    OutsideWindow,
    DiscriminantMismatch,
    /// The previous row could not be decoded or re-encoded
    MergeFallback(String),
}

/// Store operation computed for one activity
#[derive(Debug, Clone, PartialEq)]
pub enum MergePlan {
    Insert {
        record: NewTimelineRecord,
        reason: FreshReason,
    },
    Update {
        id: TimelineId,
        memo: Vec<u8>,
        image: Vec<u8>,
        batch: bool,
        subjects: usize,
    },
    /// Same dateline and identical payload as the latest row
    Duplicate { id: TimelineId },
}

/// Result of recording one activity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MergeOutcome {
    Inserted { id: TimelineId, reason: FreshReason },
    Merged { id: TimelineId, subjects: usize },
    Duplicate { id: TimelineId },
    /// The activity carried nothing worth recording
    Skipped,
}

impl MergeOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            MergeOutcome::Inserted { .. } => "inserted",
            MergeOutcome::Merged { .. } => "merged",
            MergeOutcome::Duplicate { .. } => "duplicate",
            MergeOutcome::Skipped => "skipped",
        }
    }
}

fn is_duplicate(previous: &TimelineRecord, fresh: &NewTimelineRecord) -> bool {
    previous.dateline == fresh.dateline
        && previous.discriminant() == fresh.discriminant()
        && previous.memo == fresh.memo
        && previous.image == fresh.image
}

/// Decode the previous row into a batch, promoting a singleton under its own key
fn previous_batch(previous: &TimelineRecord) -> std::result::Result<Batch, CodecError> {
    let discriminant = previous.discriminant();
    if previous.batch {
        return Batch::decode(discriminant, &previous.memo, &previous.image);
    }

    let memo = decode_memo(discriminant, &previous.memo)?;
    let image = if previous.image.is_empty() {
        None
    } else {
        Some(decode_image(&previous.image)?)
    };
    let key = memo.batch_key().unwrap_or_else(|| previous.related.clone());
    Batch::promote(key, memo, image)
}

/// Fold `activity` into `previous`, or explain why it cannot be
fn fold(
    previous: &TimelineRecord,
    activity: &Activity,
    key: String,
) -> std::result::Result<MergePlan, CodecError> {
    let mut batch = previous_batch(previous)?;
    batch.upsert(key, activity.memo.clone(), activity.image.clone());
    let (memo, image) = batch.encode(previous.discriminant())?;
    Ok(MergePlan::Update {
        id: previous.id,
        memo,
        image,
        batch: true,
        subjects: batch.len(),
    })
}

/// Decide what to do with `activity` given the user's latest matching row
///
/// Errors only come from encoding the new activity itself; anything wrong
/// with the previous row downgrades to a fresh insert.
pub fn plan_merge(
    previous: Option<&TimelineRecord>,
    activity: &Activity,
    policy: &MergePolicy,
) -> std::result::Result<MergePlan, CodecError> {
    let fresh = activity.fresh_record()?;
    let insert = |reason: FreshReason| MergePlan::Insert {
        record: fresh.clone(),
        reason,
    };

    let Some(previous) = previous else {
        return Ok(insert(FreshReason::NoPrevious));
    };

    if is_duplicate(previous, &fresh) {
        return Ok(MergePlan::Duplicate { id: previous.id });
    }

    if !activity.mergeable {
        return Ok(insert(FreshReason::Standalone));
    }
    if previous.discriminant() != activity.discriminant {
        return Ok(insert(FreshReason::DiscriminantMismatch));
    }
    let key = match activity.memo.batch_key() {
        Some(key) if policy.is_eligible(activity.discriminant.category) => key,
        _ => return Ok(insert(FreshReason::Ineligible)),
    };
    if !policy.within_window(previous.dateline, activity.dateline) {
        return Ok(insert(FreshReason::OutsideWindow));
    }

    match fold(previous, activity, key) {
        Ok(plan) => Ok(plan),
        Err(e) => Ok(insert(FreshReason::MergeFallback(e.to_string()))),
    }
}

/// Looks up, plans and applies merges against a [`TimelineStore`]
#[derive(Clone)]
pub struct MergeEngine {
    store: Arc<dyn TimelineStore>,
    policy: MergePolicy,
}

impl MergeEngine {
    pub fn new(store: Arc<dyn TimelineStore>, policy: MergePolicy) -> Self {
        Self { store, policy }
    }

    /// Record one activity
    ///
    /// Callers must serialize calls per user; see
    /// [`crate::activity::ActivityRecorder`].
    pub async fn record(&self, activity: &Activity) -> Result<MergeOutcome> {
        let d = activity.discriminant;
        let previous = self
            .store
            .get_latest(activity.user_id, d.category, d.subtype)
            .await?;

        match plan_merge(previous.as_ref(), activity, &self.policy)? {
            MergePlan::Insert { record, reason } => {
                if let FreshReason::MergeFallback(cause) = &reason {
                    warn!(
                        "Merge fallback for user {} {}: previous row {:?} unreadable ({})",
                        activity.user_id,
                        d,
                        previous.as_ref().map(|p| p.id),
                        cause
                    );
                }
                let id = self.store.insert(&record).await?;
                info!(
                    "Inserted timeline {} for user {} {} at {} ({:?})",
                    id,
                    activity.user_id,
                    d,
                    format_dateline(record.dateline),
                    reason
                );
                Ok(MergeOutcome::Inserted { id, reason })
            }
            MergePlan::Update {
                id,
                memo,
                image,
                batch,
                subjects,
            } => {
                self.store.update_payload(id, &memo, &image, batch).await?;
                info!(
                    "Merged activity of user {} into timeline {} ({} subjects)",
                    activity.user_id, id, subjects
                );
                Ok(MergeOutcome::Merged { id, subjects })
            }
            MergePlan::Duplicate { id } => {
                debug!(
                    "Skipping duplicate of timeline {} for user {}",
                    id, activity.user_id
                );
                Ok(MergeOutcome::Duplicate { id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tml_common::timeline::SubjectMemo;

    const D: Discriminant = Discriminant::new(3, 2);

    fn memo(id: u32) -> MemoVariant {
        MemoVariant::Subject(SubjectMemo {
            subject_id: Some(id),
            subject_type: Some(2),
            subject_name: Some(format!("subject {}", id)),
            ..Default::default()
        })
    }

    fn activity(id: u32, dateline: i64) -> Activity {
        Activity {
            user_id: 7,
            discriminant: D,
            related: id.to_string(),
            memo: memo(id),
            image: Some(ImageRecord::for_subject(id, format!("{}.jpg", id))),
            dateline,
            mergeable: true,
        }
    }

    fn stored(activity: &Activity) -> TimelineRecord {
        let fresh = activity.fresh_record().unwrap();
        TimelineRecord {
            id: TimelineId(1),
            user_id: fresh.user_id,
            category: fresh.category,
            subtype: fresh.subtype,
            related: fresh.related,
            memo: fresh.memo,
            image: fresh.image,
            batch: false,
            source: 0,
            replies: 0,
            dateline: fresh.dateline,
        }
    }

    fn reason(plan: MergePlan) -> FreshReason {
        match plan {
            MergePlan::Insert { reason, .. } => reason,
            other => panic!("expected insert, got {:?}", other),
        }
    }

    #[test]
    fn test_no_previous_inserts_singleton() {
        let plan = plan_merge(None, &activity(100, 1_000), &MergePolicy::default()).unwrap();
        match plan {
            MergePlan::Insert { record, reason } => {
                assert_eq!(reason, FreshReason::NoPrevious);
                assert!(!record.batch);
                assert_eq!(record.related, "100");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_within_window_merges_into_batch() {
        let prev = stored(&activity(100, 1_000));
        let plan = plan_merge(Some(&prev), &activity(200, 1_100), &MergePolicy::default()).unwrap();
        match plan {
            MergePlan::Update {
                id,
                memo,
                image,
                batch,
                subjects,
            } => {
                assert_eq!(id, prev.id);
                assert!(batch);
                assert_eq!(subjects, 2);
                let decoded = Batch::decode(D, &memo, &image).unwrap();
                assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["100", "200"]);
                assert_eq!(decoded.memos["100"], super::tests::memo(100));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_window_boundary() {
        let policy = MergePolicy::default();
        let prev = stored(&activity(100, 1_000));
        let at_edge = plan_merge(Some(&prev), &activity(200, 1_900), &policy).unwrap();
        assert!(matches!(at_edge, MergePlan::Update { .. }));
        let past = plan_merge(Some(&prev), &activity(200, 1_901), &policy).unwrap();
        assert_eq!(reason(past), FreshReason::OutsideWindow);
    }

    #[test]
    fn test_fresh_reasons() {
        let policy = MergePolicy::default();
        let prev = stored(&activity(100, 1_000));

        let mut standalone = activity(200, 1_010);
        standalone.mergeable = false;
        assert_eq!(
            reason(plan_merge(Some(&prev), &standalone, &policy).unwrap()),
            FreshReason::Standalone
        );

        let mut other_type = activity(200, 1_010);
        other_type.discriminant = Discriminant::new(3, 6);
        assert_eq!(
            reason(plan_merge(Some(&prev), &other_type, &policy).unwrap()),
            FreshReason::DiscriminantMismatch
        );

        let strict = MergePolicy {
            eligible_categories: vec![],
            ..MergePolicy::default()
        };
        assert_eq!(
            reason(plan_merge(Some(&prev), &activity(200, 1_010), &strict).unwrap()),
            FreshReason::Ineligible
        );
    }

    #[test]
    fn test_corrupt_previous_falls_back() {
        let mut prev = stored(&activity(100, 1_000));
        prev.memo = b"a:7:{s:3:".to_vec();
        let plan = plan_merge(Some(&prev), &activity(200, 1_010), &MergePolicy::default()).unwrap();
        assert!(matches!(reason(plan), FreshReason::MergeFallback(_)));
    }

    #[test]
    fn test_singleton_with_image_sequence_falls_back() {
        let mut prev = stored(&activity(100, 1_000));
        prev.image = encode_image(
            &ImagePayload::Many(vec![
                ImageRecord::for_subject(1, "a"),
                ImageRecord::for_subject(2, "b"),
            ]),
            3,
        )
        .unwrap();
        let plan = plan_merge(Some(&prev), &activity(200, 1_010), &MergePolicy::default()).unwrap();
        assert!(matches!(reason(plan), FreshReason::MergeFallback(_)));
    }

    #[test]
    fn test_duplicate_detected() {
        let a = activity(100, 1_000);
        let prev = stored(&a);
        let plan = plan_merge(Some(&prev), &a, &MergePolicy::default()).unwrap();
        assert_eq!(plan, MergePlan::Duplicate { id: prev.id });
    }

    #[test]
    fn test_same_subject_on_singleton_becomes_one_entry_batch() {
        let prev = stored(&activity(100, 1_000));
        let mut again = activity(100, 1_050);
        again.memo = MemoVariant::Subject(SubjectMemo {
            subject_id: Some(100),
            rate: Some(8),
            ..Default::default()
        });
        match plan_merge(Some(&prev), &again, &MergePolicy::default()).unwrap() {
            MergePlan::Update {
                id,
                memo,
                image,
                batch,
                subjects,
            } => {
                assert_eq!(id, prev.id);
                assert!(batch);
                assert_eq!(subjects, 1);
                let decoded = Batch::decode(D, &memo, &image).unwrap();
                assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["100"]);
                assert_eq!(decoded.memos["100"], again.memo);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_singleton_with_empty_image_record_still_merges() {
        let mut prev = stored(&activity(100, 1_000));
        prev.image = b"a:0:{}".to_vec();
        match plan_merge(Some(&prev), &activity(200, 1_010), &MergePolicy::default()).unwrap() {
            MergePlan::Update {
                memo,
                image,
                batch,
                subjects,
                ..
            } => {
                assert!(batch);
                assert_eq!(subjects, 2);
                let decoded = Batch::decode(D, &memo, &image).unwrap();
                assert_eq!(decoded.keys().collect::<Vec<_>>(), vec!["100", "200"]);
                assert_eq!(decoded.images.keys().collect::<Vec<_>>(), vec!["200"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_new_activity_encode_error_surfaces() {
        let mut bad = activity(100, 1_000);
        bad.image = Some(ImageRecord::default());
        assert_eq!(
            plan_merge(None, &bad, &MergePolicy::default()),
            Err(CodecError::EmptyImageRecord)
        );
    }
}
