//! Activity producers for subject collection and progress events
//!
//! Builds the memo/image pair for an event and hands it to the merge
//! engine while holding the user's lock, so look-up and write of one user
//! never interleave.

use std::sync::Arc;

use tml_common::db::TimelineStore;
use tml_common::time::now_unix;
use tml_common::timeline::{
    subject_collect_subtype, Category, Discriminant, ImageRecord, MemoVariant, ProgressMemo,
    SubjectMemo, Total,
};
use tml_common::Result;
use tokio::sync::Mutex;
use tracing::debug;

use crate::merge::{Activity, MergeEngine, MergeOutcome, MergePolicy};

/// Number of per-user lock stripes
pub const LOCK_STRIPES: usize = 64;

/// Subject fields copied into timeline payloads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectSummary {
    pub id: u32,
    pub type_id: u8,
    pub name: String,
    pub name_cn: String,
    pub series: bool,
    /// Zero when unknown
    pub eps_total: u32,
    /// Zero when unknown
    pub vols_total: u32,
    /// Cover image path
    pub image: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EpisodeSummary {
    pub id: u32,
    pub sort: u32,
    pub name: String,
}

/// Category-specific part of a subject activity
#[derive(Debug, Clone, PartialEq)]
pub enum SubjectActivity {
    /// Collection status change; `collection` is 1 wish .. 5 dropped
    Collect {
        collection: u8,
        comment: String,
        rate: u8,
    },
    /// Progress reported on a specific episode
    EpisodeProgress {
        episode: EpisodeSummary,
        eps_update: Option<u32>,
        vols_update: Option<u32>,
    },
    /// Progress counters without an episode
    SubjectProgress {
        eps_update: Option<u32>,
        vols_update: Option<u32>,
    },
}

fn progress_memo(
    subject: &SubjectSummary,
    episode: Option<&EpisodeSummary>,
    eps_update: Option<u32>,
    vols_update: Option<u32>,
) -> ProgressMemo {
    ProgressMemo {
        episode_name: episode.map(|e| e.name.clone()),
        vols_total: Some(Total::from_count(subject.vols_total)),
        subject_name: Some(subject.name.clone()),
        eps_update,
        vols_update,
        eps_total: Some(Total::from_count(subject.eps_total)),
        episode_sort: episode.map(|e| e.sort),
        episode_id: episode.map(|e| e.id),
        subject_id: Some(subject.id),
        subject_type: Some(subject.type_id),
    }
}

/// Build the activity for a subject event; `None` when nothing changed
pub fn subject_activity(
    user_id: u32,
    subject: &SubjectSummary,
    event: SubjectActivity,
    dateline: i64,
) -> Option<Activity> {
    let (discriminant, memo, mergeable) = match event {
        SubjectActivity::Collect {
            collection,
            comment,
            rate,
        } => {
            let subtype = subject_collect_subtype(collection, subject.type_id);
            let mergeable = comment.is_empty();
            let memo = MemoVariant::Subject(SubjectMemo {
                subject_id: Some(subject.id),
                subject_type: Some(subject.type_id),
                subject_name: Some(subject.name.clone()),
                subject_name_cn: Some(subject.name_cn.clone()),
                series: Some(subject.series),
                comment: Some(comment),
                rate: Some(rate),
            });
            (
                Discriminant::new(Category::Subject.as_u8(), subtype),
                memo,
                mergeable,
            )
        }
        SubjectActivity::EpisodeProgress {
            episode,
            eps_update,
            vols_update,
        } => {
            if eps_update.is_none() && vols_update.is_none() {
                return None;
            }
            let memo = progress_memo(subject, Some(&episode), eps_update, vols_update);
            (
                Discriminant::new(Category::Progress.as_u8(), 0),
                MemoVariant::Progress(memo),
                true,
            )
        }
        SubjectActivity::SubjectProgress {
            eps_update,
            vols_update,
        } => {
            if eps_update.is_none() && vols_update.is_none() {
                return None;
            }
            let memo = progress_memo(subject, None, eps_update, vols_update);
            (
                Discriminant::new(Category::Progress.as_u8(), 0),
                MemoVariant::Progress(memo),
                true,
            )
        }
    };

    Some(Activity {
        user_id,
        discriminant,
        related: subject.id.to_string(),
        memo,
        image: Some(ImageRecord::for_subject(subject.id, subject.image.clone())),
        dateline,
        mergeable,
    })
}

/// Entry point for services that produce timeline activity
pub struct ActivityRecorder {
    engine: MergeEngine,
    locks: Vec<Mutex<()>>,
}

impl ActivityRecorder {
    pub fn new(store: Arc<dyn TimelineStore>, policy: MergePolicy) -> Self {
        Self {
            engine: MergeEngine::new(store, policy),
            locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    fn lock_for(&self, user_id: u32) -> &Mutex<()> {
        &self.locks[user_id as usize % self.locks.len()]
    }

    /// Record a subject event timestamped now
    pub async fn record_subject_activity(
        &self,
        user_id: u32,
        subject: &SubjectSummary,
        event: SubjectActivity,
    ) -> Result<MergeOutcome> {
        self.record_subject_activity_at(user_id, subject, event, now_unix())
            .await
    }

    /// Record a subject event with an explicit dateline (unix seconds)
    pub async fn record_subject_activity_at(
        &self,
        user_id: u32,
        subject: &SubjectSummary,
        event: SubjectActivity,
        dateline: i64,
    ) -> Result<MergeOutcome> {
        let Some(activity) = subject_activity(user_id, subject, event, dateline) else {
            debug!(
                "No progress change for user {} on subject {}",
                user_id, subject.id
            );
            return Ok(MergeOutcome::Skipped);
        };
        self.record(&activity).await
    }

    /// Record a prepared activity under the user's lock
    pub async fn record(&self, activity: &Activity) -> Result<MergeOutcome> {
        let _guard = self.lock_for(activity.user_id).lock().await;
        self.engine.record(activity).await
    }
}
