//! In-memory record of preview jobs, keyed by source video id.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Lifecycle of the most recent preview job for a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewStatus {
    Queued,
    Processing,
    Ready,
    Failed,
    Cancelled,
}

impl PreviewStatus {
    pub fn message(&self) -> &'static str {
        match self {
            PreviewStatus::Queued => "Preview generation is queued",
            PreviewStatus::Processing => "Preview is being generated",
            PreviewStatus::Ready => "Preview is ready",
            PreviewStatus::Failed => "Preview generation failed",
            PreviewStatus::Cancelled => "Preview generation was cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PreviewStatus::Ready | PreviewStatus::Failed | PreviewStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewRecord {
    pub job_id: Uuid,
    pub status: PreviewStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_file_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Default bound on retained records, see [`PreviewRegistry::with_max_records`].
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

#[derive(Debug)]
struct Entry {
    record: PreviewRecord,
    /// Record replaced by a still-queued submission, kept until that
    /// submission starts so it can be restored if the submission is withdrawn.
    displaced: Option<PreviewRecord>,
}

/// Video id to latest preview job state.
///
/// Updates carry the job id; an update from a job that has been superseded
/// by a newer submission for the same video is ignored.
///
/// At most `max_records` records are retained. When a new video would exceed
/// the bound, the terminal record updated longest ago is evicted; queued and
/// running jobs are never evicted, so the bound can be exceeded by at most
/// the number of jobs in flight.
#[derive(Debug, Clone)]
pub struct PreviewRegistry {
    records: Arc<RwLock<HashMap<String, Entry>>>,
    max_records: usize,
}

impl Default for PreviewRegistry {
    fn default() -> Self {
        Self::with_max_records(DEFAULT_MAX_RECORDS)
    }
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_records(max_records: usize) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            max_records: max_records.max(1),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Entry>> {
        match self.records.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Entry>> {
        match self.records.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Record a new submission. It replaces the current record until it is
    /// either started or withdrawn.
    pub fn mark_queued(&self, video_file_id: &str, job_id: Uuid) {
        let mut records = self.write();

        if !records.contains_key(video_file_id) && records.len() >= self.max_records {
            Self::evict_oldest_terminal(&mut records);
        }

        let displaced = records.remove(video_file_id).map(|entry| entry.record);

        records.insert(
            video_file_id.to_string(),
            Entry {
                record: PreviewRecord {
                    job_id,
                    status: PreviewStatus::Queued,
                    preview_file_id: None,
                    error: None,
                    updated_at: Utc::now(),
                },
                displaced,
            },
        );
    }

    /// Undo a submission that never reached the queue.
    ///
    /// The record it displaced comes back, including any progress that job
    /// made meanwhile. With nothing to restore, the submission is recorded as
    /// failed with `reason`.
    pub fn withdraw(&self, video_file_id: &str, job_id: Uuid, reason: impl Into<String>) {
        let mut records = self.write();
        let Some(entry) = records.get_mut(video_file_id) else {
            return;
        };
        if entry.record.job_id != job_id || entry.record.status != PreviewStatus::Queued {
            return;
        }

        match entry.displaced.take() {
            Some(previous) => entry.record = previous,
            None => {
                entry.record = PreviewRecord {
                    job_id,
                    status: PreviewStatus::Failed,
                    preview_file_id: None,
                    error: Some(reason.into()),
                    updated_at: Utc::now(),
                }
            }
        }
    }

    pub fn mark_processing(&self, video_file_id: &str, job_id: Uuid) {
        self.transition(video_file_id, job_id, PreviewStatus::Processing, None, None);
    }

    pub fn mark_ready(&self, video_file_id: &str, job_id: Uuid, preview_file_id: &str) {
        self.transition(
            video_file_id,
            job_id,
            PreviewStatus::Ready,
            Some(preview_file_id.to_string()),
            None,
        );
    }

    pub fn mark_failed(&self, video_file_id: &str, job_id: Uuid, error: impl Into<String>) {
        self.transition(
            video_file_id,
            job_id,
            PreviewStatus::Failed,
            None,
            Some(error.into()),
        );
    }

    pub fn mark_cancelled(&self, video_file_id: &str, job_id: Uuid) {
        self.transition(video_file_id, job_id, PreviewStatus::Cancelled, None, None);
    }

    pub fn get(&self, video_file_id: &str) -> Option<PreviewRecord> {
        self.read().get(video_file_id).map(|e| e.record.clone())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn transition(
        &self,
        video_file_id: &str,
        job_id: Uuid,
        status: PreviewStatus,
        preview_file_id: Option<String>,
        error: Option<String>,
    ) {
        let record = PreviewRecord {
            job_id,
            status,
            preview_file_id,
            error,
            updated_at: Utc::now(),
        };

        let mut records = self.write();
        if !records.contains_key(video_file_id) {
            records.insert(
                video_file_id.to_string(),
                Entry {
                    record,
                    displaced: None,
                },
            );
            return;
        }
        let Some(entry) = records.get_mut(video_file_id) else {
            return;
        };

        if entry.record.job_id == job_id {
            // Once started, the submission can no longer be withdrawn.
            entry.displaced = None;
            entry.record = record;
            return;
        }

        match entry.displaced.as_mut() {
            Some(displaced) if displaced.job_id == job_id => *displaced = record,
            _ => tracing::debug!(
                video_file_id = %video_file_id,
                job_id = %job_id,
                current_job_id = %entry.record.job_id,
                status = ?status,
                "Ignoring update from superseded preview job"
            ),
        }
    }

    fn evict_oldest_terminal(records: &mut HashMap<String, Entry>) {
        let oldest = records
            .iter()
            .filter(|(_, e)| e.record.status.is_terminal())
            .min_by_key(|(_, e)| e.record.updated_at)
            .map(|(id, _)| id.clone());

        if let Some(id) = oldest {
            records.remove(&id);
            tracing::debug!(video_file_id = %id, "Evicted preview record");
        }
    }
}
