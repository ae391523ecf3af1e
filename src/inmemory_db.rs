use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::core::activity::{ActivityId, ActivityRequest, ActivityRunId};

pub const RUNNING: &str = "RUNNING";
pub const FINISHED: &str = "FINISHED";
pub const FINISHED_WITH_ERROR: &str = "FINISHED_WITH_ERROR";

#[derive(Debug, Clone)]
pub struct StoredActivity {
    pub id: ActivityId,
    pub request: ActivityRequest,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredRun {
    pub id: ActivityRunId,
    pub activity_id: ActivityId,
    pub status: String,
    pub rows_moved: Option<u64>,
    pub polls: u32,
    pub fails: bool,
    pub log: Vec<LogEntry>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub severity: String,
    pub message: String,
}

impl LogEntry {
    fn info(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity: "info".to_string(),
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity: "error".to_string(),
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct Db {
    pub activities: Arc<DashMap<ActivityId, StoredActivity>>,
    pub runs: Arc<DashMap<ActivityRunId, StoredRun>>,
}

impl Db {
    pub fn new() -> Self {
        Self {
            activities: Arc::new(DashMap::new()),
            runs: Arc::new(DashMap::new()),
        }
    }

    pub async fn add_activity(&self, request: ActivityRequest) -> StoredActivity {
        let activity = StoredActivity {
            id: ActivityId::from(Uuid::new_v4().to_string()),
            request,
            created_at: Utc::now(),
        };
        self.activities.insert(activity.id.clone(), activity.clone());
        activity
    }

    pub async fn start_run(&self, activity: &StoredActivity, fails: bool) -> StoredRun {
        let run = StoredRun {
            id: ActivityRunId::from(Uuid::new_v4().to_string()),
            activity_id: activity.id.clone(),
            status: RUNNING.to_string(),
            rows_moved: None,
            polls: 0,
            fails,
            log: vec![LogEntry::info(format!(
                "Run of activity {} started",
                activity.request.name
            ))],
            created_at: Utc::now(),
        };
        self.runs.insert(run.id.clone(), run.clone());
        run
    }

    /// Counts one status poll and finishes the run once `polls_until_finished`
    /// polls have been seen.
    pub async fn advance_run(
        &self,
        activity_id: &ActivityId,
        run_id: &ActivityRunId,
        polls_until_finished: u32,
        rows_moved: u64,
    ) -> Option<StoredRun> {
        let mut run = self.runs.get_mut(run_id)?;
        if &run.activity_id != activity_id {
            return None;
        }

        if run.status == RUNNING {
            run.polls += 1;
            if run.polls >= polls_until_finished {
                if run.fails {
                    run.status = FINISHED_WITH_ERROR.to_string();
                    run.log.push(LogEntry::error("Source table could not be read"));
                } else {
                    run.status = FINISHED.to_string();
                    run.rows_moved = Some(rows_moved);
                    run.log
                        .push(LogEntry::info(format!("{rows_moved} rows moved to target")));
                }
            }
        }
        Some(run.clone())
    }

    pub async fn get_run_log(
        &self,
        activity_id: &ActivityId,
        run_id: &ActivityRunId,
    ) -> Option<Vec<LogEntry>> {
        let run = self.runs.get(run_id)?;
        (&run.activity_id == activity_id).then(|| run.log.clone())
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}
