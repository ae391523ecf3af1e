use std::fmt;

use serde::{Deserialize, Serialize};

pub const ACTIVITY_PATTERN_ID: &str = "com.ibm.refinery.dc.DPActivityPattern";
pub const ACTIVITY_NAME_PREFIX: &str = "SDL_";
pub const SHORT_DESCRIPTION: &str = "A sample activity";
pub const SOURCE_TABLE_ID: &str = "s1";
pub const CONNECTION_TYPE: &str = "db2";
pub const MAX_RECORD_PER_TABLE: u64 = 1_000_000;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ActivityId(String);
impl ActivityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<String> for ActivityId {
    fn from(value: String) -> Self {
        ActivityId(value)
    }
}
impl From<&str> for ActivityId {
    fn from(value: &str) -> Self {
        ActivityId(value.to_string())
    }
}
impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ActivityRunId(String);
impl ActivityRunId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<String> for ActivityRunId {
    fn from(value: String) -> Self {
        ActivityRunId(value)
    }
}
impl From<&str> for ActivityRunId {
    fn from(value: &str) -> Self {
        ActivityRunId(value.to_string())
    }
}
impl fmt::Display for ActivityRunId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The activity/run pair of the last successful submission.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RunIdentifiers {
    pub activity_id: ActivityId,
    pub run_id: ActivityRunId,
}

impl RunIdentifiers {
    pub fn new(activity_id: impl Into<ActivityId>, run_id: impl Into<ActivityRunId>) -> Self {
        Self {
            activity_id: activity_id.into(),
            run_id: run_id.into(),
        }
    }
}

impl fmt::Display for RunIdentifiers {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.activity_id, self.run_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRequest {
    pub activity_pattern_id: String,
    pub name: String,
    pub input_document: InputDocument,
    pub short_description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InputDocument {
    pub name: String,
    pub source_options: SourceOptions,
    pub target_options: TargetOptions,
    pub target: Target,
    pub sources: Vec<Source>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceOptions {
    pub max_record_per_table: u64,
    pub max_table_to_extract: String,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            max_record_per_table: MAX_RECORD_PER_TABLE,
            max_table_to_extract: "all".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetOptions {
    pub append_to_existing_tables: bool,
    pub replace_existing_tables: bool,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            append_to_existing_tables: true,
            replace_existing_tables: false,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub database: String,
    pub user_name: String,
    pub password: String,
    pub schema: String,
    pub host_name: String,
    pub port: Option<i64>,
    #[serde(rename = "type")]
    pub connection_type: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub connection: Connection,
    pub tables: Vec<TargetTable>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetTable {
    pub name: String,
    pub table_already_exists: bool,
    pub source_ids: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub connection: Connection,
    pub tables: Vec<SourceTable>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceTable {
    pub id: String,
    pub name: String,
}

/// Body returned once the backend has created the activity and started a run.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRunCreated {
    pub activity_id: ActivityId,
    pub id: ActivityRunId,
    #[serde(default, rename = "activityURL", skip_serializing_if = "Option::is_none")]
    pub activity_url: Option<String>,
    #[serde(default, rename = "URL", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_time_stamp: Option<String>,
}

impl ActivityRunCreated {
    pub fn identifiers(&self) -> RunIdentifiers {
        RunIdentifiers {
            activity_id: self.activity_id.clone(),
            run_id: self.id.clone(),
        }
    }
}
