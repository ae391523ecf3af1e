use chrono::{DateTime, Utc};

use crate::core::activity::{
    ActivityRequest, Connection, InputDocument, Source, SourceOptions, SourceTable, Target,
    TargetOptions, TargetTable, ACTIVITY_NAME_PREFIX, ACTIVITY_PATTERN_ID, CONNECTION_TYPE,
    SHORT_DESCRIPTION, SOURCE_TABLE_ID,
};

/// Raw field values for one side of the load, exactly as typed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionFields {
    pub host: String,
    pub port: String,
    pub database: String,
    pub schema: String,
    pub username: String,
    pub password: String,
    pub table: String,
}

impl ConnectionFields {
    fn connection(&self) -> Connection {
        Connection {
            database: self.database.clone(),
            user_name: self.username.clone(),
            password: self.password.clone(),
            schema: self.schema.clone(),
            host_name: self.host.clone(),
            port: parse_port(&self.port),
            connection_type: CONNECTION_TYPE.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataLoadForm {
    pub source: ConnectionFields,
    pub target: ConnectionFields,
}

impl DataLoadForm {
    pub fn new(source: ConnectionFields, target: ConnectionFields) -> Self {
        Self { source, target }
    }

    pub fn to_request(&self, now: DateTime<Utc>) -> ActivityRequest {
        let name = activity_name(now);

        ActivityRequest {
            activity_pattern_id: ACTIVITY_PATTERN_ID.to_string(),
            name: name.clone(),
            input_document: InputDocument {
                name,
                source_options: SourceOptions::default(),
                target_options: TargetOptions::default(),
                target: Target {
                    connection: self.target.connection(),
                    tables: vec![TargetTable {
                        name: self.target.table.clone(),
                        table_already_exists: false,
                        source_ids: vec![SOURCE_TABLE_ID.to_string()],
                    }],
                },
                sources: vec![Source {
                    connection: self.source.connection(),
                    tables: vec![SourceTable {
                        id: SOURCE_TABLE_ID.to_string(),
                        name: self.source.table.clone(),
                    }],
                }],
            },
            short_description: SHORT_DESCRIPTION.to_string(),
        }
    }
}

pub fn activity_name(now: DateTime<Utc>) -> String {
    format!("{ACTIVITY_NAME_PREFIX}{}", now.timestamp_millis())
}

/// Leading-integer parse: optional whitespace and sign, then digits. No
/// digits, or a value outside `i64`, is `None`.
fn parse_port(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let unsigned = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    if digits == 0 {
        return None;
    }
    let end = raw.len() - unsigned.len() + digits;
    raw[..end].parse().ok()
}
