use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with {status}: {body}")]
    Server { status: StatusCode, body: String },

    #[error("could not decode response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    #[error("base url {0} cannot carry path segments")]
    InvalidBaseUrl(String),

    #[error("no activity run is being tracked")]
    NoTrackedRun,
}

impl DataLoadError {
    /// Text shown to the user. Server bodies are passed through untouched.
    pub fn payload(&self) -> String {
        match self {
            DataLoadError::Server { status, body } if body.trim().is_empty() => status.to_string(),
            DataLoadError::Server { body, .. } => body.clone(),
            DataLoadError::Decode { body, source } => format!("{source}: {body}"),
            other => other.to_string(),
        }
    }

    pub fn service_error(&self) -> Option<ServiceError> {
        match self {
            DataLoadError::Server { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }
}

/// Error object the refinery backend returns alongside a 500.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceError {
    pub msg_id: Option<String>,
    pub msg_severity: Option<String>,
    pub msg_text: Option<String>,
    pub msg_explanation: Option<String>,
    pub msg_response: Option<String>,
}

impl ServiceError {
    pub fn new(msg_id: impl Into<String>, msg_text: impl Into<String>) -> Self {
        Self {
            msg_id: Some(msg_id.into()),
            msg_severity: Some("error".to_string()),
            msg_text: Some(msg_text.into()),
            msg_explanation: Some(String::new()),
            msg_response: Some(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_payload_is_the_raw_body() {
        let body = r#"{"msgId":"SavingActivityFailed","msgSeverity":"error","msgText":"boom"}"#;
        let err = DataLoadError::Server {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: body.to_string(),
        };

        assert_eq!(err.payload(), body);
        let parsed = err.service_error().unwrap();
        assert_eq!(parsed.msg_id.as_deref(), Some("SavingActivityFailed"));
        assert_eq!(parsed.msg_text.as_deref(), Some("boom"));
        assert_eq!(parsed.msg_explanation, None);
    }

    #[test]
    fn empty_server_body_falls_back_to_status() {
        let err = DataLoadError::Server {
            status: StatusCode::BAD_GATEWAY,
            body: "  ".to_string(),
        };
        assert_eq!(err.payload(), "502 Bad Gateway");
        assert!(err.service_error().is_none());
    }
}
