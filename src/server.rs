use std::net::SocketAddr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, Router};
use rand::Rng;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

use crate::core::activity::{ActivityId, ActivityRequest, ActivityRunCreated, ActivityRunId};
use crate::core::error::ServiceError;
use crate::core::run_status::ActivityRunStatus;
use crate::inmemory_db::Db;

type Reply = Result<(StatusCode, Json<Value>), (StatusCode, Json<ServiceError>)>;

/// Stand-in for the refinery servlet: same three routes, runs finish after a
/// fixed number of status polls.
pub struct Server {
    state: ServerState,
}

#[derive(Clone, Debug)]
pub struct StubOptions {
    pub polls_until_finished: u32,
    pub user: String,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self {
            polls_until_finished: 2,
            user: "dataload".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ServerState {
    db: Db,
    options: StubOptions,
}

fn failure(msg_id: &str, msg_text: impl Into<String>) -> (StatusCode, Json<ServiceError>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ServiceError::new(msg_id, msg_text)),
    )
}

fn accepted(value: Value) -> Reply {
    Ok((StatusCode::ACCEPTED, Json(value)))
}

async fn handle_create_activity(
    State(state): State<ServerState>,
    Json(request): Json<ActivityRequest>,
) -> Reply {
    let document = &request.input_document;
    let target_named = document
        .target
        .tables
        .iter()
        .all(|table| !table.name.trim().is_empty());
    if document.sources.is_empty() || !target_named {
        return Err(failure("SavingActivityFailed", "A target table name is required"));
    }
    let fails = document
        .sources
        .iter()
        .flat_map(|source| source.tables.iter())
        .any(|table| table.name.trim().is_empty());

    let activity = state.db.add_activity(request).await;
    let run = state.db.start_run(&activity, fails).await;
    info!(activity_id = %activity.id, run_id = %run.id, "stub activity run started");

    let activity_url = format!("/refinery/activities/{}", activity.id);
    let created = ActivityRunCreated {
        url: Some(format!("{activity_url}/activityRuns/{}", run.id)),
        activity_url: Some(activity_url),
        activity_id: activity.id,
        id: run.id,
        created_user: Some(state.options.user.clone()),
        created_time_stamp: Some(run.created_at.to_rfc3339()),
    };
    let body = serde_json::to_value(created)
        .map_err(|e| failure("RunActivityFailed", e.to_string()))?;
    accepted(body)
}

async fn handle_get_run(
    State(state): State<ServerState>,
    Path((activity_id, run_id)): Path<(ActivityId, ActivityRunId)>,
) -> Reply {
    let rows_moved = rand::rng().random_range(1_000..=100_000);
    let run = state
        .db
        .advance_run(
            &activity_id,
            &run_id,
            state.options.polls_until_finished,
            rows_moved,
        )
        .await
        .ok_or_else(|| failure("Getting Run Status", format!("Run {run_id} not found")))?;

    let status = ActivityRunStatus::new(run.status, run.rows_moved);
    let mut body =
        serde_json::to_value(status).map_err(|e| failure("Getting Run Status", e.to_string()))?;
    body["activityId"] = json!(run.activity_id);
    body["id"] = json!(run.id);
    accepted(body)
}

async fn handle_get_run_logs(
    State(state): State<ServerState>,
    Path((activity_id, run_id)): Path<(ActivityId, ActivityRunId)>,
) -> Reply {
    let log = state
        .db
        .get_run_log(&activity_id, &run_id)
        .await
        .ok_or_else(|| failure("Getting Run Logs Failed", format!("Run {run_id} not found")))?;
    accepted(json!(log))
}

impl Server {
    pub fn new(options: StubOptions) -> Self {
        Self {
            state: ServerState {
                db: Db::new(),
                options,
            },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(
                "/refinery/activities",
                axum::routing::post(handle_create_activity),
            )
            .route(
                "/refinery/activities/{activity_id}/activityRuns/{run_id}",
                axum::routing::get(handle_get_run),
            )
            .route(
                "/refinery/activities/{activity_id}/activityRuns/{run_id}/logs",
                axum::routing::get(handle_get_run_logs),
            )
            .with_state(self.state.clone())
    }

    pub async fn run(self, listener: TcpListener) -> std::io::Result<()> {
        info!(addr = ?listener.local_addr()?, "starting stub refinery service");
        axum::serve(listener, self.router()).await
    }

    /// Binds an ephemeral local port and serves in the background.
    pub async fn spawn_local(self) -> std::io::Result<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            if let Err(err) = self.run(listener).await {
                tracing::error!(error = %err, "stub refinery service stopped");
            }
        });
        Ok(addr)
    }
}

impl Default for Server {
    fn default() -> Self {
        Self::new(StubOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use reqwest::Url;

    use crate::core::{
        form::{ConnectionFields, DataLoadForm},
        run_status::RunStatus,
        Client, DataLoadController, DataLoadError, RefineryApi, RunIdentifiers,
    };

    async fn client(options: StubOptions) -> Client {
        let addr = Server::new(options).spawn_local().await.unwrap();
        Client {
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
            base_url: Url::parse(&format!("http://{addr}/")).unwrap(),
        }
    }

    fn form(source_table: &str, target_table: &str) -> DataLoadForm {
        let side = |table: &str| ConnectionFields {
            host: "localhost".to_string(),
            port: "50000".to_string(),
            database: "SAMPLE".to_string(),
            schema: "DB2INST1".to_string(),
            username: "db2inst1".to_string(),
            password: "passw0rd".to_string(),
            table: table.to_string(),
        };
        DataLoadForm::new(side(source_table), side(target_table))
    }

    #[tokio::test]
    async fn client_drives_a_run_to_completion() {
        let client = client(StubOptions::default()).await;

        let created = client
            .create_and_run_activity(&form("EMPLOYEE", "EMPLOYEE_COPY").to_request(Utc::now()))
            .await
            .unwrap();
        assert_eq!(created.created_user.as_deref(), Some("dataload"));
        let ids = created.identifiers();

        let first = client.get_run_status(&ids).await.unwrap();
        assert_eq!(first.status(), RunStatus::InProgress("RUNNING".to_string()));

        let second = client.get_run_status(&ids).await.unwrap();
        assert_eq!(second.status(), RunStatus::Finished("FINISHED".to_string()));
        assert!(second.output_document.rows_moved.is_some());

        let log = client.get_run_logs(&ids).await.unwrap();
        let entries = log.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["severity"], "info");
    }

    #[tokio::test]
    async fn unknown_run_surfaces_the_service_error() {
        let client = client(StubOptions::default()).await;

        let err = client
            .get_run_status(&RunIdentifiers::new("nope", "nope"))
            .await
            .unwrap_err();

        match &err {
            DataLoadError::Server { status, .. } => {
                assert_eq!(*status, reqwest::StatusCode::INTERNAL_SERVER_ERROR)
            }
            other => panic!("expected server error, got {other:?}"),
        }
        let service = err.service_error().unwrap();
        assert_eq!(service.msg_id.as_deref(), Some("Getting Run Status"));
        assert!(err.payload().contains("msgSeverity"));
    }

    #[tokio::test]
    async fn rejected_activity_is_a_server_error() {
        let client = client(StubOptions::default()).await;

        let err = client
            .create_and_run_activity(&form("EMPLOYEE", " ").to_request(Utc::now()))
            .await
            .unwrap_err();

        assert_eq!(
            err.service_error().and_then(|e| e.msg_id),
            Some("SavingActivityFailed".to_string())
        );
    }

    #[tokio::test]
    async fn controller_polls_the_stub_until_it_fails() {
        let client = client(StubOptions {
            polls_until_finished: 3,
            ..StubOptions::default()
        })
        .await;
        let controller = DataLoadController::new(Arc::new(client), Duration::from_millis(20));

        controller
            .create_and_run_activity(&form("", "EMPLOYEE_COPY"))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(5), controller.wait_until_stopped())
            .await
            .unwrap();

        let view = controller.view().snapshot();
        assert!(view.failure.visible);
        assert!(view.failure.text.contains("FINISHED_WITH_ERROR"));

        let log = controller.view_log(None, None).await.unwrap();
        assert!(log.contains("Source table could not be read"));
    }
}
