use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Url;
use tracing::info;

use crate::console::Follower;
use crate::core::{self, ConnectionFields, DataLoadForm};
use crate::server::{Server, StubOptions};

fn sample_form() -> DataLoadForm {
    let source = ConnectionFields {
        host: "db2.source.example.com".to_string(),
        port: "50000".to_string(),
        database: "SAMPLE".to_string(),
        schema: "DB2INST1".to_string(),
        username: "db2inst1".to_string(),
        password: "passw0rd".to_string(),
        table: "EMPLOYEE".to_string(),
    };
    let target = ConnectionFields {
        host: "dashdb.target.example.com".to_string(),
        table: "EMPLOYEE_COPY".to_string(),
        ..source.clone()
    };
    DataLoadForm::new(source, target)
}

/// Runs one submit, poll and log cycle against an in-process stub backend.
pub async fn run(poll_interval: Duration) -> anyhow::Result<()> {
    info!("setting up stub refinery service");
    let addr = Server::new(StubOptions::default()).spawn_local().await?;
    let client = core::Client::new(Url::parse(&format!("http://{addr}/"))?);
    let controller = core::DataLoadController::new(Arc::new(client), poll_interval);
    let follower = Follower::spawn(controller.view().subscribe());

    let start = Instant::now();
    let ids = controller.create_and_run_activity(&sample_form()).await?;
    controller.wait_until_stopped().await;
    controller.view_log(None, None).await?;
    follower.finish().await;

    println!(
        "== run {ids} finished in {}ms",
        start.elapsed().as_millis()
    );
    Ok(())
}
