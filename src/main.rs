pub mod config;
pub mod console;
pub mod core;
pub mod demo;
pub mod inmemory_db;
pub mod server;

use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConnectionArgs};
use crate::console::Follower;
use crate::core::run_status::RunOutcome;
use crate::core::{
    ActivityId, ActivityRunId, Client, ConnectionFields, DataLoadController, DataLoadForm,
    RunIdentifiers,
};

#[derive(Parser, Debug)]
#[command(name = "refinery-load", version, about = "Submit and follow refinery data-load activities")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create and run a load activity, then poll until it finishes.
    Load(LoadArgs),
    /// Fetch and render the status of one run.
    Status {
        #[arg(long)]
        activity_id: String,
        #[arg(long)]
        run_id: String,
    },
    /// Print the log of a run. Omitted ids fall back to the tracked run.
    Logs {
        #[arg(long)]
        activity_id: Option<String>,
        #[arg(long)]
        run_id: Option<String>,
    },
    /// Run a full cycle against an in-process stub backend.
    Demo,
}

#[derive(Args, Debug)]
struct LoadArgs {
    #[arg(long)]
    src_host: String,
    #[arg(long, default_value = "50000")]
    src_port: String,
    #[arg(long)]
    src_database: String,
    #[arg(long, default_value = "")]
    src_schema: String,
    #[arg(long)]
    src_username: String,
    #[arg(long, env = "REFINERY_SRC_PASSWORD", hide_env_values = true)]
    src_password: String,
    #[arg(long)]
    src_table: String,

    #[arg(long)]
    target_host: String,
    #[arg(long, default_value = "50000")]
    target_port: String,
    #[arg(long)]
    target_database: String,
    #[arg(long, default_value = "")]
    target_schema: String,
    #[arg(long)]
    target_username: String,
    #[arg(long, env = "REFINERY_TARGET_PASSWORD", hide_env_values = true)]
    target_password: String,
    #[arg(long)]
    target_table: String,

    /// Print the run log once polling stops.
    #[arg(long)]
    view_log: bool,
}

impl LoadArgs {
    fn form(&self) -> DataLoadForm {
        DataLoadForm::new(
            ConnectionFields {
                host: self.src_host.clone(),
                port: self.src_port.clone(),
                database: self.src_database.clone(),
                schema: self.src_schema.clone(),
                username: self.src_username.clone(),
                password: self.src_password.clone(),
                table: self.src_table.clone(),
            },
            ConnectionFields {
                host: self.target_host.clone(),
                port: self.target_port.clone(),
                database: self.target_database.clone(),
                schema: self.target_schema.clone(),
                username: self.target_username.clone(),
                password: self.target_password.clone(),
                table: self.target_table.clone(),
            },
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_args(&cli.connection).context("invalid configuration")?;

    let client = Client::from_config(&config).context("could not build http client")?;
    let controller = DataLoadController::new(Arc::new(client), config.poll_interval);
    let follower = Follower::spawn(controller.view().subscribe());

    let result = execute(&controller, &config, cli.command).await;
    follower.finish().await;
    result
}

async fn execute(
    controller: &DataLoadController,
    config: &Config,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Load(args) => {
            controller.create_and_run_activity(&args.form()).await?;
            tokio::select! {
                _ = controller.wait_until_stopped() => {}
                _ = tokio::signal::ctrl_c() => {
                    controller.reset();
                    anyhow::bail!("interrupted, polling cancelled");
                }
            }
            let stopped = controller.view().snapshot();
            if args.view_log {
                controller.view_log(None, None).await?;
            }
            if stopped.failure.visible {
                anyhow::bail!("{}", stopped.failure.text);
            }
        }
        Command::Status {
            activity_id,
            run_id,
        } => {
            let ids = RunIdentifiers::new(activity_id, run_id);
            if let RunOutcome::InProgress = controller.refresh_status(&ids).await? {
                println!("[status] run {ids} is still in progress");
            }
        }
        Command::Logs {
            activity_id,
            run_id,
        } => {
            controller
                .view_log(
                    activity_id.map(ActivityId::from),
                    run_id.map(ActivityRunId::from),
                )
                .await?;
        }
        Command::Demo => demo::run(config.poll_interval).await?,
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
