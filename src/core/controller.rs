use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::{
    activity::{ActivityId, ActivityRunId, RunIdentifiers},
    client::RefineryApi,
    error::DataLoadError,
    form::DataLoadForm,
    poller::{PollTimer, TickControl},
    run_status::{render, RunOutcome},
    view::{View, ViewState},
};

#[derive(Debug, Default)]
struct Session {
    identifiers: Option<RunIdentifiers>,
    /// Bumped whenever polling is re-armed or the session is reset. Responses
    /// that started under an older generation are dropped.
    generation: u64,
    timer: Option<PollTimer>,
}

impl Session {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

/// One console session: the tracked run, its poll timer and the view.
#[derive(Clone)]
pub struct DataLoadController {
    api: Arc<dyn RefineryApi>,
    poll_interval: Duration,
    view: View,
    session: Arc<Mutex<Session>>,
    polling: Arc<watch::Sender<bool>>,
}

impl DataLoadController {
    pub fn new(api: Arc<dyn RefineryApi>, poll_interval: Duration) -> Self {
        let (polling, _rx) = watch::channel(false);
        Self {
            api,
            poll_interval,
            view: View::new(),
            session: Arc::new(Mutex::new(Session::default())),
            polling: Arc::new(polling),
        }
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn tracked_run(&self) -> Option<RunIdentifiers> {
        self.session.lock().identifiers.clone()
    }

    pub fn is_polling(&self) -> bool {
        *self.polling.borrow()
    }

    /// The run and interval of the active poll loop, if any.
    pub fn active_poll(&self) -> Option<(RunIdentifiers, Duration)> {
        let session = self.session.lock();
        session
            .timer
            .as_ref()
            .map(|timer| (timer.ids().clone(), timer.interval()))
    }

    pub async fn wait_until_stopped(&self) {
        let mut rx = self.polling.subscribe();
        let _ = rx.wait_for(|polling| !*polling).await;
    }

    pub async fn create_and_run_activity(
        &self,
        form: &DataLoadForm,
    ) -> Result<RunIdentifiers, DataLoadError> {
        let generation = {
            let session = self.session.lock();
            self.view.update(ViewState::begin_submission);
            session.generation
        };

        let request = form.to_request(Utc::now());
        info!(name = %request.name, "creating activity");

        match self.api.create_and_run_activity(&request).await {
            Ok(created) => {
                let ids = created.identifiers();
                info!(activity_id = %ids.activity_id, run_id = %ids.run_id, "activity run started");

                let tracked = self.with_current(generation, |session| {
                    session.identifiers = Some(ids.clone());
                    self.view.update(ViewState::submission_accepted);
                    self.arm(session, ids.clone(), self.poll_interval);
                });
                if tracked.is_none() {
                    debug!(run = %ids, "session reset during submission, run not tracked");
                }
                Ok(ids)
            }
            Err(err) => {
                warn!(error = %err, service_error = ?err.service_error(), "creating activity failed");
                self.with_current(generation, |_| {
                    self.view.update(|state| state.submission_failed(&err.payload()));
                });
                Err(err)
            }
        }
    }

    /// Arms a poll loop for `ids`, cancelling whichever loop was running.
    pub fn poll_for_results(&self, ids: RunIdentifiers, interval: Duration) {
        let mut session = self.session.lock();
        self.arm(&mut session, ids, interval);
    }

    fn arm(&self, session: &mut Session, ids: RunIdentifiers, interval: Duration) {
        session.cancel_timer();
        session.generation += 1;
        let generation = session.generation;

        let controller = self.clone();
        let tick_ids = ids.clone();
        session.timer = Some(PollTimer::arm(ids, interval, move || {
            let controller = controller.clone();
            let ids = tick_ids.clone();
            async move { controller.poll_tick(&ids, generation).await }
        }));
        self.polling.send_replace(true);
    }

    async fn poll_tick(&self, ids: &RunIdentifiers, generation: u64) -> TickControl {
        debug!(run = %ids, "polling run status");
        let result = self.api.get_run_status(ids).await;

        let control = self.with_current(generation, |session| match result {
            Ok(status) => {
                let outcome = render(&status);
                self.view.update(|state| state.apply_outcome(&outcome));
                match outcome {
                    RunOutcome::InProgress => TickControl::Continue,
                    RunOutcome::Succeeded { .. } => {
                        info!(run = %ids, "activity run finished");
                        self.stop_polling(session);
                        TickControl::Stop
                    }
                    RunOutcome::Failed { .. } => {
                        warn!(run = %ids, status = %status.status(), "activity run finished with error");
                        self.stop_polling(session);
                        TickControl::Stop
                    }
                }
            }
            Err(err) => {
                warn!(run = %ids, error = %err, "run status was not retrieved");
                self.view.update(|state| {
                    state.show_error(&format!(
                        "The status of the activity run was not retrieved:\n{}",
                        err.payload()
                    ))
                });
                self.stop_polling(session);
                TickControl::Stop
            }
        });

        control.unwrap_or_else(|| {
            debug!(run = %ids, "discarding status for a superseded poll");
            TickControl::Stop
        })
    }

    fn stop_polling(&self, session: &mut Session) {
        session.timer = None;
        self.polling.send_replace(false);
    }

    /// Fetches and renders one status without tracking or polling the run.
    pub async fn refresh_status(&self, ids: &RunIdentifiers) -> Result<RunOutcome, DataLoadError> {
        let status = self.api.get_run_status(ids).await.inspect_err(|err| {
            self.view.update(|state| {
                state.show_error(&format!(
                    "The status of the activity run was not retrieved:\n{}",
                    err.payload()
                ))
            });
        })?;
        let outcome = render(&status);
        self.view.update(|state| state.apply_outcome(&outcome));
        Ok(outcome)
    }

    /// Shows the log of the given run, each id falling back to the tracked one.
    pub async fn view_log(
        &self,
        activity_id: Option<ActivityId>,
        run_id: Option<ActivityRunId>,
    ) -> Result<String, DataLoadError> {
        let (generation, ids) = {
            let session = self.session.lock();
            let tracked = session.identifiers.as_ref();
            let activity_id = activity_id.or_else(|| tracked.map(|t| t.activity_id.clone()));
            let run_id = run_id.or_else(|| tracked.map(|t| t.run_id.clone()));
            self.view.update(ViewState::show_log_loading);
            (
                session.generation,
                activity_id
                    .zip(run_id)
                    .map(|(activity_id, run_id)| RunIdentifiers { activity_id, run_id }),
            )
        };

        let result = match &ids {
            Some(ids) => {
                debug!(run = %ids, "fetching run log");
                self.api.get_run_logs(ids).await.and_then(|log| format_log(&log))
            }
            None => Err(DataLoadError::NoTrackedRun),
        };

        let shown = self.with_current(generation, |_| match &result {
            Ok(text) => self.view.update(|state| state.show_log(text.as_str())),
            Err(err) => self.view.update(|state| {
                state.show_error(&format!(
                    "The log for the activity run could not be retrieved:\n{}",
                    err.payload()
                ))
            }),
        });
        if shown.is_none() {
            debug!("discarding log for a reset session");
        }
        if let Err(err) = &result {
            warn!(error = %err, "run log was not retrieved");
        }
        result
    }

    pub fn reset(&self) {
        let mut session = self.session.lock();
        session.cancel_timer();
        session.generation += 1;
        session.identifiers = None;
        self.view.update(ViewState::reset);
        self.polling.send_replace(false);
        info!("session reset");
    }

    fn with_current<R>(&self, generation: u64, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut session = self.session.lock();
        (session.generation == generation).then(|| f(&mut *session))
    }
}

fn format_log(log: &Value) -> Result<String, DataLoadError> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b" "));
    log.serialize(&mut serializer)
        .map_err(|source| DataLoadError::Decode {
            source,
            body: log.to_string(),
        })?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
