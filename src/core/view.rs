use std::sync::Arc;

use tokio::sync::watch;

use crate::core::run_status::RunOutcome;

pub const SUBMITTED_MESSAGE: &str = "The activity was created and the activity run started.";
pub const DEFAULT_ERROR_MESSAGE: &str = "The data loading process was not completed.";
pub const LOADING_TEXT: &str = "Loading...";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Panel {
    pub visible: bool,
    pub text: String,
}

impl Panel {
    fn show(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.visible = true;
    }
}

/// Everything the console shows: two controls, a progress indicator and
/// three panels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewState {
    pub submit_enabled: bool,
    pub log_enabled: bool,
    pub progress_visible: bool,
    pub success: Panel,
    pub failure: Panel,
    pub result: Panel,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            submit_enabled: true,
            log_enabled: false,
            progress_visible: false,
            success: Panel::default(),
            failure: Panel::default(),
            result: Panel::default(),
        }
    }
}

impl ViewState {
    pub fn begin_submission(&mut self) {
        self.submit_enabled = false;
        self.log_enabled = false;
        self.success.visible = false;
        self.failure.visible = false;
        self.result.visible = false;
        self.result.text.clear();
        self.progress_visible = true;
    }

    pub fn submission_accepted(&mut self) {
        self.success.show(SUBMITTED_MESSAGE);
        self.log_enabled = true;
    }

    pub fn submission_failed(&mut self, payload: &str) {
        self.submit_enabled = true;
        self.log_enabled = false;
        self.show_error(&format!("Error creating and running the activity:\n{payload}"));
    }

    pub fn apply_outcome(&mut self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Succeeded { message } => {
                self.failure.visible = false;
                self.success.show(message.as_str());
            }
            RunOutcome::Failed { message } => {
                self.success.visible = false;
                self.failure.show(message.as_str());
            }
            RunOutcome::InProgress => {}
        }
        if outcome.is_terminal() {
            self.progress_visible = false;
        }
    }

    pub fn show_log_loading(&mut self) {
        self.success.visible = false;
        self.failure.visible = false;
        self.result.show(LOADING_TEXT);
    }

    pub fn show_log(&mut self, text: impl Into<String>) {
        self.result.show(text);
    }

    pub fn show_error(&mut self, message: &str) {
        self.progress_visible = false;
        let message = if message.is_empty() {
            DEFAULT_ERROR_MESSAGE
        } else {
            message
        };
        self.failure.show(message);
        self.result.visible = false;
        self.success.visible = false;
    }

    pub fn reset(&mut self) {
        *self = ViewState::default();
    }
}

/// Observable view. Writers mutate in place, readers subscribe to changes.
#[derive(Clone, Debug)]
pub struct View {
    tx: Arc<watch::Sender<ViewState>>,
}

impl Default for View {
    fn default() -> Self {
        Self::new()
    }
}

impl View {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ViewState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn update(&self, f: impl FnOnce(&mut ViewState)) {
        self.tx.send_modify(f);
    }

    pub fn snapshot(&self) -> ViewState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }
}
