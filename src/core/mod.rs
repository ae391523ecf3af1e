pub mod activity;
pub mod client;
/// The controller replaces page-global state with one session object: the
/// tracked run, its poll timer and the observable view live together and are
/// reset together.
pub mod controller;
pub mod error;
pub mod form;
pub mod poller;
pub mod run_status;
pub mod view;

pub use activity::{ActivityId, ActivityRunId, RunIdentifiers};
pub use client::{Client, RefineryApi};
pub use controller::DataLoadController;
pub use error::DataLoadError;
pub use form::{ConnectionFields, DataLoadForm};
pub use view::{View, ViewState};
