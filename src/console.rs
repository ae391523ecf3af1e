use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::view::{Panel, ViewState};

/// Lines describing what became visible, in display order.
pub fn describe_changes(prev: &ViewState, next: &ViewState) -> Vec<String> {
    let mut lines = Vec::new();

    if next.progress_visible != prev.progress_visible {
        lines.push(if next.progress_visible {
            "[working] waiting for the activity run".to_string()
        } else {
            "[done] no longer waiting".to_string()
        });
    }
    push_panel(&mut lines, "success", &prev.success, &next.success);
    push_panel(&mut lines, "failure", &prev.failure, &next.failure);
    push_panel(&mut lines, "log", &prev.result, &next.result);

    lines
}

fn push_panel(lines: &mut Vec<String>, label: &str, prev: &Panel, next: &Panel) {
    if next.visible && (!prev.visible || prev.text != next.text) {
        lines.push(format!("[{label}] {}", next.text));
    }
}

fn print_changes(prev: &mut ViewState, rx: &mut watch::Receiver<ViewState>) {
    let next = rx.borrow_and_update().clone();
    for line in describe_changes(prev, &next) {
        println!("{line}");
    }
    *prev = next;
}

/// Prints view changes to stdout while a command runs.
pub struct Follower {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl Follower {
    pub fn spawn(mut rx: watch::Receiver<ViewState>) -> Self {
        let token = CancellationToken::new();
        let stop = token.clone();
        let task = tokio::spawn(async move {
            let mut prev = ViewState::default();
            print_changes(&mut prev, &mut rx);
            loop {
                tokio::select! {
                    _ = stop.cancelled() => {
                        print_changes(&mut prev, &mut rx);
                        break;
                    }
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        print_changes(&mut prev, &mut rx);
                    }
                }
            }
        });
        Self { token, task }
    }

    /// Flushes whatever changed since the last print and stops.
    pub async fn finish(self) {
        self.token.cancel();
        let _ = self.task.await;
    }
}
