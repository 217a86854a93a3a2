use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use super::service::TickOutcome;
use super::workflow::SharedAttempt;

/// Signal emitted once when the countdown reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expired;

/// One-second countdown driving [`AttemptSession::tick`].
///
/// The task stops on expiry or as soon as the session leaves `Active`
/// (e.g. a manual submit claimed the transition first), and the underlying
/// task is aborted when the handle is dropped — teardown never relies on
/// the session being polled again.
///
/// [`AttemptSession::tick`]: super::service::AttemptSession::tick
pub struct Countdown {
    handle: JoinHandle<()>,
}

impl Countdown {
    /// Spawns the ticking task. The returned receiver yields [`Expired`] at
    /// most once; the channel closes when the countdown stops for any
    /// reason.
    #[must_use]
    pub fn spawn(session: SharedAttempt) -> (Self, mpsc::Receiver<Expired>) {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // The first tick of a tokio interval completes immediately;
            // consume it so the countdown starts one full second in.
            interval.tick().await;
            loop {
                interval.tick().await;
                let outcome = {
                    let Ok(mut guard) = session.lock() else {
                        break;
                    };
                    guard.tick()
                };
                match outcome {
                    TickOutcome::Running { .. } => {}
                    TickOutcome::Expired => {
                        debug!("attempt time expired");
                        let _ = tx.send(Expired).await;
                        break;
                    }
                    TickOutcome::Stopped => break,
                }
            }
        });
        (Self { handle }, rx)
    }

    /// Cancels the ticking task.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Returns true once the task has stopped, by expiry, cancellation or
    /// the session leaving `Active`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
