mod countdown;
mod service;
mod view;
mod workflow;

// Public API of the attempt subsystem.
pub use crate::error::AttemptError;
pub use countdown::{Countdown, Expired};
pub use service::{AttemptPhase, AttemptSession, TickOutcome};
pub use view::{PaletteEntry, format_remaining, palette};
pub use workflow::{AttemptLoopService, SharedAttempt};
