// Error handling framework

use thiserror::Error;

/// Schedule-related errors surfaced by the task registrar.
///
/// The scheduler itself validates nothing beyond the `OFF` sentinel; a
/// malformed expression is rejected here, at registration time, and the
/// error propagates to the caller of `reload()` unmodified.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidCronExpression { expression: String, reason: String },

    #[error("Cron expression '{expression}' has no upcoming fire time")]
    NoUpcomingFire { expression: String },
}
