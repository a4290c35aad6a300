// Cron task registration

use crate::errors::ScheduleError;
use chrono::Utc;
use cron::Schedule;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A recurring task: a cron expression plus the action bound to each firing.
pub struct CronTask {
    expression: String,
    action: Arc<dyn Fn() + Send + Sync>,
}

impl CronTask {
    pub fn new(expression: impl Into<String>, action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            expression: expression.into(),
            action: Arc::new(action),
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Invoke the bound action once.
    pub fn run(&self) {
        (self.action)();
    }
}

impl fmt::Debug for CronTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CronTask")
            .field("expression", &self.expression)
            .finish_non_exhaustive()
    }
}

/// Opaque handle to one live recurring registration.
///
/// `cancel` consumes the handle, so a registration can never be canceled
/// twice.
pub struct ScheduledTask {
    id: Uuid,
    cancel: Box<dyn FnOnce() + Send>,
}

impl ScheduledTask {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id: Uuid::new_v4(),
            cancel: Box::new(cancel),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stop future firings of this registration. A firing already in
    /// progress is never interrupted.
    pub fn cancel(self) {
        debug!(task_id = %self.id, "Canceling scheduled task");
        (self.cancel)();
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// The facility able to register cron-triggered callbacks.
pub trait TaskRegistrar: Send + Sync {
    /// Register a recurring task, rejecting malformed expressions.
    fn schedule_cron_task(&self, task: CronTask) -> Result<ScheduledTask, ScheduleError>;
}

/// Production registrar backed by a tokio runtime.
///
/// Each registration spawns one task that sleeps until the next fire time
/// and then runs the action synchronously on a runtime worker. Canceling
/// aborts the spawned task; the abort lands at the sleep between firings,
/// so an action already running completes normally.
pub struct TokioTaskRegistrar {
    runtime: Handle,
}

impl TokioTaskRegistrar {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Registrar bound to the current runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime context.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl TaskRegistrar for TokioTaskRegistrar {
    fn schedule_cron_task(&self, task: CronTask) -> Result<ScheduledTask, ScheduleError> {
        let schedule = Schedule::from_str(task.expression()).map_err(|e| {
            ScheduleError::InvalidCronExpression {
                expression: task.expression().to_string(),
                reason: e.to_string(),
            }
        })?;

        if schedule.upcoming(Utc).next().is_none() {
            return Err(ScheduleError::NoUpcomingFire {
                expression: task.expression().to_string(),
            });
        }

        let expression = task.expression().to_string();
        let join = self.runtime.spawn(fire_loop(schedule, task));
        let abort = join.abort_handle();
        let scheduled = ScheduledTask::new(move || abort.abort());
        info!(task_id = %scheduled.id(), %expression, "Cron task registered");
        Ok(scheduled)
    }
}

async fn fire_loop(schedule: Schedule, task: CronTask) {
    loop {
        let now = Utc::now();
        let Some(next) = schedule.after(&now).next() else {
            warn!(
                expression = %task.expression(),
                "Cron schedule exhausted, stopping task"
            );
            break;
        };

        let wait = (next - now).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;

        debug!(expression = %task.expression(), fire_time = %next, "Cron task firing");
        task.run();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_rejects_malformed_expression() {
        let registrar = TokioTaskRegistrar::current();
        let result = registrar.schedule_cron_task(CronTask::new("not a cron", || {}));

        match result {
            Err(ScheduleError::InvalidCronExpression { expression, .. }) => {
                assert_eq!(expression, "not a cron");
            }
            other => panic!("expected InvalidCronExpression, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rejects_expression_with_no_upcoming_fire() {
        let registrar = TokioTaskRegistrar::current();
        // Year field entirely in the past
        let result = registrar.schedule_cron_task(CronTask::new("0 0 12 1 1 ? 2000", || {}));

        assert!(matches!(
            result,
            Err(ScheduleError::NoUpcomingFire { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_and_cancel_stops_future_firings() {
        let fired = Arc::new(AtomicUsize::new(0));
        let registrar = TokioTaskRegistrar::current();

        let counter = Arc::clone(&fired);
        let handle = registrar
            .schedule_cron_task(CronTask::new("*/1 * * * * ?", move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        let before_cancel = fired.load(Ordering::SeqCst);
        assert!(before_cancel >= 1, "task never fired");

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), before_cancel);
    }
}
