// Runtime assault scheduling with live reconfiguration

use crate::assault::ChaosRuntimeScope;
use crate::config::ScheduleConfigSource;
use crate::errors::ScheduleError;
use crate::registrar::{CronTask, ScheduledTask, TaskRegistrar};
use std::sync::Arc;
use tracing::{debug, info};

/// Expression value that disables runtime assault scheduling.
///
/// Compared case-sensitively with no whitespace trimming; `"off"` or
/// `" OFF"` are treated as ordinary cron expressions.
pub const SCHEDULE_OFF: &str = "OFF";

/// Schedules the chaos monkey runtime attack as a recurring cron task.
///
/// Holds at most one live registration at a time. Every reload re-reads the
/// current expression and replaces the registration, canceling the stale
/// handle. The registrar is optional: without one the scheduler degrades to
/// a permanent disabled state instead of failing.
///
/// Not internally synchronized; callers serialize `reload()` (enforced by
/// `&mut self`). The trigger callback runs on the registrar's own execution
/// context, never on the reloading thread.
pub struct ChaosScheduler {
    registrar: Option<Arc<dyn TaskRegistrar>>,
    config: Arc<dyn ScheduleConfigSource>,
    scope: Arc<dyn ChaosRuntimeScope>,
    active: Option<ScheduledTask>,
}

impl ChaosScheduler {
    /// Build the scheduler and perform the initial scheduling pass.
    ///
    /// Behaves exactly like a `reload()`: a registration failure for the
    /// configured expression propagates unmodified.
    pub fn new(
        registrar: Option<Arc<dyn TaskRegistrar>>,
        config: Arc<dyn ScheduleConfigSource>,
        scope: Arc<dyn ChaosRuntimeScope>,
    ) -> Result<Self, ScheduleError> {
        let mut scheduler = Self {
            registrar,
            config,
            scope,
            active: None,
        };
        scheduler.reload()?;
        Ok(scheduler)
    }

    /// Re-read the cron expression and replace the active registration.
    ///
    /// With no registrar this is a no-op. For [`SCHEDULE_OFF`] any live
    /// registration is canceled and nothing new is registered. Otherwise a
    /// new task is registered for the expression and the stale handle, if
    /// any, is canceled. Registrar errors are surfaced as-is, neither
    /// retried nor swallowed.
    pub fn reload(&mut self) -> Result<(), ScheduleError> {
        let Some(registrar) = self.registrar.as_deref() else {
            debug!("No task registrar available, runtime assaults stay unscheduled");
            return Ok(());
        };

        let expression = self.config.runtime_assault_cron_expression();
        if expression == SCHEDULE_OFF {
            if let Some(stale) = self.active.take() {
                info!(task_id = %stale.id(), "Runtime assault schedule turned off");
                stale.cancel();
            }
            return Ok(());
        }

        let scope = Arc::clone(&self.scope);
        let task = CronTask::new(expression.clone(), move || scope.call_chaos_monkey());
        let replacement = registrar.schedule_cron_task(task)?;
        info!(task_id = %replacement.id(), %expression, "Runtime assault scheduled");

        if let Some(stale) = self.active.replace(replacement) {
            stale.cancel();
        }
        Ok(())
    }

    /// Whether a registration is currently live.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}
