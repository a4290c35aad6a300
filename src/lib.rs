// Chaos scheduler: cron-driven runtime assault triggering with live
// reconfiguration

pub mod assault;
pub mod config;
pub mod errors;
pub mod registrar;
pub mod scheduler;
pub mod telemetry;

pub use assault::{ChaosAssault, ChaosRuntimeScope, RuntimeScope};
pub use config::{
    AssaultProperties, ScheduleConfigSource, Settings, SharedAssaultProperties,
};
pub use errors::ScheduleError;
pub use registrar::{CronTask, ScheduledTask, TaskRegistrar, TokioTaskRegistrar};
pub use scheduler::{ChaosScheduler, SCHEDULE_OFF};
