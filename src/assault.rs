// Runtime-scope chaos assaults

use crate::config::SharedAssaultProperties;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// The trigger callback side of the scheduler: one chaos attack per firing.
///
/// Implementations are side-effecting and zero-argument; whatever they raise
/// is their own concern, the scheduler never catches it.
#[cfg_attr(test, mockall::automock)]
pub trait ChaosRuntimeScope: Send + Sync {
    fn call_chaos_monkey(&self);
}

/// An assault that attacks the application process as a whole, independent
/// of any request.
pub trait ChaosAssault: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this assault is currently enabled by configuration.
    fn active(&self) -> bool;

    fn attack(&self);
}

/// Default runtime scope: attacks with every active assault on each firing.
pub struct RuntimeScope {
    assaults: Vec<Arc<dyn ChaosAssault>>,
}

impl RuntimeScope {
    pub fn new(assaults: Vec<Arc<dyn ChaosAssault>>) -> Self {
        Self { assaults }
    }

    /// Scope wired with the built-in assaults, all reading the shared
    /// properties.
    pub fn with_default_assaults(properties: SharedAssaultProperties) -> Self {
        Self::new(vec![
            Arc::new(MemoryAssault::new(properties.clone())),
            Arc::new(KillAppAssault::new(properties)),
        ])
    }
}

impl ChaosRuntimeScope for RuntimeScope {
    fn call_chaos_monkey(&self) {
        let mut attacked = false;
        for assault in self.assaults.iter().filter(|a| a.active()) {
            info!(assault = assault.name(), "Executing runtime assault");
            assault.attack();
            attacked = true;
        }
        if !attacked {
            info!("Chaos monkey fired but no runtime assault is active");
        }
    }
}

/// Kills the application process outright.
pub struct KillAppAssault {
    properties: SharedAssaultProperties,
}

impl KillAppAssault {
    pub fn new(properties: SharedAssaultProperties) -> Self {
        Self { properties }
    }
}

impl ChaosAssault for KillAppAssault {
    fn name(&self) -> &'static str {
        "kill-application"
    }

    fn active(&self) -> bool {
        self.properties.get().kill_application_active
    }

    fn attack(&self) {
        warn!("Chaos monkey is killing the application");
        std::process::exit(0);
    }
}

/// Fills memory toward a configured target, holds it, then releases.
pub struct MemoryAssault {
    properties: SharedAssaultProperties,
}

// Allocation slice per step while ramping up
const MEMORY_SLICE_BYTES: usize = 32 * 1024 * 1024;

impl MemoryAssault {
    pub fn new(properties: SharedAssaultProperties) -> Self {
        Self { properties }
    }
}

impl ChaosAssault for MemoryAssault {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn active(&self) -> bool {
        self.properties.get().memory_active
    }

    fn attack(&self) {
        let properties = self.properties.get();
        let target = properties.memory_fill_target_bytes;
        warn!(target_bytes = target, "Chaos monkey is filling memory");

        let mut fill: Vec<Vec<u8>> = Vec::new();
        let mut remaining = target;
        while remaining > 0 {
            let chunk = remaining.min(MEMORY_SLICE_BYTES);
            fill.push(vec![0u8; chunk]);
            remaining -= chunk;
        }

        std::thread::sleep(Duration::from_millis(properties.memory_hold_millis));
        drop(fill);
        info!("Memory assault finished, fill released");
    }
}
