use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a [`LoadingCoordinator`](crate::LoadingCoordinator) serializes loads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockingMode {
    /// One reentrant lock per name.
    Parallel,
    /// One "currently loading" slot per name, with circularity detection.
    Legacy,
}

/// Coordinator configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    pub mode: LockingMode,
    /// How often a waiting thread re-checks its interrupt flag, in
    /// milliseconds.
    pub wait_poll_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            mode: LockingMode::Parallel,
            wait_poll_ms: 50,
        }
    }
}

impl CoordinatorConfig {
    pub fn legacy() -> Self {
        Self {
            mode: LockingMode::Legacy,
            ..Default::default()
        }
    }

    pub fn wait_poll(&self) -> Duration {
        Duration::from_millis(self.wait_poll_ms.max(1))
    }
}
