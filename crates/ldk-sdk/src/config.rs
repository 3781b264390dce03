use ldk_classpath::ResolverConfig;
use ldk_coord::CoordinatorConfig;
use ldk_native::NativeConfig;
use serde::{Deserialize, Serialize};

/// Settings for a [`LoadingContext`](crate::LoadingContext), one table per
/// subsystem.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub resolver: ResolverConfig,
    pub native: NativeConfig,
    pub coordinator: CoordinatorConfig,
}

impl SdkConfig {
    /// Legacy compatibility for both the classpath and the coordinator.
    pub fn legacy() -> Self {
        Self {
            resolver: ResolverConfig::legacy(),
            native: NativeConfig::default(),
            coordinator: CoordinatorConfig::legacy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldk_coord::LockingMode;

    #[test]
    fn default_config() {
        let c = SdkConfig::default();
        assert_eq!(c.coordinator.mode, LockingMode::Parallel);
        assert!(!c.resolver.empty_element_is_cwd);
        assert!(c.native.system_paths.is_empty());
    }

    #[test]
    fn legacy_config() {
        let c = SdkConfig::legacy();
        assert_eq!(c.coordinator.mode, LockingMode::Legacy);
        assert!(c.resolver.empty_element_is_cwd);
    }
}
