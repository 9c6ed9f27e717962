// MIT License - Copyright (c) 2026 Peter Wright
// Bridge configuration

use std::time::Duration;

use crate::constants::*;
use crate::error::{DscError, Result};

/// A named set of zones reported as one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneGroupConfig {
    pub id: u32,
    pub name: String,
    pub zones: Vec<u16>,
}

/// Configuration for talking to the panel.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Serial device path (e.g. `/dev/ttyUSB0`)
    pub serial_port: String,
    /// User code used for disarming (1-6 digits)
    pub code: String,
    /// Partition addressed by arm/disarm commands (default: 1)
    pub partition: u8,
    /// Whether to correct the panel clock from `550` broadcasts
    pub time_sync: bool,
    /// Wait for a response before re-sending a command (default: 3s)
    pub command_timeout: Duration,
    /// Transmissions per command before giving up (default: 3)
    pub command_retries: u32,
    /// Delay before re-initialising after a failure (default: 3 minutes)
    pub hold_retry_minutes: u64,
    /// Ticks the trouble LED must stay off before troubles are cleared
    pub trouble_clear_ticks: u32,
    /// Re-announcement period while an alarm is tripped (default: 12s)
    pub alarm_repeat_interval: Duration,
    /// Steady-state keepalive period (default: 301s)
    pub keepalive_interval: Duration,
    /// Zones to mirror. Empty means every zone the panel reports.
    pub zones: Vec<u16>,
    pub zone_groups: Vec<ZoneGroupConfig>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            serial_port: String::new(),
            code: String::new(),
            partition: DEFAULT_PARTITION,
            time_sync: true,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            command_retries: DEFAULT_COMMAND_RETRIES,
            hold_retry_minutes: DEFAULT_HOLD_RETRY_MINUTES,
            trouble_clear_ticks: DEFAULT_TROUBLE_CLEAR_TICKS,
            alarm_repeat_interval: DEFAULT_ALARM_REPEAT_INTERVAL,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            zones: Vec::new(),
            zone_groups: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }

    /// Delay before the state machine retries initialisation.
    pub fn hold_retry(&self) -> Duration {
        Duration::from_secs(self.hold_retry_minutes * 60)
    }

    /// Check the settings the engine cannot run without.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| -> Result<()> {
            Err(DscError::InvalidConfig {
                reason: reason.to_string(),
            })
        };
        if self.serial_port.trim().is_empty() {
            return invalid("serial port is not set");
        }
        if self.code.is_empty() || self.code.len() > MAX_CODE_LEN {
            return invalid("code must be 1 to 6 digits");
        }
        if !self.code.bytes().all(|b| b.is_ascii_digit()) {
            return invalid("code must contain only digits");
        }
        if self.partition == 0 || self.partition > 8 {
            return invalid("partition must be between 1 and 8");
        }
        if self.command_timeout.is_zero() {
            return invalid("command timeout must be positive");
        }
        if self.command_retries == 0 {
            return invalid("command retries must be at least 1");
        }
        Ok(())
    }

    /// Whether a zone is mirrored.
    pub fn tracks_zone(&self, zone: u16) -> bool {
        self.zones.is_empty() || self.zones.contains(&zone)
    }
}

/// Builder for BridgeConfig.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn serial_port(mut self, port: impl Into<String>) -> Self {
        self.config.serial_port = port.into();
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.config.code = code.into();
        self
    }

    pub fn partition(mut self, partition: u8) -> Self {
        self.config.partition = partition;
        self
    }

    pub fn time_sync(mut self, enabled: bool) -> Self {
        self.config.time_sync = enabled;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout = timeout;
        self
    }

    pub fn command_retries(mut self, retries: u32) -> Self {
        self.config.command_retries = retries;
        self
    }

    pub fn hold_retry_minutes(mut self, minutes: u64) -> Self {
        self.config.hold_retry_minutes = minutes;
        self
    }

    pub fn trouble_clear_ticks(mut self, ticks: u32) -> Self {
        self.config.trouble_clear_ticks = ticks;
        self
    }

    pub fn alarm_repeat_interval(mut self, interval: Duration) -> Self {
        self.config.alarm_repeat_interval = interval;
        self
    }

    pub fn keepalive_interval(mut self, interval: Duration) -> Self {
        self.config.keepalive_interval = interval;
        self
    }

    pub fn zones(mut self, zones: impl IntoIterator<Item = u16>) -> Self {
        self.config.zones = zones.into_iter().collect();
        self
    }

    pub fn zone_group(mut self, id: u32, name: impl Into<String>, zones: Vec<u16>) -> Self {
        self.config.zone_groups.push(ZoneGroupConfig {
            id,
            name: name.into(),
            zones,
        });
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}

/// Source of configuration for the engine.
///
/// Asked in `Startup` and again after every invalidation. Returning `None`
/// keeps the engine waiting.
pub trait ConfigProvider: Send {
    fn load(&mut self) -> Option<BridgeConfig>;
}

impl ConfigProvider for BridgeConfig {
    fn load(&mut self) -> Option<BridgeConfig> {
        Some(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BridgeConfigBuilder {
        BridgeConfig::builder().serial_port("/dev/ttyUSB0").code("1234")
    }

    #[test]
    fn test_config_defaults() {
        let config = BridgeConfig::builder().build();
        assert_eq!(config.partition, 1);
        assert!(config.time_sync);
        assert_eq!(config.command_timeout, Duration::from_secs(3));
        assert_eq!(config.command_retries, 3);
        assert_eq!(config.hold_retry(), Duration::from_secs(180));
        assert_eq!(config.trouble_clear_ticks, 10);
        assert_eq!(config.alarm_repeat_interval, Duration::from_secs(12));
        assert_eq!(config.keepalive_interval, Duration::from_secs(301));
    }

    #[test]
    fn test_config_builder() {
        let config = valid()
            .time_sync(false)
            .command_retries(5)
            .zones([1, 2, 5])
            .zone_group(10, "Doors", vec![1, 2])
            .build();
        assert_eq!(config.serial_port, "/dev/ttyUSB0");
        assert!(!config.time_sync);
        assert_eq!(config.command_retries, 5);
        assert_eq!(config.zones, vec![1, 2, 5]);
        assert_eq!(config.zone_groups[0].name, "Doors");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        assert!(BridgeConfig::builder().code("1234").build().validate().is_err());
        assert!(valid().code("").build().validate().is_err());
        assert!(valid().code("1234567").build().validate().is_err());
        assert!(valid().code("12a4").build().validate().is_err());
        assert!(valid().command_retries(0).build().validate().is_err());
        assert!(valid().command_timeout(Duration::ZERO).build().validate().is_err());
        assert!(valid().partition(0).build().validate().is_err());
    }

    #[test]
    fn test_tracks_zone() {
        assert!(valid().build().tracks_zone(42));
        let config = valid().zones([1, 2]).build();
        assert!(config.tracks_zone(2));
        assert!(!config.tracks_zone(3));
    }

    #[test]
    fn test_static_provider() {
        let mut config = valid().build();
        let loaded = config.load().unwrap();
        assert_eq!(loaded.code, "1234");
    }
}
