// MIT License - Copyright (c) 2026 Peter Wright
// Protocol constants

use std::time::Duration;

/// Line terminator appended to every outbound frame.
pub const CRLF: &[u8] = b"\r\n";

/// Fixed serial line speed of the interface module.
pub const BAUD_RATE: u32 = 9600;

/// Read timeout applied to every serial read.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause used by idle connection states between checks.
pub const IDLE_INTERVAL: Duration = Duration::from_secs(1);

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(3);
pub const DEFAULT_COMMAND_RETRIES: u32 = 3;
pub const DEFAULT_HOLD_RETRY_MINUTES: u64 = 3;
pub const DEFAULT_TROUBLE_CLEAR_TICKS: u32 = 10;
pub const DEFAULT_ALARM_REPEAT_INTERVAL: Duration = Duration::from_secs(12);
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(301);

/// Interval of the zone and group age counters.
pub const MINUTE: Duration = Duration::from_secs(60);

// Inbound codes the dispatcher itself cares about.
pub const CODE_ACK: &str = "500";
pub const CODE_SYSTEM_ERROR: &str = "502";
pub const CODE_THERMOSTAT_SETPOINTS: &str = "563";

// Outbound command codes.
pub const CMD_POLL: &str = "000";
pub const CMD_STATUS_REQUEST: &str = "001";
pub const CMD_SET_DATE_TIME: &str = "010";
pub const CMD_TIME_BROADCAST: &str = "056";
pub const CMD_ARM_AWAY: &str = "030";
pub const CMD_ARM_STAY: &str = "031";
pub const CMD_DISARM: &str = "040";
pub const CMD_PANIC: &str = "060";
pub const CMD_KEYPRESS: &str = "070";
pub const CMD_THERMOSTAT_QUERY: &str = "095";
pub const CMD_THERMOSTAT_CHANGE: &str = "096";
pub const CMD_THERMOSTAT_SAVE: &str = "097";

/// Keypad key that asks the panel to release the previous key.
pub const KEY_BREAK: char = '^';

/// Pseudo key that stands for a two second pause in a key sequence.
pub const KEY_PAUSE: char = 'L';

/// Longest user code the panel accepts; shorter codes are padded with `0`.
pub const MAX_CODE_LEN: usize = 6;

/// Default partition addressed by arm/disarm commands.
pub const DEFAULT_PARTITION: u8 = 1;
