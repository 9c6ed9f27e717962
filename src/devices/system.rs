// MIT License - Copyright (c) 2026 Peter Wright
// Panel trouble status

use bitflags::bitflags;

bitflags! {
    /// Trouble bitmask carried as a hex byte by an `849` report.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TroubleFlags: u8 {
        /// Service is required
        const SERVICE_REQUIRED  = 1 << 0;
        /// AC power lost
        const AC_LOST           = 1 << 1;
        /// Telephone line fault
        const PHONE_LINE_FAULT  = 1 << 2;
        /// Failure to communicate
        const COMM_FAILURE      = 1 << 3;
        /// Sensor/zone fault
        const ZONE_FAULT        = 1 << 4;
        /// Sensor/zone tamper
        const ZONE_TAMPER       = 1 << 5;
        /// Sensor/zone low battery
        const ZONE_LOW_BATTERY  = 1 << 6;
        /// Loss of time
        const TIME_LOSS         = 1 << 7;
    }
}

const TROUBLE_LINES: [(TroubleFlags, &str); 8] = [
    (TroubleFlags::SERVICE_REQUIRED, "Service is Required"),
    (TroubleFlags::AC_LOST, "AC Power Lost"),
    (TroubleFlags::PHONE_LINE_FAULT, "Telephone Line Fault"),
    (TroubleFlags::COMM_FAILURE, "Failure to Communicate"),
    (TroubleFlags::ZONE_FAULT, "Sensor/Zone Fault"),
    (TroubleFlags::ZONE_TAMPER, "Sensor/Zone Tamper"),
    (TroubleFlags::ZONE_LOW_BATTERY, "Sensor/Zone Low Battery"),
    (TroubleFlags::TIME_LOSS, "Loss of Time"),
];

impl TroubleFlags {
    /// Notification body listing every set flag.
    pub fn report(&self) -> String {
        let mut body = String::from("Trouble Code Received:\n");
        for (flag, text) in &TROUBLE_LINES {
            if self.contains(*flag) {
                body.push_str("- ");
                body.push_str(text);
                body.push('\n');
            }
        }
        body
    }
}

/// Trouble bitmask plus the debounce that clears it once the trouble LED has
/// stayed off long enough.
#[derive(Debug, Clone, Default)]
pub struct TroubleState {
    pub flags: TroubleFlags,
    /// Ticks left before the mask is cleared. Zero when no clear is pending.
    pub clear_ticks: u32,
}

impl Default for TroubleFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl TroubleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a newly received mask. Returns the notification body when the
    /// mask changed to a non-zero value.
    pub fn apply_status(&mut self, flags: TroubleFlags) -> Option<String> {
        if flags == self.flags {
            return None;
        }
        self.flags = flags;
        if flags.is_empty() {
            None
        } else {
            Some(flags.report())
        }
    }

    /// Trouble LED lit: cancel any pending clear.
    pub fn led_on(&mut self) {
        self.clear_ticks = 0;
    }

    /// Trouble LED dark: start the debounce if a trouble is stored.
    pub fn led_off(&mut self, debounce_ticks: u32) {
        if !self.flags.is_empty() {
            self.clear_ticks = debounce_ticks;
        }
    }

    /// Advance the debounce by one tick. Returns `true` exactly when the
    /// countdown expires and the mask is cleared.
    pub fn tick(&mut self) -> bool {
        if self.clear_ticks == 0 {
            return false;
        }
        self.clear_ticks -= 1;
        if self.clear_ticks == 0 {
            self.flags = TroubleFlags::empty();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trouble_report() {
        let flags = TroubleFlags::from_bits_truncate(0x82);
        assert_eq!(
            flags.report(),
            "Trouble Code Received:\n- AC Power Lost\n- Loss of Time\n"
        );
    }

    #[test]
    fn test_apply_status_only_on_change() {
        let mut state = TroubleState::new();
        assert!(state.apply_status(TroubleFlags::AC_LOST).is_some());
        assert!(state.apply_status(TroubleFlags::AC_LOST).is_none());
        // Dropping to zero is stored silently.
        assert!(state.apply_status(TroubleFlags::empty()).is_none());
        assert!(state.flags.is_empty());
    }

    #[test]
    fn test_led_off_without_trouble_does_nothing() {
        let mut state = TroubleState::new();
        state.led_off(10);
        assert_eq!(state.clear_ticks, 0);
        assert!(!state.tick());
    }

    #[test]
    fn test_debounce_clears_once() {
        let mut state = TroubleState::new();
        state.apply_status(TroubleFlags::ZONE_FAULT);
        state.led_off(3);
        assert!(!state.tick());
        assert!(!state.tick());
        assert!(state.tick());
        assert!(state.flags.is_empty());
        assert!(!state.tick());
    }

    #[test]
    fn test_led_on_cancels_clear() {
        let mut state = TroubleState::new();
        state.apply_status(TroubleFlags::ZONE_FAULT);
        state.led_off(3);
        assert!(!state.tick());
        state.led_on();
        for _ in 0..5 {
            assert!(!state.tick());
        }
        assert_eq!(state.flags, TroubleFlags::ZONE_FAULT);
    }
}
