// MIT License - Copyright (c) 2026 Peter Wright
// Partitions and keypads

use bitflags::bitflags;
use std::fmt;

/// Alarm state of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlarmState {
    Disarmed,
    ExitDelay,
    Armed,
    EntryDelay,
    Tripped,
}

impl AlarmState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disarmed => "disarmed",
            Self::ExitDelay => "exitDelay",
            Self::Armed => "armed",
            Self::EntryDelay => "entryDelay",
            Self::Tripped => "tripped",
        }
    }
}

impl fmt::Display for AlarmState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a partition is armed, as shown on the keypad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmedState {
    Disarmed,
    Stay,
    Away,
}

impl ArmedState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disarmed => "disarmed",
            Self::Stay => "stay",
            Self::Away => "away",
        }
    }
}

/// Arming mode digit carried by a `652` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArmedMode {
    Away,
    Stay,
    AwayNoDelay,
    StayNoDelay,
}

impl ArmedMode {
    pub fn from_digit(d: u8) -> Option<Self> {
        match d {
            0 => Some(Self::Away),
            1 => Some(Self::Stay),
            2 => Some(Self::AwayNoDelay),
            3 => Some(Self::StayNoDelay),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Away => "Away",
            Self::Stay => "Stay",
            Self::AwayNoDelay => "Away, No Delay",
            Self::StayNoDelay => "Stay, No Delay",
        }
    }

    pub fn is_away(&self) -> bool {
        matches!(self, Self::Away | Self::AwayNoDelay)
    }

    pub fn armed_state(&self) -> ArmedState {
        if self.is_away() {
            ArmedState::Away
        } else {
            ArmedState::Stay
        }
    }
}

bitflags! {
    /// Keypad LED bitmask from a `510` report.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct KeypadLeds: u8 {
        const READY     = 1 << 0;
        const ARMED     = 1 << 1;
        const MEMORY    = 1 << 2;
        const BYPASS    = 1 << 3;
        const TROUBLE   = 1 << 4;
        const PROGRAM   = 1 << 5;
        const FIRE      = 1 << 6;
        const BACKLIGHT = 1 << 7;
    }
}

/// Individual keypad LED, indexed as in a `903` report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Led {
    Ready,
    Armed,
    Memory,
    Bypass,
    Trouble,
    Program,
    Fire,
    Backlight,
    Ac,
}

impl Led {
    pub fn from_index(i: u8) -> Option<Self> {
        match i {
            1 => Some(Self::Ready),
            2 => Some(Self::Armed),
            3 => Some(Self::Memory),
            4 => Some(Self::Bypass),
            5 => Some(Self::Trouble),
            6 => Some(Self::Program),
            7 => Some(Self::Fire),
            8 => Some(Self::Backlight),
            9 => Some(Self::Ac),
            _ => None,
        }
    }

    /// Name of the keypad field mirroring this LED, for the LEDs the bridge
    /// exposes.
    pub fn field_name(&self) -> Option<&'static str> {
        match self {
            Self::Ready => Some("LEDReady"),
            Self::Armed => Some("LEDArmed"),
            Self::Trouble => Some("LEDTrouble"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedState {
    Off,
    On,
    Flashing,
}

impl LedState {
    pub fn from_digit(d: u8) -> Option<Self> {
        match d {
            0 => Some(Self::Off),
            1 => Some(Self::On),
            2 => Some(Self::Flashing),
            _ => None,
        }
    }

    /// Flashing is reported as on.
    pub fn coalesced(self) -> Self {
        match self {
            Self::Flashing => Self::On,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
            Self::Flashing => "flashing",
        }
    }
}

/// Which keypads an update is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeypadTarget {
    /// Every keypad (partition 0 on the wire).
    All,
    Partition(u8),
}

impl KeypadTarget {
    pub fn from_partition(partition: u8) -> Self {
        if partition == 0 {
            Self::All
        } else {
            Self::Partition(partition)
        }
    }
}

/// A keypad field update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeypadField {
    ArmedState(ArmedState),
    Chime(bool),
    Led(Led, LedState),
    LcdLine1(String),
    LcdLine2(String),
}

impl KeypadField {
    /// Field name as exposed to hosts.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ArmedState(_) => "ArmedState",
            Self::Chime(_) => "KeypadChime",
            Self::Led(led, _) => led.field_name().unwrap_or("LED"),
            Self::LcdLine1(_) => "LCDLine1",
            Self::LcdLine2(_) => "LCDLine2",
        }
    }

    pub fn value(&self) -> String {
        match self {
            Self::ArmedState(s) => s.as_str().to_string(),
            Self::Chime(true) => "enabled".to_string(),
            Self::Chime(false) => "disabled".to_string(),
            Self::Led(_, s) => s.as_str().to_string(),
            Self::LcdLine1(s) | Self::LcdLine2(s) => s.clone(),
        }
    }
}

fn lcd_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '/' | ':' | '-')
}

/// Clean LCD text and split it into the two display lines.
///
/// Every run of characters the keypad font cannot show becomes a single
/// space. The split point is half the cleaned length, rounded down.
pub fn lcd_lines(raw: &str) -> (String, String) {
    let mut text = String::with_capacity(raw.len());
    let mut in_run = false;
    for c in raw.chars() {
        if lcd_allowed(c) {
            text.push(c);
            in_run = false;
        } else if !in_run {
            text.push(' ');
            in_run = true;
        }
    }
    let half = text.chars().count() / 2;
    let split = text.char_indices().nth(half).map_or(text.len(), |(i, _)| i);
    let (first, second) = text.split_at(split);
    (first.to_string(), second.to_string())
}
