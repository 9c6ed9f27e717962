// MIT License - Copyright (c) 2026 Peter Wright
// Temperature sensors and thermostats

use std::fmt;

/// Which reading of a temperature sensor an update refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemperatureChannel {
    Inside,
    Outside,
    CoolSetpoint,
    HeatSetpoint,
}

impl TemperatureChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inside => "temperatureInside",
            Self::Outside => "temperatureOutside",
            Self::CoolSetpoint => "setPointCool",
            Self::HeatSetpoint => "setPointHeat",
        }
    }
}

impl fmt::Display for TemperatureChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert a raw three digit reading to degrees. Values above 127 are
/// negative: `v` maps to `127 - v`.
pub fn signed_temperature(raw: u16) -> i16 {
    let raw = raw as i16;
    if raw > 127 { 127 - raw } else { raw }
}

/// Setpoint targeted by an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setpoint {
    Cool,
    Heat,
}

impl Setpoint {
    pub fn as_char(&self) -> char {
        match self {
            Self::Cool => 'C',
            Self::Heat => 'H',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'C' => Some(Self::Cool),
            'H' => Some(Self::Heat),
            _ => None,
        }
    }
}

/// How a setpoint is changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetpointChange {
    Increment,
    Decrement,
    Set(u16),
}

impl SetpointChange {
    pub fn as_char(&self) -> char {
        match self {
            Self::Increment => '+',
            Self::Decrement => '-',
            Self::Set(_) => '=',
        }
    }

    /// Value sent on the wire; zero for relative changes.
    pub fn value(&self) -> u16 {
        match self {
            Self::Set(v) => *v,
            _ => 0,
        }
    }
}

/// A queued thermostat adjustment: query, change, then save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThermostatAdjust {
    pub sensor: u8,
    pub setpoint: Setpoint,
    pub change: SetpointChange,
}
