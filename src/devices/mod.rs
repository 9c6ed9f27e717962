// MIT License - Copyright (c) 2026 Peter Wright
// Domain model mirrored from the panel

pub mod zone;
pub mod partition;
pub mod system;
pub mod thermostat;

pub use zone::{Zone, ZoneGroup, ZoneGroupState, ZoneState, short_duration};
pub use partition::{
    AlarmState, ArmedMode, ArmedState, KeypadField, KeypadLeds, KeypadTarget, Led, LedState,
    lcd_lines,
};
pub use system::{TroubleFlags, TroubleState};
pub use thermostat::{
    Setpoint, SetpointChange, TemperatureChannel, ThermostatAdjust, signed_temperature,
};
