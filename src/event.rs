// MIT License - Copyright (c) 2026 Peter Wright
// Collaborator interfaces implemented by the embedding host

use std::fmt;

use crate::devices::{
    AlarmState, KeypadField, KeypadTarget, TemperatureChannel, ZoneGroupState, ZoneState,
};

/// Named events a host can attach automation to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerEvent {
    ArmedAway,
    ArmedStay,
    AlarmTripped,
    AlarmDisarmed,
    FailedToArm,
    AcTrouble,
    AcRestore,
}

impl TriggerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArmedAway => "armedAway",
            Self::ArmedStay => "armedStay",
            Self::AlarmTripped => "alarmTripped",
            Self::AlarmDisarmed => "alarmDisarmed",
            Self::FailedToArm => "failedToArm",
            Self::AcTrouble => "acTrouble",
            Self::AcRestore => "acRestore",
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phrases the host may speak. The host owns the actual wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeechKey {
    Arming,
    EntryDelay,
    Disarmed,
    /// Substitutions are the zones currently open.
    FailedToArm,
    /// Substitutions are the zones tripped in this alarm.
    Tripped,
}

impl SpeechKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arming => "arming",
            Self::EntryDelay => "entry_delay",
            Self::Disarmed => "disarmed",
            Self::FailedToArm => "failed_to_arm",
            Self::Tripped => "tripped",
        }
    }
}

/// Whether a user code armed or disarmed the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserCodeKind {
    Armed,
    Disarmed,
}

impl UserCodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Armed => "userArmed",
            Self::Disarmed => "userDisarmed",
        }
    }
}

/// Receives the mirrored panel state.
pub trait StateSink: Send {
    fn set_zone_state(&mut self, zone: u16, state: ZoneState);
    /// Minutes since the zone last changed, with a compact label.
    fn set_zone_timer(&mut self, zone: u16, minutes: u32, label: &str);
    fn set_zone_group_state(&mut self, group: u32, state: ZoneGroupState);
    fn set_zone_group_timers(&mut self, group: u32, any_member_minutes: u32, entire_group_minutes: u32);
    fn set_partition_state(&mut self, partition: u8, state: AlarmState);
    fn set_keypad_field(&mut self, target: KeypadTarget, field: KeypadField);
    fn set_temperature(&mut self, sensor: u8, channel: TemperatureChannel, degrees: i16);
}

/// Delivers notifications to people.
pub trait Notifier: Send {
    /// Every zone tripped in the current alarm, with its physical state now.
    fn notify_zones_tripped(&mut self, zones: &[(u16, ZoneState)]);
    fn notify_trouble(&mut self, body: &str);
    fn speak(&mut self, key: SpeechKey, zones: &[u16]);
}

/// Runs host-side automation.
pub trait TriggerDispatch: Send {
    fn fire_event(&mut self, event: TriggerEvent);
    /// Run any trigger registered for this user code.
    fn fire_user_code_trigger(&mut self, kind: UserCodeKind, user_code: &str);
}

/// The host collaborators handed to the engine at construction.
pub struct Collaborators {
    pub state: Box<dyn StateSink>,
    pub notifier: Box<dyn Notifier>,
    pub triggers: Box<dyn TriggerDispatch>,
}

impl Collaborators {
    pub fn new(
        state: impl StateSink + 'static,
        notifier: impl Notifier + 'static,
        triggers: impl TriggerDispatch + 'static,
    ) -> Self {
        Self {
            state: Box::new(state),
            notifier: Box::new(notifier),
            triggers: Box::new(triggers),
        }
    }

    /// Use one cloneable host for all three roles.
    pub fn from_host<H>(host: H) -> Self
    where
        H: StateSink + Notifier + TriggerDispatch + Clone + 'static,
    {
        Self::new(host.clone(), host.clone(), host)
    }
}
