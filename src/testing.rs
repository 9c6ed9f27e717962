// MIT License - Copyright (c) 2026 Peter Wright
// Recording collaborator for tests and dry runs

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::devices::{
    AlarmState, KeypadField, KeypadTarget, TemperatureChannel, ZoneGroupState, ZoneState,
};
use crate::event::{
    Collaborators, Notifier, SpeechKey, StateSink, TriggerDispatch, TriggerEvent, UserCodeKind,
};

/// One call made by the engine into its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    ZoneState(u16, ZoneState),
    ZoneTimer(u16, u32, String),
    GroupState(u32, ZoneGroupState),
    GroupTimers(u32, u32, u32),
    Partition(u8, AlarmState),
    Keypad(KeypadTarget, KeypadField),
    Temperature(u8, TemperatureChannel, i16),
    ZonesTripped(Vec<(u16, ZoneState)>),
    Trouble(String),
    Speak(SpeechKey, Vec<u16>),
    Trigger(TriggerEvent),
    UserCode(UserCodeKind, String),
}

/// Host that records every call. Clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingHost {
    log: Arc<Mutex<Vec<HostEvent>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::from_host(self.clone())
    }

    fn log(&self) -> MutexGuard<'_, Vec<HostEvent>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, event: HostEvent) {
        self.log().push(event);
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.log().clone()
    }

    pub fn clear(&self) {
        self.log().clear();
    }

    pub fn zone_states(&self) -> Vec<(u16, ZoneState)> {
        self.log()
            .iter()
            .filter_map(|e| match e {
                HostEvent::ZoneState(z, s) => Some((*z, *s)),
                _ => None,
            })
            .collect()
    }

    pub fn group_states(&self) -> Vec<(u32, ZoneGroupState)> {
        self.log()
            .iter()
            .filter_map(|e| match e {
                HostEvent::GroupState(g, s) => Some((*g, *s)),
                _ => None,
            })
            .collect()
    }

    pub fn partition_states(&self) -> Vec<(u8, AlarmState)> {
        self.log()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Partition(p, s) => Some((*p, *s)),
                _ => None,
            })
            .collect()
    }

    pub fn tripped_reports(&self) -> Vec<Vec<(u16, ZoneState)>> {
        self.log()
            .iter()
            .filter_map(|e| match e {
                HostEvent::ZonesTripped(zones) => Some(zones.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn troubles(&self) -> Vec<String> {
        self.log()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Trouble(body) => Some(body.clone()),
                _ => None,
            })
            .collect()
    }
}

impl StateSink for RecordingHost {
    fn set_zone_state(&mut self, zone: u16, state: ZoneState) {
        self.record(HostEvent::ZoneState(zone, state));
    }

    fn set_zone_timer(&mut self, zone: u16, minutes: u32, label: &str) {
        self.record(HostEvent::ZoneTimer(zone, minutes, label.to_string()));
    }

    fn set_zone_group_state(&mut self, group: u32, state: ZoneGroupState) {
        self.record(HostEvent::GroupState(group, state));
    }

    fn set_zone_group_timers(&mut self, group: u32, any_member_minutes: u32, entire_group_minutes: u32) {
        self.record(HostEvent::GroupTimers(group, any_member_minutes, entire_group_minutes));
    }

    fn set_partition_state(&mut self, partition: u8, state: AlarmState) {
        self.record(HostEvent::Partition(partition, state));
    }

    fn set_keypad_field(&mut self, target: KeypadTarget, field: KeypadField) {
        self.record(HostEvent::Keypad(target, field));
    }

    fn set_temperature(&mut self, sensor: u8, channel: TemperatureChannel, degrees: i16) {
        self.record(HostEvent::Temperature(sensor, channel, degrees));
    }
}

impl Notifier for RecordingHost {
    fn notify_zones_tripped(&mut self, zones: &[(u16, ZoneState)]) {
        self.record(HostEvent::ZonesTripped(zones.to_vec()));
    }

    fn notify_trouble(&mut self, body: &str) {
        self.record(HostEvent::Trouble(body.to_string()));
    }

    fn speak(&mut self, key: SpeechKey, zones: &[u16]) {
        self.record(HostEvent::Speak(key, zones.to_vec()));
    }
}

impl TriggerDispatch for RecordingHost {
    fn fire_event(&mut self, event: TriggerEvent) {
        self.record(HostEvent::Trigger(event));
    }

    fn fire_user_code_trigger(&mut self, kind: UserCodeKind, user_code: &str) {
        self.record(HostEvent::UserCode(kind, user_code.to_string()));
    }
}
