// MIT License - Copyright (c) 2026 Peter Wright
// Turns panel messages into state updates, notifications and triggers

use std::collections::BTreeMap;

use chrono::{Local, NaiveDateTime, Timelike};
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::codec::Packet;
use crate::config::BridgeConfig;
use crate::constants::MINUTE;
use crate::devices::{
    AlarmState, ArmedMode, ArmedState, KeypadField, KeypadLeds, KeypadTarget, Led, LedState,
    TemperatureChannel, TroubleFlags, TroubleState, Zone, ZoneGroup, ZoneState, lcd_lines,
    short_duration, signed_temperature,
};
use crate::error::SystemErrorCode;
use crate::event::{Collaborators, SpeechKey, TriggerEvent, UserCodeKind};
use crate::protocol::{Command, PanelMessage};

/// System error reported when arming is refused.
const ARMING_REFUSED: &str = "024";

type Clock = Box<dyn Fn() -> NaiveDateTime + Send>;

/// Inbound side of the engine.
///
/// Owns everything derived from panel traffic: the zone mirror, zone groups,
/// the alarm episode (trip set, buffered closes, re-announce cadence) and
/// the trouble debounce.
pub struct EventDecoder {
    host: Collaborators,
    config: BridgeConfig,
    zones: BTreeMap<u16, Zone>,
    groups: Vec<ZoneGroup>,
    /// Zones tripped in the current alarm, in trip order.
    tripped: Vec<u16>,
    /// Closes received during the alarm, applied at disarm.
    pending_closes: Vec<u16>,
    alarm_active: bool,
    next_announce: Instant,
    next_minute: Instant,
    trouble: TroubleState,
    last_ack: Option<String>,
    outbox: Vec<Command>,
    clock: Clock,
}

impl EventDecoder {
    pub fn new(host: Collaborators) -> Self {
        let now = Instant::now();
        Self {
            host,
            config: BridgeConfig::default(),
            zones: BTreeMap::new(),
            groups: Vec::new(),
            tripped: Vec::new(),
            pending_closes: Vec::new(),
            alarm_active: false,
            next_announce: now,
            next_minute: now + MINUTE,
            trouble: TroubleState::new(),
            last_ack: None,
            outbox: Vec::new(),
            clock: Box::new(|| Local::now().naive_local()),
        }
    }

    /// Replace the local clock used for time sync.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    /// Adopt a freshly loaded configuration. Known zone states survive;
    /// zone groups are rebuilt from the new definitions.
    pub fn apply_config(&mut self, config: &BridgeConfig) {
        self.config = config.clone();
        if !config.zones.is_empty() {
            self.zones.retain(|id, _| config.zones.contains(id));
            for &id in &config.zones {
                self.zones.entry(id).or_insert_with(|| Zone::new(id));
            }
        }

        let zones = &self.zones;
        self.groups = config
            .zone_groups
            .iter()
            .map(|g| {
                let mut group = ZoneGroup::new(g.id, g.name.clone(), g.zones.clone());
                if group.zones.iter().any(|z| zones.contains_key(z)) {
                    group.state = Some(group.evaluate(|id| zones.get(&id).and_then(|z| z.state)));
                }
                group
            })
            .collect();
        debug!(
            "Decoder configured: {} zones, {} zone groups",
            self.zones.len(),
            self.groups.len()
        );
    }

    pub fn last_ack(&self) -> Option<&str> {
        self.last_ack.as_deref()
    }

    pub fn zone_state(&self, zone: u16) -> Option<ZoneState> {
        self.zones.get(&zone).and_then(|z| z.state)
    }

    pub fn tripped_zones(&self) -> &[u16] {
        &self.tripped
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm_active
    }

    pub fn trouble_flags(&self) -> TroubleFlags {
        self.trouble.flags
    }

    /// Commands the decoder wants sent, in order.
    pub fn take_outbox(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.outbox)
    }

    /// Zero both timers of a zone group. Returns `false` for unknown ids.
    pub fn reset_group_timer(&mut self, group_id: u32) -> bool {
        let Some(group) = self.groups.iter_mut().find(|g| g.id == group_id) else {
            warn!("Reset requested for unknown zone group {}", group_id);
            return false;
        };
        group.reset_timers();
        self.host.state.set_zone_group_timers(group.id, 0, 0);
        true
    }

    /// Route one checksum-valid packet.
    pub fn handle_packet(&mut self, packet: &Packet) {
        match PanelMessage::from_packet(packet) {
            PanelMessage::Unrecognized { code, data } => {
                debug!(
                    "Unrecognized command received (Cmd:{} Dat:{} Sum:{:02X})",
                    code, data, packet.checksum
                );
            }
            msg => self.handle_message(msg),
        }
    }

    pub fn handle_message(&mut self, msg: PanelMessage) {
        use PanelMessage::*;
        match msg {
            Ack { command } => {
                debug!("ACK for cmd {}", command);
                self.last_ack = Some(command);
            }
            CommandError => error!("Interface received a command with a bad checksum"),
            SystemError { code } => {
                error!("Panel system error {}: {}", code, SystemErrorCode::describe(&code));
                if code == ARMING_REFUSED {
                    self.failed_to_arm();
                }
            }
            LoginInteraction { data } => debug!("Login interaction: {}", data),
            KeypadLedState(leds) => {
                for (flag, led) in [
                    (KeypadLeds::READY, Led::Ready),
                    (KeypadLeds::ARMED, Led::Armed),
                    (KeypadLeds::TROUBLE, Led::Trouble),
                ] {
                    let state = if leds.contains(flag) {
                        LedState::On
                    } else {
                        LedState::Off
                    };
                    self.host
                        .state
                        .set_keypad_field(KeypadTarget::All, KeypadField::Led(led, state));
                }
            }
            KeypadLedFlashState(leds) => debug!("Keypad LEDs flashing: {:?}", leds),
            TimeBroadcast { hour, minute } => self.check_panel_time(hour, minute),
            Temperature {
                sensor,
                channel,
                raw,
            } => {
                let degrees = signed_temperature(raw);
                debug!("Thermostat {} {} is {}", sensor, channel, degrees);
                self.host.state.set_temperature(sensor, channel, degrees);
            }
            ThermostatSetpoints { sensor, cool, heat } => {
                debug!("Thermostat {} setpoints cool {} heat {}", sensor, cool, heat);
                self.host.state.set_temperature(
                    sensor,
                    TemperatureChannel::CoolSetpoint,
                    signed_temperature(cool),
                );
                self.host.state.set_temperature(
                    sensor,
                    TemperatureChannel::HeatSetpoint,
                    signed_temperature(heat),
                );
            }
            ZoneAlarm { partition, zone } => {
                info!("Zone {} in partition {} alarm", zone, partition);
                self.update_zone(zone, ZoneState::Tripped);
                if !self.tripped.contains(&zone) {
                    self.tripped.push(zone);
                    self.notify_tripped();
                }
            }
            ZoneAlarmRestore { partition, zone } => {
                info!("Zone {} in partition {} alarm restored", zone, partition);
            }
            ZoneOpen { zone } => {
                self.update_zone(zone, ZoneState::Open);
                self.pending_closes.retain(|&z| z != zone);
            }
            ZoneRestored { zone } => {
                // A tripped zone keeps its state until disarm.
                if self.alarm_active || self.tripped.contains(&zone) {
                    debug!("Zone {} closed while tripped, deferring", zone);
                    if !self.pending_closes.contains(&zone) {
                        self.pending_closes.push(zone);
                    }
                } else {
                    self.update_zone(zone, ZoneState::Closed);
                }
            }
            DuressAlarm => info!("Duress alarm"),
            FireKeyAlarm => info!("Fire key alarm"),
            AuxKeyAlarm => info!("Auxiliary key alarm"),
            PanicKeyAlarm => info!("Panic key alarm"),
            AuxInputAlarm => info!("Auxiliary input alarm"),
            AuxInputRestore => info!("Auxiliary input alarm restored"),
            PartitionReady { partition } => debug!("Partition {} ready", partition),
            PartitionNotReady { partition } => debug!("Partition {} not ready", partition),
            PartitionArmed { partition, mode } => self.partition_armed(partition, mode),
            ForceArmingEnabled => debug!("Partition ready, force arming enabled"),
            PartitionInAlarm { partition } => {
                info!("Alarm TRIPPED on partition {}", partition);
                self.host
                    .state
                    .set_partition_state(partition, AlarmState::Tripped);
                self.host.triggers.fire_event(TriggerEvent::AlarmTripped);
                self.alarm_active = true;
                self.next_announce = Instant::now();
            }
            PartitionDisarmed { partition } => self.partition_disarmed(partition),
            ExitDelay { partition } => {
                info!("Exit delay on partition {}", partition);
                self.host
                    .state
                    .set_partition_state(partition, AlarmState::ExitDelay);
                self.host.notifier.speak(SpeechKey::Arming, &[]);
            }
            EntryDelay { partition } => {
                info!("Entry delay on partition {}", partition);
                self.host
                    .state
                    .set_partition_state(partition, AlarmState::EntryDelay);
                self.host.notifier.speak(SpeechKey::EntryDelay, &[]);
            }
            ChimeEnabled { partition } => self.host.state.set_keypad_field(
                KeypadTarget::from_partition(partition),
                KeypadField::Chime(true),
            ),
            ChimeDisabled { partition } => self.host.state.set_keypad_field(
                KeypadTarget::from_partition(partition),
                KeypadField::Chime(false),
            ),
            FailedToArm { partition } => {
                warn!("Partition {} failed to arm", partition);
                self.failed_to_arm();
            }
            PartitionBusy { partition } => debug!("Partition {} busy", partition),
            UserClosing { partition, user } => {
                info!("Partition {} armed by user {}", partition, user);
                self.host
                    .triggers
                    .fire_user_code_trigger(UserCodeKind::Armed, &user);
            }
            UserOpening { partition, user } => {
                info!("Partition {} disarmed by user {}", partition, user);
                self.host
                    .triggers
                    .fire_user_code_trigger(UserCodeKind::Disarmed, &user);
            }
            BatteryTrouble => self.trouble_message("Alarm panel battery is low.", None),
            BatteryRestore => self.trouble_message("Alarm panel battery is now ok.", None),
            AcTrouble => self.trouble_message("AC Power Lost.", Some(TriggerEvent::AcTrouble)),
            AcRestore => {
                self.trouble_message("AC Power Restored.", Some(TriggerEvent::AcRestore))
            }
            BellTrouble => self.trouble_message(
                "An open circuit has been detected across the bell terminals.",
                None,
            ),
            BellRestore => self.trouble_message("The bell circuit has been restored.", None),
            TroubleLedOn { partition } => {
                debug!("Trouble LED on, partition {}", partition);
                self.trouble.led_on();
            }
            TroubleLedOff { partition } => {
                debug!("Trouble LED off, partition {}", partition);
                self.trouble.led_off(self.config.trouble_clear_ticks);
            }
            TroubleStatus(flags) => {
                debug!("Trouble status {:?}", flags);
                if let Some(body) = self.trouble.apply_status(flags) {
                    info!("{}", body.trim_end());
                    self.host.notifier.notify_trouble(&body);
                }
            }
            PartitionBusyRestore { partition } => {
                debug!("Partition {} busy restored", partition)
            }
            KeybusFault => warn!("Keybus fault"),
            KeybusFaultRestore => info!("Keybus fault restored"),
            CodeRequired => error!("Code required"),
            LcdUpdate { text } => {
                let (line1, line2) = lcd_lines(&text);
                self.host
                    .state
                    .set_keypad_field(KeypadTarget::All, KeypadField::LcdLine1(line1));
                self.host
                    .state
                    .set_keypad_field(KeypadTarget::All, KeypadField::LcdLine2(line2));
            }
            LedStatus { led, state } => {
                debug!("LED {:?} is {:?}", led, state);
                if led.field_name().is_some() {
                    self.host
                        .state
                        .set_keypad_field(KeypadTarget::All, KeypadField::Led(led, state.coalesced()));
                }
            }
            BeepStatus | ToneStatus | BuzzerStatus | DoorChimeStatus => {
                debug!("Keypad sound status")
            }
            SoftwareVersion { major, minor } => {
                info!("Interface software version {}.{}", major, minor)
            }
            Malformed { code, data } => warn!("Malformed data for {}: {:?}", code, data),
            Unrecognized { code, data } => {
                debug!("Unrecognized command received (Cmd:{} Dat:{})", code, data)
            }
        }
    }

    /// Periodic work, run once per engine tick.
    pub fn housekeeping(&mut self, now: Instant) {
        if self.trouble.tick() {
            info!("Trouble code cleared");
            self.host.notifier.notify_trouble("Trouble Code Cleared");
        }

        if self.alarm_active && now >= self.next_announce {
            self.next_announce = now + self.announce_interval();
            self.host.notifier.speak(SpeechKey::Tripped, &self.tripped);
        }

        while now >= self.next_minute {
            self.next_minute += MINUTE;
            for zone in self.zones.values_mut() {
                let minutes = zone.tick_minute();
                self.host
                    .state
                    .set_zone_timer(zone.id, minutes, &short_duration(minutes));
            }
            for group in &mut self.groups {
                group.tick_minute();
                self.host.state.set_zone_group_timers(
                    group.id,
                    group.any_member_minutes,
                    group.entire_group_minutes,
                );
            }
        }
    }

    fn announce_interval(&self) -> Duration {
        self.config.alarm_repeat_interval
    }

    fn update_zone(&mut self, id: u16, state: ZoneState) {
        if !self.config.tracks_zone(id) {
            return;
        }
        let zone = self.zones.entry(id).or_insert_with(|| Zone::new(id));
        if !zone.set_state(state) {
            return;
        }
        debug!("Zone {} is {}", id, state);
        self.host.state.set_zone_state(id, state);
        self.host.state.set_zone_timer(id, 0, &short_duration(0));

        let zones = &self.zones;
        for group in self.groups.iter_mut().filter(|g| g.contains(id)) {
            let group_state = group.evaluate(|z| zones.get(&z).and_then(|z| z.state));
            if group.member_changed(group_state) {
                debug!("Zone group {} is {}", group.name, group_state.as_str());
                self.host.state.set_zone_group_state(group.id, group_state);
            }
            self.host.state.set_zone_group_timers(
                group.id,
                group.any_member_minutes,
                group.entire_group_minutes,
            );
        }
    }

    fn notify_tripped(&mut self) {
        let report: Vec<(u16, ZoneState)> = self
            .tripped
            .iter()
            .map(|&z| {
                let physical = if self.pending_closes.contains(&z) {
                    ZoneState::Closed
                } else {
                    ZoneState::Open
                };
                (z, physical)
            })
            .collect();
        self.host.notifier.notify_zones_tripped(&report);
    }

    fn open_zones(&self) -> Vec<u16> {
        self.zones
            .values()
            .filter(|z| z.is_open())
            .map(|z| z.id)
            .collect()
    }

    fn failed_to_arm(&mut self) {
        self.host.triggers.fire_event(TriggerEvent::FailedToArm);
        let open = self.open_zones();
        self.host.notifier.speak(SpeechKey::FailedToArm, &open);
    }

    fn partition_armed(&mut self, partition: u8, mode: Option<ArmedMode>) {
        if let Some(mode) = mode {
            info!("Partition {} armed {}", partition, mode.description());
            let event = if mode.is_away() {
                TriggerEvent::ArmedAway
            } else {
                TriggerEvent::ArmedStay
            };
            self.host.triggers.fire_event(event);
            self.host.state.set_keypad_field(
                KeypadTarget::from_partition(partition),
                KeypadField::ArmedState(mode.armed_state()),
            );
        }
        self.host
            .state
            .set_partition_state(partition, AlarmState::Armed);
    }

    fn partition_disarmed(&mut self, partition: u8) {
        self.alarm_active = false;
        for zone in std::mem::take(&mut self.pending_closes) {
            self.update_zone(zone, ZoneState::Closed);
        }
        self.tripped.clear();
        info!("Partition {} disarmed", partition);
        self.host
            .state
            .set_partition_state(partition, AlarmState::Disarmed);
        self.host.state.set_keypad_field(
            KeypadTarget::from_partition(partition),
            KeypadField::ArmedState(ArmedState::Disarmed),
        );
        self.host.triggers.fire_event(TriggerEvent::AlarmDisarmed);
        self.host.notifier.speak(SpeechKey::Disarmed, &[]);
    }

    fn trouble_message(&mut self, body: &str, event: Option<TriggerEvent>) {
        info!("{}", body);
        self.host.notifier.notify_trouble(body);
        if let Some(event) = event {
            self.host.triggers.fire_event(event);
        }
    }

    fn check_panel_time(&mut self, hour: u32, minute: u32) {
        if !self.config.time_sync {
            return;
        }
        let now = (self.clock)();
        let drift = (i64::from(now.minute()) - i64::from(minute)).abs();
        if now.hour() != hour || drift > 1 {
            info!(
                "Panel clock reads {:02}:{:02}, setting it to {}",
                hour,
                minute,
                now.format("%H:%M")
            );
            self.outbox.push(Command::SetDateTime(now));
        } else {
            debug!("Panel clock in sync");
        }
    }
}
