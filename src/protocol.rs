// MIT License - Copyright (c) 2026 Peter Wright
// Command vocabulary and inbound message classification

use chrono::NaiveDateTime;
use tracing::debug;

use crate::codec::Packet;
use crate::constants::*;
use crate::devices::{
    ArmedMode, KeypadLeds, Led, LedState, Setpoint, SetpointChange, TemperatureChannel,
    TroubleFlags,
};

/// Panic alarm raised from the keypad function keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanicType {
    Fire,
    Ambulance,
    Panic,
}

impl PanicType {
    pub fn from_digit(d: u8) -> Option<Self> {
        match d {
            1 => Some(Self::Fire),
            2 => Some(Self::Ambulance),
            3 => Some(Self::Panic),
            _ => None,
        }
    }

    pub fn digit(&self) -> u8 {
        match self {
            Self::Fire => 1,
            Self::Ambulance => 2,
            Self::Panic => 3,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Fire => "Fire",
            Self::Ambulance => "Ambulance",
            Self::Panic => "Panic",
        }
    }
}

/// Commands that can be sent to the interface module.
///
/// Every command is acknowledged by `500` carrying the first three characters
/// of the command, except the thermostat commands which answer with `563`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `000` - Poll; used as ping and keepalive.
    Poll,
    /// `001` - Request a dump of every zone, partition and LED state.
    StatusRequest,
    /// `010HHMMmmDDYY` - Set panel date and time.
    SetDateTime(NaiveDateTime),
    /// `0561` - Enable the `550` time broadcast.
    EnableTimeBroadcast,
    /// `030p` - Arm partition in away mode.
    ArmAway { partition: u8 },
    /// `031p` - Arm partition in stay mode.
    ArmStay { partition: u8 },
    /// `040p` + code - Disarm partition. The code is padded with `0` to six
    /// digits.
    Disarm { partition: u8, code: String },
    /// `060t` - Trigger a panic alarm.
    Panic(PanicType),
    /// `070c` - Send a single keypad key.
    Keypress(char),
    /// `070^` - Release the previously sent key.
    KeyBreak,
    /// `095s` - Read the setpoints of a thermostat.
    ThermostatQuery { sensor: u8 },
    /// `096sWT###` - Change a setpoint.
    ThermostatChange {
        sensor: u8,
        setpoint: Setpoint,
        change: SetpointChange,
    },
    /// `097s` - Store thermostat setpoints.
    ThermostatSave { sensor: u8 },
    /// Raw payload for anything not listed.
    Raw(String),
}

impl Command {
    /// Payload string, without checksum or terminator.
    pub fn to_wire_string(&self) -> String {
        match self {
            Command::Poll => CMD_POLL.to_string(),
            Command::StatusRequest => CMD_STATUS_REQUEST.to_string(),
            Command::SetDateTime(dt) => {
                format!("{}{}", CMD_SET_DATE_TIME, dt.format("%H%M%m%d%y"))
            }
            Command::EnableTimeBroadcast => format!("{}1", CMD_TIME_BROADCAST),
            Command::ArmAway { partition } => format!("{}{}", CMD_ARM_AWAY, partition),
            Command::ArmStay { partition } => format!("{}{}", CMD_ARM_STAY, partition),
            Command::Disarm { partition, code } => {
                format!("{}{}{:0<width$}", CMD_DISARM, partition, code, width = MAX_CODE_LEN)
            }
            Command::Panic(t) => format!("{}{}", CMD_PANIC, t.digit()),
            Command::Keypress(c) => format!("{}{}", CMD_KEYPRESS, c),
            Command::KeyBreak => format!("{}{}", CMD_KEYPRESS, KEY_BREAK),
            Command::ThermostatQuery { sensor } => format!("{}{}", CMD_THERMOSTAT_QUERY, sensor),
            Command::ThermostatChange {
                sensor,
                setpoint,
                change,
            } => format!(
                "{}{}{}{}{:03}",
                CMD_THERMOSTAT_CHANGE,
                sensor,
                setpoint.as_char(),
                change.as_char(),
                change.value()
            ),
            Command::ThermostatSave { sensor } => format!("{}{}", CMD_THERMOSTAT_SAVE, sensor),
            Command::Raw(s) => s.clone(),
        }
    }

    /// Response code that completes this command.
    pub fn expected_response(&self) -> &'static str {
        match self {
            Command::ThermostatQuery { .. }
            | Command::ThermostatChange { .. }
            | Command::ThermostatSave { .. } => CODE_THERMOSTAT_SETPOINTS,
            _ => CODE_ACK,
        }
    }
}

/// Build the keypress commands for a key string.
///
/// A break precedes every key after the first and one follows the last key.
/// `L` stands for a pause: it sends no key and, when it ends the string,
/// suppresses the final break.
pub fn key_sequence(keys: &str) -> Vec<Command> {
    let mut commands = Vec::new();
    let mut first = true;
    let mut send_break = false;
    for c in keys.chars() {
        if c == KEY_PAUSE {
            debug!("Key sequence pause");
            send_break = false;
        }
        if !first {
            commands.push(Command::KeyBreak);
        }
        if c != KEY_PAUSE {
            commands.push(Command::Keypress(c));
            send_break = true;
        }
        first = false;
    }
    if send_break {
        commands.push(Command::KeyBreak);
    }
    commands
}

/// Messages reported by the panel, one variant per recognised code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelMessage {
    /// 500 - Command acknowledged.
    Ack { command: String },
    /// 501 - Command received with a bad checksum.
    CommandError,
    /// 502 - System error.
    SystemError { code: String },
    /// 505 - Login interaction.
    LoginInteraction { data: String },
    /// 510 - Keypad LED state.
    KeypadLedState(KeypadLeds),
    /// 511 - Keypad LED flashing state.
    KeypadLedFlashState(KeypadLeds),
    /// 550 - Time and date broadcast.
    TimeBroadcast { hour: u32, minute: u32 },
    /// 561 / 562 - Indoor or outdoor temperature.
    Temperature {
        sensor: u8,
        channel: TemperatureChannel,
        raw: u16,
    },
    /// 563 - Thermostat setpoints.
    ThermostatSetpoints { sensor: u8, cool: u16, heat: u16 },
    /// 601 - Zone alarm.
    ZoneAlarm { partition: u8, zone: u16 },
    /// 602 - Zone alarm restore.
    ZoneAlarmRestore { partition: u8, zone: u16 },
    /// 609 - Zone open.
    ZoneOpen { zone: u16 },
    /// 610 - Zone restored (closed).
    ZoneRestored { zone: u16 },
    /// 620 - Duress alarm.
    DuressAlarm,
    /// 621 - Fire key alarm.
    FireKeyAlarm,
    /// 623 - Auxiliary key alarm.
    AuxKeyAlarm,
    /// 625 - Panic key alarm.
    PanicKeyAlarm,
    /// 631 - Auxiliary input alarm.
    AuxInputAlarm,
    /// 632 - Auxiliary input alarm restore.
    AuxInputRestore,
    /// 650 - Partition ready.
    PartitionReady { partition: u8 },
    /// 651 - Partition not ready.
    PartitionNotReady { partition: u8 },
    /// 652 - Partition armed, with the mode when the panel reports it.
    PartitionArmed {
        partition: u8,
        mode: Option<ArmedMode>,
    },
    /// 653 - Partition ready, force arming enabled.
    ForceArmingEnabled,
    /// 654 - Partition in alarm.
    PartitionInAlarm { partition: u8 },
    /// 655 - Partition disarmed.
    PartitionDisarmed { partition: u8 },
    /// 656 - Exit delay in progress.
    ExitDelay { partition: u8 },
    /// 657 - Entry delay in progress.
    EntryDelay { partition: u8 },
    /// 663 - Keypad chime enabled.
    ChimeEnabled { partition: u8 },
    /// 664 - Keypad chime disabled.
    ChimeDisabled { partition: u8 },
    /// 672 - Failed to arm.
    FailedToArm { partition: u8 },
    /// 673 - Partition busy.
    PartitionBusy { partition: u8 },
    /// 700 / 701 / 702 - Armed by a user.
    UserClosing { partition: u8, user: String },
    /// 750 - Disarmed by a user.
    UserOpening { partition: u8, user: String },
    /// 800 - Panel battery low.
    BatteryTrouble,
    /// 801 - Panel battery restored.
    BatteryRestore,
    /// 802 - AC power lost.
    AcTrouble,
    /// 803 - AC power restored.
    AcRestore,
    /// 806 - Bell circuit open.
    BellTrouble,
    /// 807 - Bell circuit restored.
    BellRestore,
    /// 840 - Trouble LED on.
    TroubleLedOn { partition: u8 },
    /// 841 - Trouble LED off.
    TroubleLedOff { partition: u8 },
    /// 849 - Trouble status bitmask.
    TroubleStatus(TroubleFlags),
    /// 851 - Partition busy restore.
    PartitionBusyRestore { partition: u8 },
    /// 896 - Keybus fault.
    KeybusFault,
    /// 897 - Keybus fault restore.
    KeybusFaultRestore,
    /// 900 - Code required.
    CodeRequired,
    /// 901 - LCD update; raw display text.
    LcdUpdate { text: String },
    /// 903 - Single LED status.
    LedStatus { led: Led, state: LedState },
    /// 904 - Beep status.
    BeepStatus,
    /// 905 - Tone status.
    ToneStatus,
    /// 906 - Buzzer status.
    BuzzerStatus,
    /// 907 - Door chime status.
    DoorChimeStatus,
    /// 908 - Interface software version.
    SoftwareVersion { major: String, minor: String },
    /// Known code whose data could not be parsed.
    Malformed { code: String, data: String },
    /// Code outside the recognised set.
    Unrecognized { code: String, data: String },
}

fn digits<T: std::str::FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Split `data` at byte offsets, requiring an exact total length.
fn fields<'a, const N: usize>(data: &'a str, widths: [usize; N]) -> Option<[&'a str; N]> {
    if data.len() != widths.iter().sum::<usize>() {
        return None;
    }
    let mut out = [""; N];
    let mut pos = 0;
    for (slot, width) in out.iter_mut().zip(widths) {
        *slot = data.get(pos..pos + width)?;
        pos += width;
    }
    Some(out)
}

fn partition_and_zone(data: &str) -> Option<(u8, u16)> {
    let [p, z] = fields(data, [1, 3])?;
    Some((digits(p)?, digits(z)?))
}

fn partition_and_user(data: &str) -> Option<(u8, String)> {
    let [p, u] = fields(data, [1, 4])?;
    Some((digits(p)?, u.to_string()))
}

fn hex_byte(data: &str) -> Option<u8> {
    if data.is_empty() || data.len() > 2 {
        return None;
    }
    u8::from_str_radix(data, 16).ok()
}

impl PanelMessage {
    /// Classify a checksum-valid packet.
    pub fn from_packet(packet: &Packet) -> Self {
        let data = packet.data.as_str();
        Self::parse(&packet.code, data).unwrap_or_else(|| {
            if Self::is_known_code(&packet.code) {
                PanelMessage::Malformed {
                    code: packet.code.clone(),
                    data: data.to_string(),
                }
            } else {
                PanelMessage::Unrecognized {
                    code: packet.code.clone(),
                    data: data.to_string(),
                }
            }
        })
    }

    fn is_known_code(code: &str) -> bool {
        matches!(
            code,
            "500" | "501" | "502" | "505" | "510" | "511" | "550" | "561" | "562" | "563"
                | "601" | "602" | "609" | "610" | "620" | "621" | "623" | "625" | "631"
                | "632" | "650" | "651" | "652" | "653" | "654" | "655" | "656" | "657"
                | "663" | "664" | "672" | "673" | "700" | "701" | "702" | "750" | "800"
                | "801" | "802" | "803" | "806" | "807" | "840" | "841" | "849" | "851"
                | "896" | "897" | "900" | "901" | "903" | "904" | "905" | "906" | "907"
                | "908"
        )
    }

    fn parse(code: &str, data: &str) -> Option<Self> {
        use PanelMessage::*;
        let partition = || digits::<u8>(data);
        let msg = match code {
            "500" => Ack {
                command: data.to_string(),
            },
            "501" => CommandError,
            "502" => SystemError {
                code: data.to_string(),
            },
            "505" => LoginInteraction {
                data: data.to_string(),
            },
            "510" => KeypadLedState(KeypadLeds::from_bits_retain(hex_byte(data)?)),
            "511" => KeypadLedFlashState(KeypadLeds::from_bits_retain(hex_byte(data)?)),
            "550" => {
                let [h, m, _mon, _day, _yr] = fields(data, [2, 2, 2, 2, 2])?;
                TimeBroadcast {
                    hour: digits(h)?,
                    minute: digits(m)?,
                }
            }
            "561" | "562" => {
                let [s, t] = fields(data, [1, 3])?;
                Temperature {
                    sensor: digits(s)?,
                    channel: if code == "562" {
                        TemperatureChannel::Outside
                    } else {
                        TemperatureChannel::Inside
                    },
                    raw: digits(t)?,
                }
            }
            "563" => {
                let [s, c, h] = fields(data, [1, 3, 3])?;
                ThermostatSetpoints {
                    sensor: digits(s)?,
                    cool: digits(c)?,
                    heat: digits(h)?,
                }
            }
            "601" => {
                let (partition, zone) = partition_and_zone(data)?;
                ZoneAlarm { partition, zone }
            }
            "602" => {
                let (partition, zone) = partition_and_zone(data)?;
                ZoneAlarmRestore { partition, zone }
            }
            "609" => ZoneOpen { zone: digits(data)? },
            "610" => ZoneRestored { zone: digits(data)? },
            "620" => DuressAlarm,
            "621" => FireKeyAlarm,
            "623" => AuxKeyAlarm,
            "625" => PanicKeyAlarm,
            "631" => AuxInputAlarm,
            "632" => AuxInputRestore,
            "650" => PartitionReady {
                partition: partition()?,
            },
            "651" => PartitionNotReady {
                partition: partition()?,
            },
            "652" => match data.len() {
                1 => PartitionArmed {
                    partition: partition()?,
                    mode: None,
                },
                2 => {
                    let [p, m] = fields(data, [1, 1])?;
                    PartitionArmed {
                        partition: digits(p)?,
                        mode: Some(ArmedMode::from_digit(digits(m)?)?),
                    }
                }
                _ => return None,
            },
            "653" => ForceArmingEnabled,
            "654" => PartitionInAlarm {
                partition: partition()?,
            },
            "655" => PartitionDisarmed {
                partition: partition()?,
            },
            "656" => ExitDelay {
                partition: partition()?,
            },
            "657" => EntryDelay {
                partition: partition()?,
            },
            "663" => ChimeEnabled {
                partition: partition()?,
            },
            "664" => ChimeDisabled {
                partition: partition()?,
            },
            "672" => FailedToArm {
                partition: partition()?,
            },
            "673" => PartitionBusy {
                partition: partition()?,
            },
            "700" | "701" | "702" => {
                let (partition, user) = partition_and_user(data)?;
                UserClosing { partition, user }
            }
            "750" => {
                let (partition, user) = partition_and_user(data)?;
                UserOpening { partition, user }
            }
            "800" => BatteryTrouble,
            "801" => BatteryRestore,
            "802" => AcTrouble,
            "803" => AcRestore,
            "806" => BellTrouble,
            "807" => BellRestore,
            "840" => TroubleLedOn {
                partition: partition()?,
            },
            "841" => TroubleLedOff {
                partition: partition()?,
            },
            "849" => TroubleStatus(TroubleFlags::from_bits_retain(hex_byte(data)?)),
            "851" => PartitionBusyRestore {
                partition: partition()?,
            },
            "896" => KeybusFault,
            "897" => KeybusFaultRestore,
            "900" => CodeRequired,
            "901" => LcdUpdate {
                text: data.get(5..)?.to_string(),
            },
            "903" => {
                let [l, s] = fields(data, [1, 1])?;
                LedStatus {
                    led: Led::from_index(digits(l)?)?,
                    state: LedState::from_digit(digits(s)?)?,
                }
            }
            "904" => BeepStatus,
            "905" => ToneStatus,
            "906" => BuzzerStatus,
            "907" => DoorChimeStatus,
            "908" => {
                let [major, minor, _] = fields(data, [2, 2, 2])?;
                SoftwareVersion {
                    major: major.to_string(),
                    minor: minor.to_string(),
                }
            }
            _ => return None,
        };
        Some(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{checksum, decode};
    use chrono::NaiveDate;

    fn msg(code: &str, data: &str) -> PanelMessage {
        let body = format!("{}{}", code, data);
        let line = format!("{}{:02X}", body, checksum(&body));
        PanelMessage::from_packet(&decode(&line).unwrap())
    }

    #[test]
    fn test_command_wire_strings() {
        assert_eq!(Command::Poll.to_wire_string(), "000");
        assert_eq!(Command::StatusRequest.to_wire_string(), "001");
        assert_eq!(Command::EnableTimeBroadcast.to_wire_string(), "0561");
        assert_eq!(Command::ArmAway { partition: 1 }.to_wire_string(), "0301");
        assert_eq!(Command::ArmStay { partition: 1 }.to_wire_string(), "0311");
        assert_eq!(Command::Panic(PanicType::Ambulance).to_wire_string(), "0602");
        assert_eq!(Command::Keypress('5').to_wire_string(), "0705");
        assert_eq!(Command::KeyBreak.to_wire_string(), "070^");
        assert_eq!(Command::ThermostatQuery { sensor: 2 }.to_wire_string(), "0952");
        assert_eq!(Command::ThermostatSave { sensor: 2 }.to_wire_string(), "0972");
        assert_eq!(Command::Raw("0202".into()).to_wire_string(), "0202");
    }

    #[test]
    fn test_disarm_pads_code() {
        let cmd = Command::Disarm {
            partition: 1,
            code: "1234".into(),
        };
        assert_eq!(cmd.to_wire_string(), "0401123400");
        let cmd = Command::Disarm {
            partition: 1,
            code: "123456".into(),
        };
        assert_eq!(cmd.to_wire_string(), "0401123456");
    }

    #[test]
    fn test_set_date_time() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(Command::SetDateTime(dt).to_wire_string(), "0100905030724");
    }

    #[test]
    fn test_thermostat_change() {
        let inc = Command::ThermostatChange {
            sensor: 1,
            setpoint: Setpoint::Cool,
            change: SetpointChange::Increment,
        };
        assert_eq!(inc.to_wire_string(), "0961C+000");
        let set = Command::ThermostatChange {
            sensor: 1,
            setpoint: Setpoint::Heat,
            change: SetpointChange::Set(68),
        };
        assert_eq!(set.to_wire_string(), "0961H=068");
        assert_eq!(set.expected_response(), "563");
        assert_eq!(Command::Poll.expected_response(), "500");
    }

    #[test]
    fn test_key_sequence() {
        let wire: Vec<String> = key_sequence("12")
            .iter()
            .map(Command::to_wire_string)
            .collect();
        assert_eq!(wire, vec!["0701", "070^", "0702", "070^"]);
    }

    #[test]
    fn test_key_sequence_pause() {
        // Pause in the middle still separates the keys with breaks.
        let wire: Vec<String> = key_sequence("1L2")
            .iter()
            .map(Command::to_wire_string)
            .collect();
        assert_eq!(wire, vec!["0701", "070^", "070^", "0702", "070^"]);

        // Trailing pause suppresses the final break.
        let wire: Vec<String> = key_sequence("1L")
            .iter()
            .map(Command::to_wire_string)
            .collect();
        assert_eq!(wire, vec!["0701", "070^"]);

        assert!(key_sequence("").is_empty());
        assert!(key_sequence("L").is_empty());
    }

    #[test]
    fn test_parse_zone_messages() {
        assert_eq!(msg("609", "001"), PanelMessage::ZoneOpen { zone: 1 });
        assert_eq!(msg("610", "012"), PanelMessage::ZoneRestored { zone: 12 });
        assert_eq!(
            msg("601", "1003"),
            PanelMessage::ZoneAlarm {
                partition: 1,
                zone: 3
            }
        );
        assert_eq!(
            msg("609", "0x1"),
            PanelMessage::Malformed {
                code: "609".into(),
                data: "0x1".into()
            }
        );
    }

    #[test]
    fn test_parse_partition_armed() {
        assert_eq!(
            msg("652", "1"),
            PanelMessage::PartitionArmed {
                partition: 1,
                mode: None
            }
        );
        assert_eq!(
            msg("652", "12"),
            PanelMessage::PartitionArmed {
                partition: 1,
                mode: Some(ArmedMode::AwayNoDelay)
            }
        );
        assert!(matches!(msg("652", "19"), PanelMessage::Malformed { .. }));
    }

    #[test]
    fn test_parse_status_messages() {
        assert_eq!(
            msg("510", "13"),
            PanelMessage::KeypadLedState(
                KeypadLeds::READY | KeypadLeds::ARMED | KeypadLeds::TROUBLE
            )
        );
        assert_eq!(
            msg("849", "82"),
            PanelMessage::TroubleStatus(TroubleFlags::AC_LOST | TroubleFlags::TIME_LOSS)
        );
        assert_eq!(
            msg("903", "52"),
            PanelMessage::LedStatus {
                led: Led::Trouble,
                state: LedState::Flashing
            }
        );
        assert_eq!(
            msg("550", "2315101524"),
            PanelMessage::TimeBroadcast {
                hour: 23,
                minute: 15
            }
        );
        assert_eq!(
            msg("901", "00032System Ready"),
            PanelMessage::LcdUpdate {
                text: "System Ready".into()
            }
        );
    }

    #[test]
    fn test_parse_temperature() {
        assert_eq!(
            msg("562", "1137"),
            PanelMessage::Temperature {
                sensor: 1,
                channel: TemperatureChannel::Outside,
                raw: 137
            }
        );
        assert_eq!(
            msg("563", "2072068"),
            PanelMessage::ThermostatSetpoints {
                sensor: 2,
                cool: 72,
                heat: 68
            }
        );
    }

    #[test]
    fn test_parse_user_codes() {
        assert_eq!(
            msg("700", "10040"),
            PanelMessage::UserClosing {
                partition: 1,
                user: "0040".into()
            }
        );
        assert_eq!(
            msg("750", "10001"),
            PanelMessage::UserOpening {
                partition: 1,
                user: "0001".into()
            }
        );
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(
            msg("999", "abc"),
            PanelMessage::Unrecognized {
                code: "999".into(),
                data: "abc".into()
            }
        );
    }
}
