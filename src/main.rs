// MIT License - Copyright (c) 2026 Peter Wright
// MQTT bridge

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use tokio::signal::unix::{SignalKind, signal};
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

use dsc_serial_bridge::{
    AlarmState, BridgeConfig, Collaborators, ConfigProvider, DscPanel, KeypadField, KeypadTarget,
    Notifier, PanelHandle, PanicType, SerialTransport, Setpoint, SetpointChange, SpeechKey,
    StateSink, TemperatureChannel, ThermostatAdjust, TriggerDispatch, TriggerEvent, UserCodeKind,
    ZoneGroupState, ZoneState,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "dsc2mqtt")]
#[command(about = "Bridge between a DSC alarm panel (IT-100 serial interface) and MQTT")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    panel: PanelToml,
    mqtt: MqttToml,
    #[serde(default, deserialize_with = "deserialize_zone_names")]
    zones: HashMap<u16, String>,
    #[serde(default)]
    zone_groups: Vec<ZoneGroupToml>,
    /// Phrase per speech key; `{zones}` is replaced with the zone names.
    #[serde(default)]
    speech: HashMap<String, String>,
}

fn deserialize_zone_names<'de, D>(deserializer: D) -> Result<HashMap<u16, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let string_map: HashMap<String, String> = HashMap::deserialize(deserializer)?;
    string_map
        .into_iter()
        .map(|(k, v)| {
            k.parse::<u16>()
                .map(|id| (id, v))
                .map_err(|_| serde::de::Error::custom(format!("invalid zone ID: {k}")))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct PanelToml {
    serial_port: String,
    code: String,
    #[serde(default = "default_partition")]
    partition: u8,
    #[serde(default = "default_true")]
    time_sync: bool,
    #[serde(default = "default_command_timeout")]
    command_timeout_secs: u64,
    #[serde(default = "default_command_retries")]
    command_retries: u32,
    #[serde(default = "default_hold_retry")]
    hold_retry_minutes: u64,
    #[serde(default = "default_trouble_clear")]
    trouble_clear_ticks: u32,
    #[serde(default = "default_alarm_repeat")]
    alarm_repeat_secs: u64,
    #[serde(default = "default_keepalive")]
    keepalive_secs: u64,
}

fn default_partition() -> u8 {
    1
}
fn default_true() -> bool {
    true
}
fn default_command_timeout() -> u64 {
    3
}
fn default_command_retries() -> u32 {
    3
}
fn default_hold_retry() -> u64 {
    3
}
fn default_trouble_clear() -> u32 {
    10
}
fn default_alarm_repeat() -> u64 {
    12
}
fn default_keepalive() -> u64 {
    301
}

#[derive(Debug, Deserialize)]
struct ZoneGroupToml {
    id: u32,
    name: String,
    zones: Vec<u16>,
}

#[derive(Debug, Deserialize)]
struct MqttToml {
    url: String,
    #[serde(default = "default_client_id")]
    client_id: String,
    #[serde(default = "default_subscribe_topic")]
    subscribe_topic: String,
    #[serde(default = "default_publish_topic")]
    publish_topic: String,
}

fn default_client_id() -> String {
    "dsc-bridge".to_string()
}
fn default_subscribe_topic() -> String {
    "dsc/cmd".to_string()
}
fn default_publish_topic() -> String {
    "dsc".to_string()
}

fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).context("Failed to parse config file")
}

fn build_bridge_config(config: &Config) -> BridgeConfig {
    let panel = &config.panel;
    let mut zones: Vec<u16> = config.zones.keys().copied().collect();
    zones.sort_unstable();
    let mut builder = BridgeConfig::builder()
        .serial_port(&panel.serial_port)
        .code(&panel.code)
        .partition(panel.partition)
        .time_sync(panel.time_sync)
        .command_timeout(Duration::from_secs(panel.command_timeout_secs))
        .command_retries(panel.command_retries)
        .hold_retry_minutes(panel.hold_retry_minutes)
        .trouble_clear_ticks(panel.trouble_clear_ticks)
        .alarm_repeat_interval(Duration::from_secs(panel.alarm_repeat_secs))
        .keepalive_interval(Duration::from_secs(panel.keepalive_secs))
        .zones(zones);
    for group in &config.zone_groups {
        builder = builder.zone_group(group.id, &group.name, group.zones.clone());
    }
    builder.build()
}

/// Names used when publishing, refreshed on every config load.
#[derive(Debug, Default)]
struct Labels {
    zones: HashMap<u16, String>,
    groups: HashMap<u32, String>,
    speech: HashMap<String, String>,
}

impl Labels {
    fn from_config(config: &Config) -> Self {
        Self {
            zones: config.zones.clone(),
            groups: config
                .zone_groups
                .iter()
                .map(|g| (g.id, g.name.clone()))
                .collect(),
            speech: config.speech.clone(),
        }
    }

    fn zone(&self, id: u16) -> String {
        self.zones
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Zone {id}"))
    }

    fn group(&self, id: u32) -> String {
        self.groups
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Group {id}"))
    }

    fn zone_list(&self, zones: &[u16]) -> String {
        zones
            .iter()
            .map(|&z| self.zone(z))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

type SharedLabels = Arc<RwLock<Labels>>;

/// Re-reads the TOML file whenever the engine asks for configuration.
struct FileConfigProvider {
    path: PathBuf,
    labels: SharedLabels,
}

impl ConfigProvider for FileConfigProvider {
    fn load(&mut self) -> Option<BridgeConfig> {
        match load_config(&self.path) {
            Ok(config) => {
                info!("Loaded configuration from {}", self.path.display());
                *self.labels.write().unwrap_or_else(PoisonError::into_inner) =
                    Labels::from_config(&config);
                Some(build_bridge_config(&config))
            }
            Err(e) => {
                error!("{e:#}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MQTT JSON types
// ---------------------------------------------------------------------------

// Published messages share a flat {now, op, ...} structure

#[derive(Serialize)]
struct MqttZoneState {
    now: u64,
    op: &'static str,
    zone: u16,
    name: String,
    state: &'static str,
}

#[derive(Serialize)]
struct MqttZoneTimer {
    now: u64,
    op: &'static str,
    zone: u16,
    minutes: u32,
    label: String,
}

#[derive(Serialize)]
struct MqttGroupState {
    now: u64,
    op: &'static str,
    group: u32,
    name: String,
    state: &'static str,
}

#[derive(Serialize)]
struct MqttGroupTimers {
    now: u64,
    op: &'static str,
    group: u32,
    #[serde(rename = "anyMemberMinutes")]
    any_member_minutes: u32,
    #[serde(rename = "entireGroupMinutes")]
    entire_group_minutes: u32,
}

#[derive(Serialize)]
struct MqttPartitionState {
    now: u64,
    op: &'static str,
    partition: u8,
    state: &'static str,
}

#[derive(Serialize)]
struct MqttKeypadField {
    now: u64,
    op: &'static str,
    /// Partition number, or 0 for every keypad
    partition: u8,
    field: &'static str,
    value: String,
}

#[derive(Serialize)]
struct MqttTemperature {
    now: u64,
    op: &'static str,
    sensor: u8,
    channel: &'static str,
    degrees: i16,
}

#[derive(Serialize)]
struct MqttTrippedZone {
    zone: u16,
    name: String,
    state: &'static str,
}

#[derive(Serialize)]
struct MqttZonesTripped {
    now: u64,
    op: &'static str,
    zones: Vec<MqttTrippedZone>,
}

#[derive(Serialize)]
struct MqttTrouble {
    now: u64,
    op: &'static str,
    body: String,
}

#[derive(Serialize)]
struct MqttSpeech {
    now: u64,
    op: &'static str,
    key: &'static str,
    text: String,
}

#[derive(Serialize)]
struct MqttTrigger {
    now: u64,
    op: &'static str,
    event: &'static str,
}

#[derive(Serialize)]
struct MqttUserCode {
    now: u64,
    op: &'static str,
    kind: &'static str,
    user: String,
}

// CMD_ACK response
#[derive(Serialize)]
struct MqttCmdAck {
    now: u64,
    op: &'static str,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    src: Option<serde_json::Value>,
}

// Inbound command (subscribed)
#[derive(Deserialize)]
struct MqttCommand {
    op: String,
    #[serde(default)]
    panic: Option<String>,
    #[serde(default)]
    keys: Option<String>,
    #[serde(default)]
    sensor: Option<u8>,
    #[serde(default)]
    which: Option<String>,
    #[serde(default)]
    adjust: Option<String>,
    #[serde(default)]
    setpoint: Option<u16>,
    #[serde(default)]
    group: Option<u32>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Queue a publish without waiting; the engine calls the host synchronously.
fn publish_json(client: &AsyncClient, topic: &str, payload: &impl Serialize, retain: bool) {
    match serde_json::to_string(payload) {
        Ok(json) => {
            if let Err(e) = client.try_publish(topic, QoS::AtLeastOnce, retain, json) {
                error!("Failed to publish to {topic}: {e}");
            }
        }
        Err(e) => error!("Failed to serialize MQTT payload: {e}"),
    }
}

fn keypad_partition(target: KeypadTarget) -> u8 {
    match target {
        KeypadTarget::All => 0,
        KeypadTarget::Partition(p) => p,
    }
}

// ---------------------------------------------------------------------------
// Engine collaborators → MQTT
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct MqttHost {
    client: AsyncClient,
    topic: String,
    labels: SharedLabels,
}

impl MqttHost {
    fn labels(&self) -> std::sync::RwLockReadGuard<'_, Labels> {
        self.labels.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state(&self, suffix: &str, payload: &impl Serialize) {
        publish_json(&self.client, &format!("{}/{suffix}", self.topic), payload, true);
    }

    fn event(&self, payload: &impl Serialize) {
        publish_json(&self.client, &self.topic, payload, false);
    }
}

impl StateSink for MqttHost {
    fn set_zone_state(&mut self, zone: u16, state: ZoneState) {
        let name = self.labels().zone(zone);
        info!("Zone {zone} ({name}) is {state}");
        self.state(
            &format!("zone/{zone}"),
            &MqttZoneState {
                now: now_epoch_ms(),
                op: "ZONE_STATE",
                zone,
                name,
                state: state.as_str(),
            },
        );
    }

    fn set_zone_timer(&mut self, zone: u16, minutes: u32, label: &str) {
        self.state(
            &format!("zone/{zone}/timer"),
            &MqttZoneTimer {
                now: now_epoch_ms(),
                op: "ZONE_TIMER",
                zone,
                minutes,
                label: label.to_string(),
            },
        );
    }

    fn set_zone_group_state(&mut self, group: u32, state: ZoneGroupState) {
        let name = self.labels().group(group);
        self.state(
            &format!("group/{group}"),
            &MqttGroupState {
                now: now_epoch_ms(),
                op: "GROUP_STATE",
                group,
                name,
                state: state.as_str(),
            },
        );
    }

    fn set_zone_group_timers(&mut self, group: u32, any_member_minutes: u32, entire_group_minutes: u32) {
        self.state(
            &format!("group/{group}/timers"),
            &MqttGroupTimers {
                now: now_epoch_ms(),
                op: "GROUP_TIMERS",
                group,
                any_member_minutes,
                entire_group_minutes,
            },
        );
    }

    fn set_partition_state(&mut self, partition: u8, state: AlarmState) {
        self.state(
            &format!("partition/{partition}"),
            &MqttPartitionState {
                now: now_epoch_ms(),
                op: "PART_STATE",
                partition,
                state: state.as_str(),
            },
        );
    }

    fn set_keypad_field(&mut self, target: KeypadTarget, field: KeypadField) {
        let partition = keypad_partition(target);
        self.state(
            &format!("keypad/{partition}/{}", field.name()),
            &MqttKeypadField {
                now: now_epoch_ms(),
                op: "KEYPAD",
                partition,
                field: field.name(),
                value: field.value(),
            },
        );
    }

    fn set_temperature(&mut self, sensor: u8, channel: TemperatureChannel, degrees: i16) {
        self.state(
            &format!("thermostat/{sensor}/{}", channel.as_str()),
            &MqttTemperature {
                now: now_epoch_ms(),
                op: "TEMPERATURE",
                sensor,
                channel: channel.as_str(),
                degrees,
            },
        );
    }
}

impl Notifier for MqttHost {
    fn notify_zones_tripped(&mut self, zones: &[(u16, ZoneState)]) {
        let labels = self.labels();
        let zones = zones
            .iter()
            .map(|&(zone, state)| MqttTrippedZone {
                zone,
                name: labels.zone(zone),
                state: state.as_str(),
            })
            .collect();
        drop(labels);
        self.event(&MqttZonesTripped {
            now: now_epoch_ms(),
            op: "ZONES_TRIPPED",
            zones,
        });
    }

    fn notify_trouble(&mut self, body: &str) {
        self.event(&MqttTrouble {
            now: now_epoch_ms(),
            op: "TROUBLE",
            body: body.to_string(),
        });
    }

    fn speak(&mut self, key: SpeechKey, zones: &[u16]) {
        let text = {
            let labels = self.labels();
            let template = labels
                .speech
                .get(key.as_str())
                .cloned()
                .unwrap_or_default();
            template.replace("{zones}", &labels.zone_list(zones))
        };
        debug!("Speak {}: {text}", key.as_str());
        self.event(&MqttSpeech {
            now: now_epoch_ms(),
            op: "SPEAK",
            key: key.as_str(),
            text,
        });
    }
}

impl TriggerDispatch for MqttHost {
    fn fire_event(&mut self, event: TriggerEvent) {
        self.event(&MqttTrigger {
            now: now_epoch_ms(),
            op: "TRIGGER",
            event: event.as_str(),
        });
    }

    fn fire_user_code_trigger(&mut self, kind: UserCodeKind, user_code: &str) {
        self.event(&MqttUserCode {
            now: now_epoch_ms(),
            op: "USER_CODE",
            kind: kind.as_str(),
            user: user_code.to_string(),
        });
    }
}

// ---------------------------------------------------------------------------
// MQTT command handler
// ---------------------------------------------------------------------------

fn parse_panic(name: &str) -> Option<PanicType> {
    match name.to_lowercase().as_str() {
        "fire" => Some(PanicType::Fire),
        "ambulance" | "medical" => Some(PanicType::Ambulance),
        "panic" | "police" => Some(PanicType::Panic),
        _ => None,
    }
}

fn parse_thermostat(cmd: &MqttCommand) -> Option<ThermostatAdjust> {
    let setpoint = Setpoint::from_char(cmd.which.as_deref()?.chars().next()?)?;
    let change = match cmd.adjust.as_deref()? {
        "+" | "up" => SetpointChange::Increment,
        "-" | "down" => SetpointChange::Decrement,
        "=" | "set" => SetpointChange::Set(cmd.setpoint?),
        _ => return None,
    };
    Some(ThermostatAdjust {
        sensor: cmd.sensor?,
        setpoint,
        change,
    })
}

fn handle_command(payload_str: &str, cmd: MqttCommand, client: &AsyncClient, topic: &str, panel: &PanelHandle) {
    // Parse the raw payload as a JSON value for the CMD_ACK src field
    let src = serde_json::from_str::<serde_json::Value>(payload_str).ok();

    let result = match cmd.op.as_str() {
        "PING" => Ok(()),
        "ARM_AWAY" => panel.arm_away(),
        "ARM_STAY" => panel.arm_stay(),
        "DISARM" => panel.disarm(),
        "PANIC" => match cmd.panic.as_deref().and_then(parse_panic) {
            Some(kind) => panel.panic(kind),
            None => {
                warn!("PANIC: missing or unknown panic type");
                publish_cmd_ack(client, topic, false, src);
                return;
            }
        },
        "KEYS" => match cmd.keys.as_deref() {
            Some(keys) if !keys.is_empty() => panel.send_keys(keys),
            _ => {
                warn!("KEYS: missing keys");
                publish_cmd_ack(client, topic, false, src);
                return;
            }
        },
        "THERMOSTAT" => match parse_thermostat(&cmd) {
            Some(adjust) => panel.adjust_thermostat(adjust),
            None => {
                warn!("THERMOSTAT: need sensor, which (cool/heat) and adjust (+, -, =)");
                publish_cmd_ack(client, topic, false, src);
                return;
            }
        },
        "RESET_GROUP_TIMER" => match cmd.group {
            Some(group) => panel.reset_zone_group_timer(group),
            None => {
                warn!("RESET_GROUP_TIMER: missing group");
                publish_cmd_ack(client, topic, false, src);
                return;
            }
        },
        other => {
            warn!("Unknown command: {other}");
            publish_cmd_ack(client, topic, false, src);
            return;
        }
    };

    if let Err(e) = &result {
        error!("{} failed: {e}", cmd.op);
    }
    publish_cmd_ack(client, topic, result.is_ok(), src);
}

fn publish_cmd_ack(client: &AsyncClient, topic: &str, success: bool, src: Option<serde_json::Value>) {
    let msg = MqttCmdAck {
        now: now_epoch_ms(),
        op: "CMD_ACK",
        success,
        src,
    };
    publish_json(client, topic, &msg, false);
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=dsc_serial_bridge=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();

    // MQTT settings are read once; panel settings are re-read on SIGHUP
    let config = load_config(&cli.config)?;
    let (mqtt_host, mqtt_port) = parse_mqtt_url(&config.mqtt.url)?;
    let publish_topic = config.mqtt.publish_topic.clone();
    let subscribe_topic = config.mqtt.subscribe_topic.clone();
    let labels: SharedLabels = Arc::new(RwLock::new(Labels::from_config(&config)));

    let mut mqtt_opts = MqttOptions::new(&config.mqtt.client_id, &mqtt_host, mqtt_port);
    mqtt_opts.set_keep_alive(Duration::from_secs(30));
    let (client, mut eventloop) = AsyncClient::new(mqtt_opts, 256);

    let host = MqttHost {
        client: client.clone(),
        topic: publish_topic.clone(),
        labels: Arc::clone(&labels),
    };
    let provider = FileConfigProvider {
        path: cli.config.clone(),
        labels,
    };
    let panel = DscPanel::new(SerialTransport::new(), Collaborators::from_host(host), provider);
    let handle = panel.handle();

    // MQTT event loop (receives messages, handles commands)
    let panel_cmds = handle.clone();
    let client_cmds = client.clone();
    let topic_cmds = publish_topic.clone();
    let mqtt_handle = tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    // rumqttc does not resubscribe after a broker reconnect
                    info!("MQTT: connected, subscribing to {subscribe_topic}");
                    if let Err(e) = client_cmds.subscribe(&subscribe_topic, QoS::AtLeastOnce).await {
                        error!("Failed to subscribe to {subscribe_topic}: {e}");
                    }
                }
                Ok(Event::Incoming(Packet::Publish(msg))) => {
                    if msg.topic == subscribe_topic {
                        let payload = String::from_utf8_lossy(&msg.payload);
                        match serde_json::from_str::<MqttCommand>(&payload) {
                            Ok(cmd) => {
                                info!("MQTT command received: {payload}");
                                handle_command(&payload, cmd, &client_cmds, &topic_cmds, &panel_cmds);
                            }
                            Err(e) => warn!("Failed to parse MQTT command: {e}"),
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT event loop error: {e}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    // Signals: SIGHUP reloads the panel config, SIGINT/SIGTERM stop
    let mut sighup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let signal_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("Received SIGINT, shutting down...");
                    break;
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down...");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, reloading config...");
                    if let Err(e) = handle.reload_config() {
                        warn!("Could not request reload: {e}");
                    }
                }
            }
        }
        handle.shutdown();
    });

    info!("MQTT bridge running. Send SIGHUP to reload, SIGINT/SIGTERM to stop.");
    panel.run().await;

    signal_handle.abort();
    mqtt_handle.abort();
    info!("Shutdown complete");
    Ok(())
}

/// Parse an MQTT URL like "mqtt://host:port" into (host, port).
fn parse_mqtt_url(url: &str) -> Result<(String, u16)> {
    let stripped = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port_str) = stripped
        .rsplit_once(':')
        .context("MQTT URL must be in format mqtt://host:port")?;

    let port: u16 = port_str.parse().context("Invalid MQTT port number")?;

    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [panel]
        serial_port = "/dev/ttyUSB0"
        code = "1234"
        time_sync = false

        [mqtt]
        url = "mqtt://localhost:1883"

        [zones]
        1 = "Front Door"
        3 = "Kitchen Window"

        [[zone_groups]]
        id = 10
        name = "Doors"
        zones = [1]

        [speech]
        tripped = "Alarm in {zones}"
    "#;

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let bridge = build_bridge_config(&config);
        assert_eq!(bridge.serial_port, "/dev/ttyUSB0");
        assert!(!bridge.time_sync);
        assert_eq!(bridge.command_retries, 3);
        assert_eq!(bridge.keepalive_interval, Duration::from_secs(301));
        assert_eq!(bridge.zones, vec![1, 3]);
        assert_eq!(bridge.zone_groups[0].name, "Doors");
        assert!(bridge.validate().is_ok());
        assert_eq!(config.mqtt.publish_topic, "dsc");
    }

    #[test]
    fn test_labels() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let labels = Labels::from_config(&config);
        assert_eq!(labels.zone(1), "Front Door");
        assert_eq!(labels.zone(2), "Zone 2");
        assert_eq!(labels.zone_list(&[1, 3]), "Front Door, Kitchen Window");
        assert_eq!(labels.group(10), "Doors");
    }

    #[test]
    fn test_parse_mqtt_url() {
        assert_eq!(
            parse_mqtt_url("mqtt://broker:1883").unwrap(),
            ("broker".to_string(), 1883)
        );
        assert!(parse_mqtt_url("broker").is_err());
    }

    #[test]
    fn test_parse_thermostat_command() {
        let cmd: MqttCommand = serde_json::from_str(
            r#"{"op":"THERMOSTAT","sensor":1,"which":"heat","adjust":"=","setpoint":68}"#,
        )
        .unwrap();
        assert_eq!(
            parse_thermostat(&cmd),
            Some(ThermostatAdjust {
                sensor: 1,
                setpoint: Setpoint::Heat,
                change: SetpointChange::Set(68)
            })
        );
        let cmd: MqttCommand =
            serde_json::from_str(r#"{"op":"THERMOSTAT","sensor":1,"which":"cool","adjust":"="}"#)
                .unwrap();
        assert_eq!(parse_thermostat(&cmd), None);
    }

    #[test]
    fn test_parse_panic() {
        assert_eq!(parse_panic("Fire"), Some(PanicType::Fire));
        assert_eq!(parse_panic("medical"), Some(PanicType::Ambulance));
        assert_eq!(parse_panic("smoke"), None);
    }
}
