// MIT License - Copyright (c) 2026 Peter Wright
// DSC IT-100 serial protocol engine
//
//! # dsc-serial-bridge
//!
//! Talks to a DSC PowerSeries alarm panel through an IT-100 RS-232
//! integration module and mirrors its state (zones, partitions, keypad
//! LEDs and LCD, troubles, thermostats) into host callbacks.
//!
//! The engine is a single cooperative task: [`DscPanel::run`] loops over a
//! connection state machine that opens the serial port, enables time
//! broadcast, pings, and then polls for inbound events while draining a
//! queue of outbound commands. Other tasks talk to it through a cloneable
//! [`PanelHandle`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use dsc_serial_bridge::{BridgeConfig, DscPanel, RecordingHost, SerialTransport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BridgeConfig::builder()
//!         .serial_port("/dev/ttyUSB0")
//!         .code("1234")
//!         .zones([1, 2, 3])
//!         .zone_group(1, "Doors", vec![1, 2])
//!         .build();
//!     config.validate()?;
//!
//!     let host = RecordingHost::new();
//!     let panel = DscPanel::new(SerialTransport::new(), host.collaborators(), config);
//!     let handle = panel.handle();
//!
//!     tokio::spawn(async move {
//!         tokio::signal::ctrl_c().await.ok();
//!         handle.shutdown();
//!     });
//!
//!     panel.run().await;
//!     println!("{:?}", host.zone_states());
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod comm;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod devices;
pub mod error;
pub mod event;
pub mod panel;
pub mod protocol;
pub mod testing;
pub mod transport;

// Re-exports for convenience
pub use codec::{LineFramer, Packet};
pub use comm::{ConnectionState, PanelComm};
pub use config::{BridgeConfig, BridgeConfigBuilder, ConfigProvider, ZoneGroupConfig};
pub use decoder::EventDecoder;
pub use error::{DecodeError, DscError, Result};
pub use event::{
    Collaborators, Notifier, SpeechKey, StateSink, TriggerDispatch, TriggerEvent, UserCodeKind,
};
pub use panel::{DscPanel, PanelHandle};
pub use protocol::{Command, PanelMessage, PanicType};
pub use testing::{HostEvent, RecordingHost};
pub use transport::{
    CommandKind, MemoryTransport, OutboundCommand, RetryPolicy, SendOutcome, SerialTransport,
    Transport,
};
pub use devices::zone::{Zone, ZoneGroup, ZoneGroupState, ZoneState};
pub use devices::partition::{AlarmState, ArmedMode, KeypadField, KeypadTarget, Led, LedState};
pub use devices::system::{TroubleFlags, TroubleState};
pub use devices::thermostat::{Setpoint, SetpointChange, TemperatureChannel, ThermostatAdjust};
