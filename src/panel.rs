// MIT License - Copyright (c) 2026 Peter Wright
// Public engine API and the handle used to control it

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::comm::{ConnectionState, PanelComm};
use crate::config::ConfigProvider;
use crate::decoder::EventDecoder;
use crate::devices::ThermostatAdjust;
use crate::error::{DscError, Result};
use crate::event::Collaborators;
use crate::protocol::{Command, PanicType, key_sequence};
use crate::transport::{OutboundCommand, Transport};

/// Work requested through a [`PanelHandle`].
#[derive(Debug, Clone)]
enum PanelRequest {
    /// Arm or disarm using the configured partition and code.
    ArmAway,
    ArmStay,
    Disarm,
    Enqueue(Vec<OutboundCommand>),
    ResetGroupTimer(u32),
    ReloadConfig,
}

/// The engine for one DSC panel behind an IT-100 interface.
///
/// # Example
///
/// ```no_run
/// use dsc_serial_bridge::{BridgeConfig, DscPanel, RecordingHost, SerialTransport};
///
/// #[tokio::main]
/// async fn main() {
///     let config = BridgeConfig::builder()
///         .serial_port("/dev/ttyUSB0")
///         .code("1234")
///         .build();
///
///     let host = RecordingHost::new();
///     let panel = DscPanel::new(SerialTransport::new(), host.collaborators(), config);
///     let handle = panel.handle();
///
///     tokio::spawn(async move {
///         tokio::signal::ctrl_c().await.ok();
///         handle.shutdown();
///     });
///
///     panel.run().await;
/// }
/// ```
pub struct DscPanel<T: Transport> {
    comm: PanelComm<T>,
    requests: mpsc::UnboundedReceiver<PanelRequest>,
    handle: PanelHandle,
}

impl<T: Transport> DscPanel<T> {
    pub fn new(
        transport: T,
        host: Collaborators,
        provider: impl ConfigProvider + 'static,
    ) -> Self {
        Self::with_decoder(transport, EventDecoder::new(host), provider)
    }

    /// Build around a pre-configured decoder (e.g. one with a fixed clock).
    pub fn with_decoder(
        transport: T,
        decoder: EventDecoder,
        provider: impl ConfigProvider + 'static,
    ) -> Self {
        let (tx, requests) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            comm: PanelComm::new(transport, decoder, Box::new(provider), shutdown_rx),
            requests,
            handle: PanelHandle {
                tx,
                shutdown: Arc::new(shutdown_tx),
            },
        }
    }

    /// A cloneable handle for queueing commands from other tasks.
    pub fn handle(&self) -> PanelHandle {
        self.handle.clone()
    }

    pub fn comm(&self) -> &PanelComm<T> {
        &self.comm
    }

    pub fn state(&self) -> ConnectionState {
        self.comm.state()
    }

    fn apply(&mut self, request: PanelRequest) {
        match request {
            PanelRequest::ArmAway | PanelRequest::ArmStay | PanelRequest::Disarm => {
                let Some(config) = self.comm.config() else {
                    warn!("No configuration loaded, dropping {:?}", request);
                    return;
                };
                let partition = config.partition;
                let command = match request {
                    PanelRequest::ArmAway => Command::ArmAway { partition },
                    PanelRequest::ArmStay => Command::ArmStay { partition },
                    _ => Command::Disarm {
                        partition,
                        code: config.code.clone(),
                    },
                };
                self.comm.enqueue(command);
            }
            PanelRequest::Enqueue(commands) => {
                for command in commands {
                    self.comm.enqueue(command);
                }
            }
            PanelRequest::ResetGroupTimer(group) => {
                self.comm.decoder_mut().reset_group_timer(group);
            }
            PanelRequest::ReloadConfig => self.comm.invalidate_config(),
        }
    }

    /// Apply pending requests, then run one state machine step.
    pub async fn tick(&mut self) -> ConnectionState {
        while let Ok(request) = self.requests.try_recv() {
            debug!("Panel request {:?}", request);
            self.apply(request);
        }
        self.comm.tick().await
    }

    /// Tick until shutdown, then close the transport.
    pub async fn run(mut self) {
        info!("Panel engine started");
        while !self.comm.is_shutdown() {
            self.tick().await;
        }
        self.comm.close().await;
        info!("Panel engine stopped");
    }
}

/// Cloneable control surface for a running [`DscPanel`].
#[derive(Debug, Clone)]
pub struct PanelHandle {
    tx: mpsc::UnboundedSender<PanelRequest>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl PanelHandle {
    fn request(&self, request: PanelRequest) -> Result<()> {
        self.tx.send(request).map_err(|_| DscError::Cancelled)
    }

    pub fn arm_away(&self) -> Result<()> {
        self.request(PanelRequest::ArmAway)
    }

    pub fn arm_stay(&self) -> Result<()> {
        self.request(PanelRequest::ArmStay)
    }

    /// Disarm with the configured code. Repeated calls send repeated commands.
    pub fn disarm(&self) -> Result<()> {
        self.request(PanelRequest::Disarm)
    }

    pub fn panic(&self, kind: PanicType) -> Result<()> {
        self.send_command(Command::Panic(kind))
    }

    /// Type a key string on the virtual keypad.
    pub fn send_keys(&self, keys: &str) -> Result<()> {
        let commands = key_sequence(keys)
            .into_iter()
            .map(OutboundCommand::new)
            .collect();
        self.request(PanelRequest::Enqueue(commands))
    }

    pub fn adjust_thermostat(&self, adjust: ThermostatAdjust) -> Result<()> {
        self.enqueue(OutboundCommand::thermostat(adjust))
    }

    pub fn send_command(&self, command: Command) -> Result<()> {
        self.enqueue(OutboundCommand::new(command))
    }

    pub fn enqueue(&self, command: OutboundCommand) -> Result<()> {
        self.request(PanelRequest::Enqueue(vec![command]))
    }

    pub fn reset_zone_group_timer(&self, group: u32) -> Result<()> {
        self.request(PanelRequest::ResetGroupTimer(group))
    }

    /// Have the engine re-read its configuration.
    pub fn reload_config(&self) -> Result<()> {
        self.request(PanelRequest::ReloadConfig)
    }

    /// Stop the engine. In-flight waits return immediately.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }
}
