// MIT License - Copyright (c) 2026 Peter Wright
// Connection lifecycle: from no port to steady-state polling

use std::fmt;

use tokio::sync::watch;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::codec::decode;
use crate::config::{BridgeConfig, ConfigProvider};
use crate::constants::{BAUD_RATE, IDLE_INTERVAL};
use crate::decoder::EventDecoder;
use crate::protocol::Command;
use crate::transport::command::send_and_wait;
use crate::transport::{CommandQueue, OutboundCommand, RetryPolicy, SendOutcome, Transport};

/// Where the link is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Waiting for configuration.
    Startup,
    /// Configuration rejected; waiting for it to change.
    Hold,
    /// A setup step failed; schedule the next attempt.
    HoldRetry,
    /// Waiting out the retry delay.
    HoldRetryLoop,
    /// (Re)open the port.
    Init,
    EnableTimeBroadcast,
    Ping,
    /// Steady state.
    Poll,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Hold => "hold",
            Self::HoldRetry => "holdRetry",
            Self::HoldRetryLoop => "holdRetryLoop",
            Self::Init => "init",
            Self::EnableTimeBroadcast => "enableTimeBroadcast",
            Self::Ping => "ping",
            Self::Poll => "poll",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives the transport, the command queue and the decoder, one bounded
/// step per `tick`.
pub struct PanelComm<T: Transport> {
    transport: T,
    decoder: EventDecoder,
    queue: CommandQueue,
    provider: Box<dyn ConfigProvider>,
    config: Option<BridgeConfig>,
    state: ConnectionState,
    invalidated: bool,
    retry_deadline: Instant,
    next_keepalive: Instant,
    shutdown: watch::Receiver<bool>,
}

impl<T: Transport> PanelComm<T> {
    pub fn new(
        transport: T,
        decoder: EventDecoder,
        provider: Box<dyn ConfigProvider>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let now = Instant::now();
        Self {
            transport,
            decoder,
            queue: CommandQueue::new(),
            provider,
            config: None,
            state: ConnectionState::Startup,
            invalidated: false,
            retry_deadline: now,
            next_keepalive: now,
            shutdown,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn config(&self) -> Option<&BridgeConfig> {
        self.config.as_ref()
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn decoder(&self) -> &EventDecoder {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut EventDecoder {
        &mut self.decoder
    }

    pub fn enqueue(&mut self, command: impl Into<OutboundCommand>) {
        self.queue.push(command);
    }

    /// Mark the configuration stale. `Hold`, `HoldRetryLoop` and `Poll`
    /// return to `Startup` on their next tick.
    pub fn invalidate_config(&mut self) {
        info!("Configuration invalidated");
        self.invalidated = true;
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Release the transport.
    pub async fn close(&mut self) {
        self.transport.close().await;
    }

    fn set_state(&mut self, next: ConnectionState) {
        if next != self.state {
            debug!("Connection state {} -> {}", self.state, next);
            self.state = next;
        }
    }

    fn policy(&self) -> RetryPolicy {
        let defaults = BridgeConfig::default();
        let config = self.config.as_ref().unwrap_or(&defaults);
        RetryPolicy::new(config.command_timeout, config.command_retries)
    }

    /// Pause for one idle interval, waking early on shutdown.
    async fn idle(&mut self) {
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            _ = sleep(IDLE_INTERVAL) => {}
            Ok(()) = shutdown.changed() => {}
        }
    }

    async fn send(&mut self, command: Command) -> SendOutcome {
        let policy = self.policy();
        send_and_wait(
            &mut self.transport,
            &mut self.decoder,
            &self.shutdown,
            &command.to_wire_string(),
            command.expected_response(),
            policy,
        )
        .await
    }

    /// Run one step of the state machine plus housekeeping.
    pub async fn tick(&mut self) -> ConnectionState {
        if self.is_shutdown() {
            return self.state;
        }

        let now = Instant::now();
        self.decoder.housekeeping(now);
        for command in self.decoder.take_outbox() {
            self.queue.push(command);
        }

        match self.state {
            ConnectionState::Startup => self.startup().await,
            ConnectionState::Hold => {
                if self.invalidated {
                    self.set_state(ConnectionState::Startup);
                } else {
                    self.idle().await;
                }
            }
            ConnectionState::HoldRetry => {
                let delay = self
                    .config
                    .as_ref()
                    .map(BridgeConfig::hold_retry)
                    .unwrap_or_else(|| BridgeConfig::default().hold_retry());
                self.retry_deadline = now + delay;
                info!("Retrying panel connection in {}s", delay.as_secs());
                self.set_state(ConnectionState::HoldRetryLoop);
            }
            ConnectionState::HoldRetryLoop => {
                if self.invalidated {
                    self.set_state(ConnectionState::Startup);
                } else if now >= self.retry_deadline {
                    self.set_state(ConnectionState::Init);
                } else {
                    self.idle().await;
                }
            }
            ConnectionState::Init => self.init().await,
            ConnectionState::EnableTimeBroadcast => {
                match self.send(Command::EnableTimeBroadcast).await {
                    SendOutcome::Success(_) => self.set_state(ConnectionState::Ping),
                    SendOutcome::Cancelled => {}
                    outcome => {
                        error!("Could not enable time broadcast: {:?}", outcome);
                        self.set_state(ConnectionState::HoldRetry);
                    }
                }
            }
            ConnectionState::Ping => self.ping().await,
            ConnectionState::Poll => self.poll(now).await,
        }
        self.state
    }

    async fn startup(&mut self) {
        let Some(config) = self.provider.load() else {
            debug!("Waiting for configuration");
            self.idle().await;
            return;
        };
        self.invalidated = false;
        match config.validate() {
            Ok(()) => {
                self.decoder.apply_config(&config);
                self.config = Some(config);
                self.set_state(ConnectionState::Init);
            }
            Err(e) => {
                error!("Configuration rejected: {}", e);
                self.config = None;
                self.set_state(ConnectionState::Hold);
            }
        }
    }

    async fn init(&mut self) {
        let Some(port) = self.config.as_ref().map(|c| c.serial_port.clone()) else {
            self.set_state(ConnectionState::Startup);
            return;
        };
        self.transport.close().await;
        match self.transport.open(&port, BAUD_RATE).await {
            Ok(()) => {
                info!("Connected to interface on {}", port);
                self.set_state(ConnectionState::EnableTimeBroadcast);
            }
            Err(e) => {
                error!("Failed to open {}: {}", port, e);
                self.set_state(ConnectionState::HoldRetry);
            }
        }
    }

    async fn ping(&mut self) {
        for command in [Command::Poll, Command::StatusRequest] {
            match self.send(command).await {
                SendOutcome::Success(_) => {}
                SendOutcome::Cancelled => return,
                outcome => {
                    warn!("Panel did not answer ping: {:?}", outcome);
                    self.set_state(ConnectionState::HoldRetry);
                    return;
                }
            }
        }
        info!("Panel link established");
        self.next_keepalive = Instant::now() + self.keepalive_interval();
        self.set_state(ConnectionState::Poll);
    }

    fn keepalive_interval(&self) -> std::time::Duration {
        self.config
            .as_ref()
            .map(|c| c.keepalive_interval)
            .unwrap_or_else(|| BridgeConfig::default().keepalive_interval)
    }

    async fn poll(&mut self, now: Instant) {
        if self.invalidated {
            self.set_state(ConnectionState::Startup);
            return;
        }
        if now >= self.next_keepalive {
            self.next_keepalive = now + self.keepalive_interval();
            self.queue.push(Command::Poll);
        }

        if !self.queue.is_empty() {
            let policy = self.policy();
            let outcome = self
                .queue
                .drain_one(&mut self.transport, &mut self.decoder, &self.shutdown, policy)
                .await;
            if outcome == Some(SendOutcome::LinkClosed) {
                warn!("Link closed while sending, re-initialising");
                self.set_state(ConnectionState::Init);
            }
            return;
        }

        match self.transport.read_line().await {
            Ok(Some(line)) => match decode(&line) {
                Ok(packet) => self.decoder.handle_packet(&packet),
                Err(e) => debug!("Discarding line {:?}: {}", line, e),
            },
            Ok(None) => {}
            Err(e) => {
                warn!("Link closed while reading ({}), re-initialising", e);
                self.set_state(ConnectionState::Init);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingHost;
    use crate::transport::MemoryTransport;

    fn comm(
        link: &MemoryTransport,
        config: BridgeConfig,
    ) -> (PanelComm<MemoryTransport>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let decoder = EventDecoder::new(RecordingHost::new().collaborators());
        (
            PanelComm::new(link.clone(), decoder, Box::new(config), rx),
            tx,
        )
    }

    fn valid() -> BridgeConfig {
        BridgeConfig::builder()
            .serial_port("/dev/ttyS0")
            .code("1234")
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaches_poll() {
        let link = MemoryTransport::new().with_auto_ack();
        let (mut comm, _tx) = comm(&link, valid());
        assert_eq!(comm.tick().await, ConnectionState::Init);
        assert_eq!(comm.tick().await, ConnectionState::EnableTimeBroadcast);
        assert_eq!(comm.tick().await, ConnectionState::Ping);
        assert_eq!(comm.tick().await, ConnectionState::Poll);
        assert_eq!(link.written(), vec!["0561", "000", "001"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_holds() {
        let link = MemoryTransport::new();
        let (mut comm, _tx) = comm(&link, BridgeConfig::builder().code("1234").build());
        assert_eq!(comm.tick().await, ConnectionState::Hold);
        assert_eq!(comm.tick().await, ConnectionState::Hold);
        comm.invalidate_config();
        assert_eq!(comm.tick().await, ConnectionState::Startup);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_failure_backs_off() {
        let link = MemoryTransport::new();
        link.set_fail_open(true);
        let (mut comm, _tx) = comm(&link, valid());
        comm.tick().await;
        assert_eq!(comm.tick().await, ConnectionState::HoldRetry);
        assert_eq!(comm.tick().await, ConnectionState::HoldRetryLoop);
        let started = Instant::now();
        while comm.tick().await == ConnectionState::HoldRetryLoop {}
        assert_eq!(comm.state(), ConnectionState::Init);
        assert!(Instant::now() - started >= std::time::Duration::from_secs(180));
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_enqueued() {
        let link = MemoryTransport::new().with_auto_ack();
        let (mut comm, _tx) = comm(&link, valid());
        for _ in 0..4 {
            comm.tick().await;
        }
        link.clear_written();
        tokio::time::advance(std::time::Duration::from_secs(301)).await;
        comm.tick().await;
        assert_eq!(link.written(), vec!["000"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_ticking() {
        let link = MemoryTransport::new();
        let (mut comm, tx) = comm(&link, valid());
        tx.send(true).unwrap();
        assert_eq!(comm.tick().await, ConnectionState::Startup);
        assert_eq!(link.open_count(), 0);
    }
}
