// MIT License - Copyright (c) 2026 Peter Wright
// Outbound command queue and the send/wait/retry protocol

use std::collections::VecDeque;

use tokio::sync::watch;
use tokio::time::{Duration, Instant, timeout_at};
use tracing::{debug, error, trace, warn};

use super::Transport;
use crate::codec::{decode, encode};
use crate::constants::{CMD_POLL, CODE_ACK, CODE_SYSTEM_ERROR, CODE_THERMOSTAT_SETPOINTS};
use crate::decoder::EventDecoder;
use crate::devices::ThermostatAdjust;
use crate::error::SystemErrorCode;
use crate::protocol::Command;

/// What a queued entry does when drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Normal(Command),
    /// Query, change and save a thermostat setpoint as one unit.
    ThermostatAdjust(ThermostatAdjust),
}

/// A unit of work waiting in the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCommand {
    pub kind: CommandKind,
    /// Response code that completes the command.
    pub expected_response: String,
    /// Per-attempt wait; the configured default when unset.
    pub timeout: Option<Duration>,
    /// Total transmissions; the configured default when unset.
    pub max_retries: Option<u32>,
}

impl OutboundCommand {
    pub fn new(command: Command) -> Self {
        Self {
            expected_response: command.expected_response().to_string(),
            kind: CommandKind::Normal(command),
            timeout: None,
            max_retries: None,
        }
    }

    pub fn thermostat(adjust: ThermostatAdjust) -> Self {
        Self {
            kind: CommandKind::ThermostatAdjust(adjust),
            expected_response: CODE_THERMOSTAT_SETPOINTS.to_string(),
            timeout: None,
            max_retries: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn with_expected_response(mut self, code: impl Into<String>) -> Self {
        self.expected_response = code.into();
        self
    }
}

impl From<Command> for OutboundCommand {
    fn from(command: Command) -> Self {
        Self::new(command)
    }
}

/// Result of sending one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Matching response arrived; carries its data.
    Success(String),
    LinkClosed,
    /// The panel answered `502` with this sub-code.
    PanelError(String),
    ExhaustedRetries,
    /// Shutdown was requested while waiting.
    Cancelled,
}

impl SendOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SendOutcome::Success(_))
    }

    /// Whether the command should stay queued for the next session.
    pub fn keeps_command(&self) -> bool {
        matches!(self, SendOutcome::LinkClosed | SendOutcome::Cancelled)
    }
}

/// Per-attempt timeout and number of transmissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
        }
    }

    /// Apply the overrides carried by a queued command.
    pub fn for_command(&self, command: &OutboundCommand) -> Self {
        Self {
            timeout: command.timeout.unwrap_or(self.timeout),
            max_retries: command.max_retries.unwrap_or(self.max_retries),
        }
    }
}

/// FIFO of pending commands. No de-duplication: every push is sent.
#[derive(Debug, Default)]
pub struct CommandQueue {
    entries: VecDeque<OutboundCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: impl Into<OutboundCommand>) {
        self.entries.push_back(command.into());
    }

    pub fn front(&self) -> Option<&OutboundCommand> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OutboundCommand> {
        self.entries.iter()
    }

    /// Send the head of the queue. The head is removed unless the outcome
    /// says the link went away or shutdown interrupted it.
    pub async fn drain_one<T: Transport>(
        &mut self,
        transport: &mut T,
        decoder: &mut EventDecoder,
        shutdown: &watch::Receiver<bool>,
        defaults: RetryPolicy,
    ) -> Option<SendOutcome> {
        let head = self.entries.front()?.clone();
        let policy = defaults.for_command(&head);

        let outcome = match &head.kind {
            CommandKind::Normal(command) => {
                send_and_wait(
                    transport,
                    decoder,
                    shutdown,
                    &command.to_wire_string(),
                    &head.expected_response,
                    policy,
                )
                .await
            }
            CommandKind::ThermostatAdjust(adjust) => {
                adjust_thermostat(transport, decoder, shutdown, adjust, policy).await
            }
        };

        if !outcome.keeps_command() {
            self.entries.pop_front();
        }
        Some(outcome)
    }
}

async fn adjust_thermostat<T: Transport>(
    transport: &mut T,
    decoder: &mut EventDecoder,
    shutdown: &watch::Receiver<bool>,
    adjust: &ThermostatAdjust,
    policy: RetryPolicy,
) -> SendOutcome {
    let steps = [
        Command::ThermostatQuery {
            sensor: adjust.sensor,
        },
        Command::ThermostatChange {
            sensor: adjust.sensor,
            setpoint: adjust.setpoint,
            change: adjust.change,
        },
        Command::ThermostatSave {
            sensor: adjust.sensor,
        },
    ];

    let mut last = SendOutcome::ExhaustedRetries;
    for step in &steps {
        last = send_and_wait(
            transport,
            decoder,
            shutdown,
            &step.to_wire_string(),
            step.expected_response(),
            policy,
        )
        .await;
        if !last.is_success() {
            warn!("Thermostat {} adjustment aborted: {:?}", adjust.sensor, last);
            return last;
        }
    }
    last
}

/// Transmit `payload` and wait for its response, retransmitting on timeout.
///
/// Every valid packet read while waiting is handed to the decoder, whether
/// or not it completes the command. A `500` only completes the command when
/// it acknowledges this command's code.
pub async fn send_and_wait<T: Transport>(
    transport: &mut T,
    decoder: &mut EventDecoder,
    shutdown: &watch::Receiver<bool>,
    payload: &str,
    expected: &str,
    policy: RetryPolicy,
) -> SendOutcome {
    let command_code = payload.get(..3).unwrap_or(payload);
    let keepalive = command_code == CMD_POLL;
    let frame = encode(payload);

    for attempt in 1..=policy.max_retries {
        if *shutdown.borrow() {
            return SendOutcome::Cancelled;
        }
        if let Err(e) = transport.write_bytes(&frame).await {
            warn!("Link lost while sending {}: {}", payload, e);
            return SendOutcome::LinkClosed;
        }
        trace!("Sent {} (attempt {})", payload, attempt);

        let deadline = Instant::now() + policy.timeout;
        loop {
            if *shutdown.borrow() {
                return SendOutcome::Cancelled;
            }
            let line = match timeout_at(deadline, transport.read_line()).await {
                Err(_) => break,
                Ok(Ok(Some(line))) => line,
                Ok(Ok(None)) => {
                    if Instant::now() >= deadline {
                        break;
                    }
                    continue;
                }
                Ok(Err(e)) => {
                    warn!("Link lost waiting for {}: {}", payload, e);
                    return SendOutcome::LinkClosed;
                }
            };

            let packet = match decode(&line) {
                Ok(packet) => packet,
                Err(e) => {
                    debug!("Discarding line {:?}: {}", line, e);
                    continue;
                }
            };
            decoder.handle_packet(&packet);

            if packet.code == CODE_SYSTEM_ERROR {
                error!(
                    "Panel rejected {}: {}",
                    payload,
                    SystemErrorCode::describe(&packet.data)
                );
                return SendOutcome::PanelError(packet.data);
            }
            let matched = if expected == CODE_ACK {
                packet.code == CODE_ACK && packet.data == command_code
            } else {
                packet.code == expected
            };
            if matched {
                return SendOutcome::Success(packet.data);
            }
        }

        if keepalive {
            debug!("Keepalive timed out (attempt {})", attempt);
        } else {
            warn!("Timed out waiting for {} to {}, attempt {}", expected, payload, attempt);
        }
    }

    if keepalive {
        debug!("Keepalive unanswered after {} attempts", policy.max_retries);
    } else {
        error!(
            "Resent {} {} times with no response, giving up",
            payload, policy.max_retries
        );
    }
    SendOutcome::ExhaustedRetries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::{Setpoint, SetpointChange};
    use crate::testing::RecordingHost;
    use crate::transport::MemoryTransport;

    const POLICY: RetryPolicy = RetryPolicy {
        timeout: Duration::from_secs(3),
        max_retries: 3,
    };

    async fn setup() -> (MemoryTransport, EventDecoder, watch::Sender<bool>, watch::Receiver<bool>) {
        let mut link = MemoryTransport::new();
        link.open("mem", 9600).await.unwrap();
        let decoder = EventDecoder::new(RecordingHost::new().collaborators());
        let (tx, rx) = watch::channel(false);
        (link, decoder, tx, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_matching_ack() {
        let (mut link, mut decoder, _tx, rx) = setup().await;
        link.set_auto_ack(true);
        let outcome = send_and_wait(&mut link, &mut decoder, &rx, "0561", CODE_ACK, POLICY).await;
        assert_eq!(outcome, SendOutcome::Success("056".into()));
        assert_eq!(decoder.last_ack(), Some("056"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_foreign_ack_does_not_complete() {
        let (mut link, mut decoder, _tx, rx) = setup().await;
        link.push_packet("500000");
        let outcome = send_and_wait(&mut link, &mut decoder, &rx, "001", CODE_ACK, POLICY).await;
        assert_eq!(outcome, SendOutcome::ExhaustedRetries);
        assert_eq!(link.written().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panel_error_aborts() {
        let (mut link, mut decoder, _tx, rx) = setup().await;
        link.respond("030", &["502024"]);
        let outcome = send_and_wait(&mut link, &mut decoder, &rx, "0301", CODE_ACK, POLICY).await;
        assert_eq!(outcome, SendOutcome::PanelError("024".into()));
        assert_eq!(link.written().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels() {
        let (mut link, mut decoder, tx, rx) = setup().await;
        tx.send(true).unwrap();
        let outcome = send_and_wait(&mut link, &mut decoder, &rx, "000", CODE_ACK, POLICY).await;
        assert_eq!(outcome, SendOutcome::Cancelled);
        assert!(link.written().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_wait_cancels() {
        let (mut link, mut decoder, tx, rx) = setup().await;
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            tx.send(true).unwrap();
        });
        let started = Instant::now();
        let outcome = send_and_wait(&mut link, &mut decoder, &rx, "001", CODE_ACK, POLICY).await;
        stopper.await.unwrap();
        assert_eq!(outcome, SendOutcome::Cancelled);
        assert_eq!(link.written(), vec!["001"]);
        assert!(Instant::now() - started < POLICY.timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_keeps_head_on_link_closed() {
        let (mut link, mut decoder, _tx, rx) = setup().await;
        let mut queue = CommandQueue::new();
        queue.push(Command::StatusRequest);
        link.close_link();
        let outcome = queue.drain_one(&mut link, &mut decoder, &rx, POLICY).await;
        assert_eq!(outcome, Some(SendOutcome::LinkClosed));
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_drops_after_exhaustion() {
        let (mut link, mut decoder, _tx, rx) = setup().await;
        let mut queue = CommandQueue::new();
        queue.push(OutboundCommand::new(Command::StatusRequest).with_retries(2));
        let outcome = queue.drain_one(&mut link, &mut decoder, &rx, POLICY).await;
        assert_eq!(outcome, Some(SendOutcome::ExhaustedRetries));
        assert!(queue.is_empty());
        assert_eq!(link.written(), vec!["001", "001"]);
        assert_eq!(queue.drain_one(&mut link, &mut decoder, &rx, POLICY).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_thermostat_adjust_sequence() {
        let (mut link, mut decoder, _tx, rx) = setup().await;
        link.respond("09", &["5631072068"]);
        let mut queue = CommandQueue::new();
        queue.push(OutboundCommand::thermostat(ThermostatAdjust {
            sensor: 1,
            setpoint: Setpoint::Cool,
            change: SetpointChange::Increment,
        }));
        let outcome = queue.drain_one(&mut link, &mut decoder, &rx, POLICY).await;
        assert_eq!(outcome, Some(SendOutcome::Success("1072068".into())));
        assert_eq!(link.written(), vec!["0951", "0961C+000", "0971"]);
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_thermostat_adjust_aborts_on_failure() {
        let (mut link, mut decoder, _tx, rx) = setup().await;
        let mut queue = CommandQueue::new();
        queue.push(
            OutboundCommand::thermostat(ThermostatAdjust {
                sensor: 1,
                setpoint: Setpoint::Heat,
                change: SetpointChange::Set(68),
            })
            .with_retries(1),
        );
        let outcome = queue.drain_one(&mut link, &mut decoder, &rx, POLICY).await;
        assert_eq!(outcome, Some(SendOutcome::ExhaustedRetries));
        assert_eq!(link.written(), vec!["0951"]);
    }

    #[test]
    fn test_policy_overrides() {
        let cmd = OutboundCommand::new(Command::Poll).with_timeout(Duration::from_secs(1));
        let policy = POLICY.for_command(&cmd);
        assert_eq!(policy.timeout, Duration::from_secs(1));
        assert_eq!(policy.max_retries, 3);
    }
}
