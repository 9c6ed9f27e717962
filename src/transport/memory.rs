// MIT License - Copyright (c) 2026 Peter Wright
// In-memory transport for tests and dry runs

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::sleep;
use tracing::trace;

use super::Transport;
use crate::codec::checksum;
use crate::constants::{CODE_ACK, READ_TIMEOUT};
use crate::error::{DscError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    open: bool,
    opens: u32,
    fail_open: bool,
    auto_ack: bool,
    inbound: VecDeque<String>,
    written: Vec<String>,
    /// Lines queued when a written payload starts with the prefix.
    responders: Vec<(String, Vec<String>)>,
}

/// Scripted panel. Clones share the same state, so a test keeps one clone
/// to drive the link while the engine owns the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<MemoryState>>,
}

/// Append the checksum to a payload, giving a complete inbound line.
pub fn frame(payload: &str) -> String {
    format!("{}{:02X}", payload, checksum(payload))
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acknowledge every written command with `500` + its code.
    pub fn with_auto_ack(self) -> Self {
        self.state().auto_ack = true;
        self
    }

    pub fn set_auto_ack(&self, enabled: bool) {
        self.state().auto_ack = enabled;
    }

    /// Make every `open` fail until cleared.
    pub fn set_fail_open(&self, fail: bool) {
        self.state().fail_open = fail;
    }

    /// Queue a raw line exactly as it would arrive.
    pub fn push_line(&self, line: impl Into<String>) {
        self.state().inbound.push_back(line.into());
    }

    /// Queue a payload, adding a valid checksum.
    pub fn push_packet(&self, payload: &str) {
        self.push_line(frame(payload));
    }

    /// Answer any written payload starting with `prefix` with these packets.
    pub fn respond(&self, prefix: &str, payloads: &[&str]) {
        let lines = payloads.iter().map(|p| frame(p)).collect();
        self.state().responders.push((prefix.to_string(), lines));
    }

    /// Simulate the device disappearing.
    pub fn close_link(&self) {
        let mut state = self.state();
        state.open = false;
        state.inbound.clear();
    }

    /// Payloads written so far, without checksum or terminator.
    pub fn written(&self) -> Vec<String> {
        self.state().written.clone()
    }

    pub fn clear_written(&self) {
        self.state().written.clear();
    }

    /// Number of successful `open` calls.
    pub fn open_count(&self) -> u32 {
        self.state().opens
    }

    pub fn pending_inbound(&self) -> usize {
        self.state().inbound.len()
    }
}

impl Transport for MemoryTransport {
    async fn open(&mut self, path: &str, _baud_rate: u32) -> Result<()> {
        let mut state = self.state();
        if state.fail_open {
            return Err(DscError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("cannot open {}", path),
            )));
        }
        state.open = true;
        state.opens += 1;
        Ok(())
    }

    async fn close(&mut self) {
        self.state().open = false;
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        let line = {
            let mut state = self.state();
            if !state.open {
                return Err(DscError::LinkClosed);
            }
            state.inbound.pop_front()
        };
        match line {
            Some(line) => {
                trace!("RX {}", line);
                Ok(Some(line))
            }
            None => {
                sleep(READ_TIMEOUT).await;
                if self.state().open {
                    Ok(None)
                } else {
                    Err(DscError::LinkClosed)
                }
            }
        }
    }

    async fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.state();
        if !state.open {
            return Err(DscError::LinkClosed);
        }
        let text = String::from_utf8_lossy(data);
        let text = text.trim_end();
        // Strip the checksum to record the bare payload.
        let payload = text.get(..text.len().saturating_sub(2)).unwrap_or_default().to_string();
        trace!("TX {}", payload);

        let replies: Vec<String> = state
            .responders
            .iter()
            .filter(|(prefix, _)| payload.starts_with(prefix.as_str()))
            .flat_map(|(_, lines)| lines.iter().cloned())
            .collect();
        state.inbound.extend(replies);
        if state.auto_ack {
            let code = payload.get(..3).unwrap_or(payload.as_str());
            state.inbound.push_back(frame(&format!("{}{}", CODE_ACK, code)));
        }
        state.written.push(payload);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state().open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;

    #[tokio::test(start_paused = true)]
    async fn test_scripted_lines_and_timeout() {
        let mut link = MemoryTransport::new();
        link.open("mem", 9600).await.unwrap();
        link.push_packet("609001");
        assert_eq!(link.read_line().await.unwrap().as_deref(), Some("60900130"));
        assert_eq!(link.read_line().await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_ack_and_record() {
        let mut link = MemoryTransport::new().with_auto_ack();
        link.open("mem", 9600).await.unwrap();
        link.write_bytes(&encode("0561")).await.unwrap();
        assert_eq!(link.written(), vec!["0561"]);
        assert_eq!(link.read_line().await.unwrap().as_deref(), Some("50005630"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_link_and_fail_open() {
        let mut link = MemoryTransport::new();
        link.open("mem", 9600).await.unwrap();
        let probe = link.clone();
        probe.close_link();
        assert!(matches!(link.read_line().await, Err(DscError::LinkClosed)));
        assert!(matches!(
            link.write_bytes(&encode("000")).await,
            Err(DscError::LinkClosed)
        ));

        probe.set_fail_open(true);
        assert!(link.open("mem", 9600).await.is_err());
        assert_eq!(probe.open_count(), 1);
    }
}
