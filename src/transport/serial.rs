// MIT License - Copyright (c) 2026 Peter Wright
// Serial transport over tokio-serial

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{Instant, timeout_at};
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};
use tracing::{debug, info, trace, warn};

use super::Transport;
use crate::codec::LineFramer;
use crate::constants::READ_TIMEOUT;
use crate::error::{DscError, Result};

/// RS-232 link to the IT-100, 8N1 without flow control.
pub struct SerialTransport {
    stream: Option<SerialStream>,
    framer: LineFramer,
    read_timeout: Duration,
}

impl Default for SerialTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialTransport {
    pub fn new() -> Self {
        Self {
            stream: None,
            framer: LineFramer::new(),
            read_timeout: READ_TIMEOUT,
        }
    }

    /// Override the per-read wait (default 1s).
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

impl Transport for SerialTransport {
    async fn open(&mut self, path: &str, baud_rate: u32) -> Result<()> {
        self.close().await;

        let stream = tokio_serial::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None)
            .flow_control(FlowControl::None)
            .timeout(self.read_timeout)
            .open_native_async()?;

        if let Err(e) = stream.clear(ClearBuffer::Input) {
            warn!("Could not flush serial input on {}: {}", path, e);
        }

        info!("Opened serial port {} at {} baud", path, baud_rate);
        self.stream = Some(stream);
        Ok(())
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.flush().await;
            debug!("Serial port closed");
        }
        self.framer.reset();
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.framer.next_line() {
            return Ok(Some(line));
        }

        let deadline = Instant::now() + self.read_timeout;
        let mut buf = [0u8; 256];
        loop {
            let stream = self.stream.as_mut().ok_or(DscError::LinkClosed)?;
            let n = match timeout_at(deadline, stream.read(&mut buf)).await {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => {
                    warn!("Serial port reached end of stream");
                    self.close().await;
                    return Err(DscError::LinkClosed);
                }
                Ok(Ok(n)) => n,
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => return Ok(None),
                Ok(Err(e)) => {
                    warn!("Serial read failed: {}", e);
                    self.close().await;
                    return Err(e.into());
                }
            };

            self.framer.push(&buf[..n]);
            while let Some(line) = self.framer.next_line() {
                if !line.trim().is_empty() {
                    return Ok(Some(line));
                }
            }
        }
    }

    async fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(DscError::LinkClosed)?;
        trace!("TX {:?}", String::from_utf8_lossy(data));
        let result = async {
            stream.write_all(data).await?;
            stream.flush().await
        }
        .await;
        if let Err(e) = result {
            warn!("Serial write failed: {}", e);
            self.close().await;
            return Err(e.into());
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closed_port_reports_link_closed() {
        let mut transport = SerialTransport::new();
        assert!(!transport.is_open());
        assert!(matches!(
            transport.read_line().await,
            Err(DscError::LinkClosed)
        ));
        assert!(matches!(
            transport.write_bytes(b"00090\r\n").await,
            Err(DscError::LinkClosed)
        ));
        // Closing twice is harmless.
        transport.close().await;
        transport.close().await;
    }

    #[tokio::test]
    async fn test_open_missing_device_fails() {
        let mut transport = SerialTransport::new();
        assert!(transport.open("/dev/does-not-exist-dsc", 9600).await.is_err());
        assert!(!transport.is_open());
    }
}
