// MIT License - Copyright (c) 2026 Peter Wright
// Byte-level link to the interface module

pub mod command;
pub mod memory;
pub mod serial;

pub use command::{CommandKind, CommandQueue, OutboundCommand, RetryPolicy, SendOutcome};
pub use memory::MemoryTransport;
pub use serial::SerialTransport;

use crate::error::Result;

/// Line-oriented link to the panel interface.
///
/// `read_line` waits at most one read timeout. `Ok(None)` means nothing
/// arrived; any `Err` means the link is gone and must be re-opened.
#[allow(async_fn_in_trait)]
pub trait Transport: Send {
    /// Open the device, discarding anything already buffered.
    async fn open(&mut self, path: &str, baud_rate: u32) -> Result<()>;

    /// Release the device. Safe to call when already closed.
    async fn close(&mut self);

    /// Read one complete line, without its terminator.
    async fn read_line(&mut self) -> Result<Option<String>>;

    /// Write an already framed packet.
    async fn write_bytes(&mut self, data: &[u8]) -> Result<()>;

    fn is_open(&self) -> bool;
}
