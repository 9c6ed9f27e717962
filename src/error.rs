// MIT License - Copyright (c) 2026 Peter Wright
// Error types

use std::fmt;

/// Sub-codes carried by a `502` system error from the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemErrorCode {
    /// 001 - Receive Buffer Overrun
    ReceiveBufferOverrun,
    /// 002 - Receive Buffer Overflow
    ReceiveBufferOverflow,
    /// 003 - Transmit Buffer Overflow
    TransmitBufferOverflow,
    /// 010 - Keybus Transmit Buffer Overrun
    KeybusTransmitBufferOverrun,
    /// 011 - Keybus Transmit Time Timeout
    KeybusTransmitTimeTimeout,
    /// 012 - Keybus Transmit Mode Timeout
    KeybusTransmitModeTimeout,
    /// 013 - Keybus Transmit Keystring Timeout
    KeybusTransmitKeystringTimeout,
    /// 014 - Keybus Interface Not Functioning
    KeybusNotFunctioning,
    /// 015 - Keybus Busy (arming or disarming with a user code)
    KeybusBusy,
    /// 016 - Keybus Busy, keypad lockout
    KeybusLockout,
    /// 017 - Keybus Busy, installers mode
    KeybusInstallersMode,
    /// 018 - Keybus Busy, partition busy
    KeybusGeneralBusy,
    /// 020 - API Command Syntax Error
    CommandSyntax,
    /// 021 - API Command Partition Error
    CommandPartition,
    /// 022 - API Command Not Supported
    CommandNotSupported,
    /// 023 - API System Not Armed
    SystemNotArmed,
    /// 024 - API System Not Ready to Arm
    NotReadyToArm,
    /// 025 - API Command Invalid Length
    CommandInvalidLength,
    /// 026 - API User Code not Required
    UserCodeNotRequired,
    /// 027 - API Invalid Characters in Command
    InvalidCharacters,
}

impl SystemErrorCode {
    /// Parse the three digit sub-code of a `502` packet.
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "001" => Some(Self::ReceiveBufferOverrun),
            "002" => Some(Self::ReceiveBufferOverflow),
            "003" => Some(Self::TransmitBufferOverflow),
            "010" => Some(Self::KeybusTransmitBufferOverrun),
            "011" => Some(Self::KeybusTransmitTimeTimeout),
            "012" => Some(Self::KeybusTransmitModeTimeout),
            "013" => Some(Self::KeybusTransmitKeystringTimeout),
            "014" => Some(Self::KeybusNotFunctioning),
            "015" => Some(Self::KeybusBusy),
            "016" => Some(Self::KeybusLockout),
            "017" => Some(Self::KeybusInstallersMode),
            "018" => Some(Self::KeybusGeneralBusy),
            "020" => Some(Self::CommandSyntax),
            "021" => Some(Self::CommandPartition),
            "022" => Some(Self::CommandNotSupported),
            "023" => Some(Self::SystemNotArmed),
            "024" => Some(Self::NotReadyToArm),
            "025" => Some(Self::CommandInvalidLength),
            "026" => Some(Self::UserCodeNotRequired),
            "027" => Some(Self::InvalidCharacters),
            _ => None,
        }
    }

    /// Human-readable description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ReceiveBufferOverrun => {
                "Receive Buffer Overrun (a command is received while another is still being processed)"
            }
            Self::ReceiveBufferOverflow => "Receive Buffer Overflow",
            Self::TransmitBufferOverflow => "Transmit Buffer Overflow",
            Self::KeybusTransmitBufferOverrun => "Keybus Transmit Buffer Overrun",
            Self::KeybusTransmitTimeTimeout => "Keybus Transmit Time Timeout",
            Self::KeybusTransmitModeTimeout => "Keybus Transmit Mode Timeout",
            Self::KeybusTransmitKeystringTimeout => "Keybus Transmit Keystring Timeout",
            Self::KeybusNotFunctioning => {
                "Keybus Interface Not Functioning (the interface cannot communicate with the security system)"
            }
            Self::KeybusBusy => "Keybus Busy (Attempting to Disarm or Arm with user code)",
            Self::KeybusLockout => {
                "Keybus Busy - Lockout (The panel is currently in Keypad Lockout - too many disarm attempts)"
            }
            Self::KeybusInstallersMode => {
                "Keybus Busy - Installers Mode (Panel is in installers mode, most functions are unavailable)"
            }
            Self::KeybusGeneralBusy => "Keybus Busy - General Busy (The requested partition is busy)",
            Self::CommandSyntax => "API Command Syntax Error",
            Self::CommandPartition => {
                "API Command Partition Error (Requested Partition is out of bounds)"
            }
            Self::CommandNotSupported => "API Command Not Supported",
            Self::SystemNotArmed => "API System Not Armed (sent in response to a disarm command)",
            Self::NotReadyToArm => {
                "API System Not Ready to Arm (not secure, in delay, or already armed)"
            }
            Self::CommandInvalidLength => "API Command Invalid Length",
            Self::UserCodeNotRequired => "API User Code not Required",
            Self::InvalidCharacters => "API Invalid Characters in Command",
        }
    }

    /// The wire sub-code (e.g. "024").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReceiveBufferOverrun => "001",
            Self::ReceiveBufferOverflow => "002",
            Self::TransmitBufferOverflow => "003",
            Self::KeybusTransmitBufferOverrun => "010",
            Self::KeybusTransmitTimeTimeout => "011",
            Self::KeybusTransmitModeTimeout => "012",
            Self::KeybusTransmitKeystringTimeout => "013",
            Self::KeybusNotFunctioning => "014",
            Self::KeybusBusy => "015",
            Self::KeybusLockout => "016",
            Self::KeybusInstallersMode => "017",
            Self::KeybusGeneralBusy => "018",
            Self::CommandSyntax => "020",
            Self::CommandPartition => "021",
            Self::CommandNotSupported => "022",
            Self::SystemNotArmed => "023",
            Self::NotReadyToArm => "024",
            Self::CommandInvalidLength => "025",
            Self::UserCodeNotRequired => "026",
            Self::InvalidCharacters => "027",
        }
    }

    /// Description for a raw sub-code, falling back to "Unknown".
    pub fn describe(code: &str) -> &'static str {
        Self::from_code(code).map_or("Unknown", |c| c.description())
    }
}

impl fmt::Display for SystemErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.as_str(), self.description())
    }
}

/// Why an inbound line could not be turned into a packet.
///
/// Both kinds are local to the codec: the line is dropped and reading continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed frame: {line:?}")]
    MalformedFrame { line: String },

    #[error("checksum mismatch (expected {expected:02X}, received {received:02X})")]
    ChecksumMismatch { expected: u8, received: u8 },
}

/// All errors that can occur in the bridge library.
#[derive(Debug, thiserror::Error)]
pub enum DscError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("Link closed")]
    LinkClosed,

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Panel error {code}: {description}")]
    PanelError {
        code: String,
        description: &'static str,
    },

    #[error("No response to {command} after {attempts} attempts")]
    TimeoutExhausted { command: String, attempts: u32 },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Cancelled by shutdown")]
    Cancelled,
}

impl DscError {
    /// Build a panel error from a raw `502` sub-code.
    pub fn panel(code: &str) -> Self {
        DscError::PanelError {
            code: code.to_string(),
            description: SystemErrorCode::describe(code),
        }
    }

    /// Whether the link should be re-initialized and the operation retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DscError::Io(_)
                | DscError::Serial(_)
                | DscError::LinkClosed
                | DscError::TimeoutExhausted { .. }
                | DscError::PanelError { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DscError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_error_catalog() {
        assert_eq!(
            SystemErrorCode::from_code("024"),
            Some(SystemErrorCode::NotReadyToArm)
        );
        assert_eq!(SystemErrorCode::from_code("016"), Some(SystemErrorCode::KeybusLockout));
        assert_eq!(SystemErrorCode::from_code("099"), None);
        assert_eq!(SystemErrorCode::describe("099"), "Unknown");
        assert_eq!(SystemErrorCode::describe("020"), "API Command Syntax Error");
    }

    #[test]
    fn test_system_error_code_roundtrip() {
        for code in ["001", "002", "003", "010", "014", "018", "020", "027"] {
            let parsed = SystemErrorCode::from_code(code).unwrap();
            assert_eq!(parsed.as_str(), code);
        }
    }

    #[test]
    fn test_panel_error_display() {
        let err = DscError::panel("023");
        assert_eq!(
            err.to_string(),
            "Panel error 023: API System Not Armed (sent in response to a disarm command)"
        );
    }

    #[test]
    fn test_retryable() {
        assert!(DscError::LinkClosed.is_retryable());
        assert!(
            DscError::TimeoutExhausted {
                command: "000".into(),
                attempts: 3
            }
            .is_retryable()
        );
        assert!(!DscError::Cancelled.is_retryable());
        assert!(
            !DscError::InvalidConfig {
                reason: "x".into()
            }
            .is_retryable()
        );
    }
}
