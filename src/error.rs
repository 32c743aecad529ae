//! Error types for Modbus TCP communication
//!
//! Every operation in this crate returns [`ModbusResult`]. The variants of
//! [`ModbusError`] fall into six groups:
//!
//! | Group | Variants | Connection afterwards |
//! |-------|----------|-----------------------|
//! | Transport | `Io`, `Connection` | closed |
//! | Protocol violation | `Frame`, `Protocol`, `TransactionMismatch`, `InvalidFunction` | closed |
//! | Device exception | `Exception` | usable |
//! | Validation | `InvalidData` | usable, nothing was sent |
//! | Timeout | `Timeout` | closed |
//! | Configuration | `Configuration` | never opened |
//!
//! The client performs no retries. Callers that want a retry or reconnect
//! policy should branch on [`ModbusError::needs_reconnect`].

use thiserror::Error;

use crate::protocol::ModbusException;

/// Result alias used throughout the crate
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Modbus client errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModbusError {
    /// Read/write/close failure on the byte channel
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Channel could not be opened, was closed by the peer, or is not open
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// No complete response within the deadline
    #[error("Timeout during {operation} after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Malformed frame: too short, inconsistent length or byte count
    #[error("Frame error: {message}")]
    Frame { message: String },

    /// Well-formed frame that does not answer the request
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Response carries a transaction id other than the one issued
    #[error("Transaction ID mismatch: expected {expected}, got {actual}")]
    TransactionMismatch { expected: u16, actual: u16 },

    /// Function code this client does not speak
    #[error("Invalid function code: 0x{code:02X}")]
    InvalidFunction { code: u8 },

    /// Device answered with an exception response
    #[error("Modbus exception for function 0x{function:02X}: {code}")]
    Exception { function: u8, code: ModbusException },

    /// Caller-supplied argument rejected before anything was sent
    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    /// Unusable connection target or client settings
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ModbusError {
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn frame(message: impl Into<String>) -> Self {
        Self::Frame {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn invalid_function(code: u8) -> Self {
        Self::InvalidFunction { code }
    }

    pub fn exception(function: u8, code: u8) -> Self {
        Self::Exception {
            function: function & 0x7F,
            code: ModbusException::from_u8(code),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Failure at the channel boundary
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Connection { .. })
    }

    /// Malformed or unsynchronized response stream
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::Frame { .. }
                | Self::Protocol { .. }
                | Self::TransactionMismatch { .. }
                | Self::InvalidFunction { .. }
        )
    }

    /// Device-level exception response
    pub fn is_exception(&self) -> bool {
        matches!(self, Self::Exception { .. })
    }

    /// Argument rejected before transmission
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidData { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Exception code, if the device answered with one
    pub fn exception_code(&self) -> Option<ModbusException> {
        match self {
            Self::Exception { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when the connection that produced this error can no longer be used.
    ///
    /// The transport has already closed its channel in this case; the caller
    /// has to open a new one.
    pub fn needs_reconnect(&self) -> bool {
        self.is_transport() || self.is_protocol_violation() || self.is_timeout()
    }
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::NotConnected => ModbusError::connection(err.to_string()),
            _ => ModbusError::io(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ModbusError::io("boom").is_transport());
        assert!(ModbusError::connection("reset").is_transport());
        assert!(ModbusError::frame("short").is_protocol_violation());
        assert!(ModbusError::TransactionMismatch {
            expected: 1,
            actual: 2
        }
        .is_protocol_violation());
        assert!(ModbusError::exception(0x83, 0x02).is_exception());
        assert!(ModbusError::invalid_data("quantity").is_validation());
        assert!(ModbusError::timeout("read response", 100).is_timeout());
    }

    #[test]
    fn test_needs_reconnect() {
        assert!(ModbusError::io("boom").needs_reconnect());
        assert!(ModbusError::protocol("fc mismatch").needs_reconnect());
        assert!(ModbusError::timeout("send request", 5000).needs_reconnect());

        assert!(!ModbusError::exception(0x03, 0x02).needs_reconnect());
        assert!(!ModbusError::invalid_data("quantity").needs_reconnect());
        assert!(!ModbusError::configuration("bad address").needs_reconnect());
    }

    #[test]
    fn test_exception_strips_high_bit() {
        let err = ModbusError::exception(0x90, 0x03);
        assert_eq!(
            err,
            ModbusError::Exception {
                function: 0x10,
                code: ModbusException::IllegalDataValue,
            }
        );
        assert_eq!(
            err.exception_code(),
            Some(ModbusException::IllegalDataValue)
        );
    }

    #[test]
    fn test_io_error_mapping() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(ModbusError::from(eof), ModbusError::Connection { .. }));

        let other = std::io::Error::new(std::io::ErrorKind::Other, "other");
        assert!(matches!(ModbusError::from(other), ModbusError::Io { .. }));
    }

    #[test]
    fn test_display() {
        let err = ModbusError::timeout("read response", 250);
        assert_eq!(err.to_string(), "Timeout during read response after 250ms");

        let err = ModbusError::TransactionMismatch {
            expected: 7,
            actual: 9,
        };
        assert_eq!(err.to_string(), "Transaction ID mismatch: expected 7, got 9");
    }
}
