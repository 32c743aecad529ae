//! # Exchange engine
//!
//! [`TcpTransport`] owns one byte stream and runs strictly one Modbus
//! transaction at a time on it:
//!
//! 1. allocate the next transaction id (starts at 1, wraps at 65536)
//! 2. encode the request and write the whole frame
//! 3. read until the frame announced by the MBAP length field is complete
//! 4. check the transaction id, decode and match the response to the request
//!
//! ## Failure policy
//!
//! Transport errors, protocol violations and timeouts close the stream. The
//! engine never retries and never reconnects; see
//! [`ModbusError::needs_reconnect`]. Device exceptions and rejected arguments
//! leave the connection usable.
//!
//! If a request future is dropped after its frame went out, the reply may
//! still be in flight. The next request notices the unfinished exchange,
//! closes the stream and fails instead of reading a stale frame.
//!
//! ## Concurrency
//!
//! Requests take `&mut self`, so one transport serves one caller. Tasks that
//! share a connection must serialize access themselves, for example with a
//! `tokio::sync::Mutex` around the client. Pipelining several transactions on
//! one connection would need a map from transaction id to pending reply and
//! is not supported.

use std::fmt::Write as _;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::codec::{FrameAssembler, ModbusCodec};
use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{MbapHeader, ModbusRequest, ModbusResponse, TransactionId};

/// A channel able to carry Modbus requests
pub trait ModbusTransport: Send {
    /// Send one request and wait for its response
    fn request(
        &mut self,
        request: &ModbusRequest,
    ) -> impl Future<Output = ModbusResult<ModbusResponse>> + Send;

    fn is_connected(&self) -> bool;

    /// Close the underlying channel
    fn close(&mut self) -> impl Future<Output = ModbusResult<()>> + Send;

    fn get_stats(&self) -> TransportStats;
}

/// Counters kept by a transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Frames fully written
    pub requests_sent: u64,
    /// Successful responses
    pub responses_received: u64,
    /// Failed requests of any kind
    pub errors: u64,
    pub timeouts: u64,
    /// Exception responses from the device
    pub exceptions: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Progress of the current exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    RequestSent,
    AwaitingResponse,
    Decoded,
    Failed,
}

impl ExchangeState {
    /// A frame went out and its reply has not been consumed.
    ///
    /// Seen between requests only when a request future was dropped; the
    /// transport then reports itself disconnected.
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::RequestSent | Self::AwaitingResponse)
    }
}

/// Modbus TCP transport over any async byte stream
pub struct TcpTransport<S = TcpStream> {
    stream: Option<S>,
    address: Option<SocketAddr>,
    timeout: Duration,
    next_transaction_id: TransactionId,
    state: ExchangeState,
    stats: TransportStats,
    packet_logging: bool,
}

impl TcpTransport<TcpStream> {
    /// Connect to a Modbus TCP server
    pub async fn new(address: SocketAddr, timeout_duration: Duration) -> ModbusResult<Self> {
        debug!("Connecting to Modbus TCP server {}", address);

        let stream = match timeout(timeout_duration, TcpStream::connect(address)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ModbusError::connection(format!(
                    "Failed to connect to {}: {}",
                    address, e
                )))
            }
            Err(_) => {
                return Err(ModbusError::timeout(
                    format!("connect to {}", address),
                    timeout_duration.as_millis() as u64,
                ))
            }
        };
        stream.set_nodelay(true)?;

        info!("Connected to Modbus TCP server {}", address);
        let mut transport = Self::from_stream(stream, timeout_duration);
        transport.address = Some(address);
        Ok(transport)
    }
}

impl<S> TcpTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an already connected stream
    pub fn from_stream(stream: S, timeout: Duration) -> Self {
        Self {
            stream: Some(stream),
            address: None,
            timeout,
            next_transaction_id: 1,
            state: ExchangeState::Idle,
            stats: TransportStats::default(),
            packet_logging: false,
        }
    }

    /// Builder-style switch for hex packet logging
    pub fn with_packet_logging(mut self, enabled: bool) -> Self {
        self.packet_logging = enabled;
        self
    }

    pub fn set_packet_logging(&mut self, enabled: bool) {
        self.packet_logging = enabled;
    }

    /// Peer address when created through [`TcpTransport::new`]
    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Transaction id the next request will carry
    pub fn next_transaction_id(&self) -> TransactionId {
        self.next_transaction_id
    }

    fn allocate_transaction_id(&mut self) -> TransactionId {
        let id = self.next_transaction_id;
        self.next_transaction_id = self.next_transaction_id.wrapping_add(1);
        id
    }

    fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }

    async fn shutdown_stream(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                debug!("Error during stream shutdown: {}", e);
            }
        }
    }

    /// Read exactly one frame into `assembler`
    async fn read_frame(stream: &mut S, assembler: &mut FrameAssembler) -> ModbusResult<()> {
        loop {
            let need = assembler.remaining()?;
            if need == 0 {
                return Ok(());
            }
            let n = stream.read(assembler.unfilled_mut(need)).await?;
            if n == 0 {
                return Err(ModbusError::connection(format!(
                    "Connection closed by peer after {} bytes of response",
                    assembler.len()
                )));
            }
            assembler.advance(n);
        }
    }

    async fn exchange(&mut self, request: &ModbusRequest) -> ModbusResult<ModbusResponse> {
        if self.stream.is_none() {
            return Err(ModbusError::connection("Not connected"));
        }
        let timeout_ms = self.timeout_ms();
        let transaction_id = self.allocate_transaction_id();
        let frame = ModbusCodec::encode_request(transaction_id, request)?;

        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ModbusError::connection("Not connected"))?;

        if self.packet_logging {
            log_packet("send", request.slave_id, &frame);
        }

        self.state = ExchangeState::RequestSent;
        let write = async {
            stream.write_all(&frame).await?;
            stream.flush().await
        };
        match timeout(self.timeout, write).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(ModbusError::timeout("send request", timeout_ms)),
        }
        self.stats.requests_sent += 1;
        self.stats.bytes_sent += frame.len() as u64;
        debug!(
            "Sent {} request tid={} ({} bytes)",
            request.function,
            transaction_id,
            frame.len()
        );

        self.state = ExchangeState::AwaitingResponse;
        let mut assembler = FrameAssembler::new();
        let outcome = timeout(self.timeout, Self::read_frame(stream, &mut assembler)).await;
        self.stats.bytes_received += assembler.len() as u64;
        match outcome {
            Ok(result) => result?,
            Err(_) => return Err(ModbusError::timeout("read response", timeout_ms)),
        }

        let raw = assembler.as_slice();
        if self.packet_logging {
            log_packet("recv", request.slave_id, raw);
        }

        let header = MbapHeader::parse(raw)?;
        if header.transaction_id != transaction_id {
            return Err(ModbusError::TransactionMismatch {
                expected: transaction_id,
                actual: header.transaction_id,
            });
        }
        if header.unit_id != request.slave_id {
            warn!(
                "Response unit id {} differs from request unit id {}",
                header.unit_id, request.slave_id
            );
        }

        let response = ModbusCodec::decode_response(raw, request.function)?;
        response.validate_against(request)?;
        Ok(response)
    }

    fn record_failure(&mut self, error: &ModbusError) {
        self.stats.errors += 1;
        if error.is_timeout() {
            self.stats.timeouts += 1;
        }
        if error.is_exception() {
            self.stats.exceptions += 1;
        }
    }
}

impl<S> ModbusTransport for TcpTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn request(&mut self, request: &ModbusRequest) -> ModbusResult<ModbusResponse> {
        request.validate()?;

        if self.state.is_in_flight() {
            warn!(
                "Previous exchange abandoned in state {:?}, closing connection",
                self.state
            );
            self.state = ExchangeState::Failed;
            self.shutdown_stream().await;
            let error = ModbusError::connection(
                "Previous request was cancelled mid-exchange; connection closed",
            );
            self.record_failure(&error);
            return Err(error);
        }

        match self.exchange(request).await {
            Ok(response) => {
                self.state = ExchangeState::Decoded;
                self.stats.responses_received += 1;
                Ok(response)
            }
            Err(error) => {
                self.record_failure(&error);
                if error.needs_reconnect() {
                    self.state = ExchangeState::Failed;
                    if self.stream.is_some() {
                        warn!("Closing Modbus connection after error: {}", error);
                    }
                    self.shutdown_stream().await;
                } else {
                    self.state = ExchangeState::Decoded;
                    debug!("Request failed, connection kept: {}", error);
                }
                Err(error)
            }
        }
    }

    /// A stream left mid-exchange by a dropped request counts as
    /// disconnected; it is shut down on the next `request` or `close`.
    fn is_connected(&self) -> bool {
        self.stream.is_some() && !self.state.is_in_flight()
    }

    async fn close(&mut self) -> ModbusResult<()> {
        if self.stream.is_some() {
            info!("Closing Modbus TCP connection");
        }
        self.shutdown_stream().await;
        self.state = ExchangeState::Idle;
        Ok(())
    }

    fn get_stats(&self) -> TransportStats {
        self.stats
    }
}

/// Hex dump of a frame at info level
fn log_packet(direction: &str, unit_id: u8, frame: &[u8]) {
    info!(
        "[MODBUS-TCP] {} unit:{} {}",
        direction,
        unit_id,
        format_hex(frame)
    );
}

/// Space-separated uppercase hex
pub fn format_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02X}", byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    const TIMEOUT: Duration = Duration::from_millis(500);

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0x00, 0x01, 0xAB]), "00 01 AB");
        assert_eq!(format_hex(&[]), "");
    }

    #[test]
    fn test_exchange_state_in_flight() {
        assert!(!ExchangeState::Idle.is_in_flight());
        assert!(ExchangeState::RequestSent.is_in_flight());
        assert!(ExchangeState::AwaitingResponse.is_in_flight());
        assert!(!ExchangeState::Decoded.is_in_flight());
        assert!(!ExchangeState::Failed.is_in_flight());
    }

    #[tokio::test]
    async fn test_transaction_id_wraps() {
        let mock = Builder::new().build();
        let mut transport = TcpTransport::from_stream(mock, TIMEOUT);
        assert_eq!(transport.allocate_transaction_id(), 1);

        transport.next_transaction_id = u16::MAX;
        assert_eq!(transport.allocate_transaction_id(), u16::MAX);
        assert_eq!(transport.allocate_transaction_id(), 0);
        assert_eq!(transport.allocate_transaction_id(), 1);
    }

    #[tokio::test]
    async fn test_read_success_and_stats() {
        let mock = Builder::new()
            .write(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x03, 0x00, 0x00, 0x00, 0x02])
            .read(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x01, 0x03, 0x04, 0x00, 0x0A, 0x00, 0x0B])
            .build();
        let mut transport = TcpTransport::from_stream(mock, TIMEOUT);

        let response = transport
            .request(&ModbusRequest::new_read(1, 0, 2))
            .await
            .unwrap();
        assert_eq!(response.registers().unwrap(), &[10, 11]);
        assert_eq!(transport.state(), ExchangeState::Decoded);
        assert_eq!(transport.next_transaction_id(), 2);

        let stats = transport.get_stats();
        assert_eq!(stats.requests_sent, 1);
        assert_eq!(stats.responses_received, 1);
        assert_eq!(stats.bytes_sent, 12);
        assert_eq!(stats.bytes_received, 13);
        assert_eq!(stats.errors, 0);
    }

    #[tokio::test]
    async fn test_validation_error_keeps_connection() {
        let mock = Builder::new().build();
        let mut transport = TcpTransport::from_stream(mock, TIMEOUT);

        let err = transport
            .request(&ModbusRequest::new_read(1, 0, 126))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(transport.is_connected());
        assert_eq!(transport.next_transaction_id(), 1);
        assert_eq!(transport.get_stats().requests_sent, 0);
    }

    #[tokio::test]
    async fn test_abandoned_exchange_closes_connection() {
        let mock = Builder::new().build();
        let mut transport = TcpTransport::from_stream(mock, TIMEOUT);
        transport.state = ExchangeState::AwaitingResponse;

        let err = transport
            .request(&ModbusRequest::new_read(1, 0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ModbusError::Connection { .. }));
        assert!(!transport.is_connected());
        assert_eq!(transport.state(), ExchangeState::Failed);
    }

    #[tokio::test]
    async fn test_in_flight_exchange_reports_disconnected() {
        let mock = Builder::new().build();
        let mut transport = TcpTransport::from_stream(mock, TIMEOUT);
        assert!(transport.is_connected());

        transport.state = ExchangeState::RequestSent;
        assert!(!transport.is_connected());
        transport.close().await.unwrap();
        assert_eq!(transport.state(), ExchangeState::Idle);
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_request_after_close() {
        let mock = Builder::new().build();
        let mut transport = TcpTransport::from_stream(mock, TIMEOUT);
        transport.close().await.unwrap();
        assert!(!transport.is_connected());

        let err = transport
            .request(&ModbusRequest::new_write_single(1, 0, 1))
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
