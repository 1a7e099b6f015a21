//! Bolt handshake, message codec, and per-connection state machine (§4.7 / C8).
//!
//! The handshake byte layout (magic preamble, four version proposals, the
//! server's single negotiated reply) follows the `robsdedude` Neo4j Rust
//! driver's `io::bolt::open()`. Chunked message envelopes (structure marker
//! `0xB0..=0xBF` + signature byte + PackStream-encoded fields) follow
//! `genezhang-clickgraph`'s `bolt_protocol::connection` `parse_message` /
//! `serialize_message`, retargeted to this crate's own `Value` codec.

use std::collections::HashMap;
use std::time::Duration;

use indexmap::IndexMap;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

use crate::error::Error;
use crate::qb::value::Value;
use crate::Result;

use super::framing;
use super::message::{signatures, Message};
use super::packstream;

const MAGIC_PREAMBLE: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];
const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Bolt protocol versions this crate offers during the handshake, most
/// preferred first (§4.7). The server echoes back the highest it supports.
const VERSION_OFFER: [(u8, u8); 4] = [(5, 4), (5, 0), (4, 4), (4, 2)];

/// Per-message connection state (§4.7, §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Ready,
    Streaming,
    TxReady,
    TxStreaming,
    Failed,
}

/// A single Bolt connection over any async byte stream (plain TCP or a
/// TLS-wrapped stream — see `bolt::tls`).
pub struct Connection<S> {
    stream: S,
    pub state: ConnectionState,
    pub bolt_version: (u8, u8),
    max_message_size: usize,
    read_timeout: Duration,
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> Connection<S> {
    /// Perform the Bolt handshake over `stream` and return a `Ready`
    /// connection negotiated to the highest mutually-supported version.
    pub async fn handshake(mut stream: S, read_timeout: Duration) -> Result<Self> {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let mut preamble = Vec::with_capacity(20);
        preamble.extend_from_slice(&MAGIC_PREAMBLE);
        for (major, minor) in VERSION_OFFER {
            preamble.extend_from_slice(&[0, 0, minor, major]);
        }
        timeout(read_timeout, stream.write_all(&preamble)).await.map_err(|_| {
            Error::Timeout(read_timeout)
        })??;
        timeout(read_timeout, stream.flush()).await.map_err(|_| Error::Timeout(read_timeout))??;

        let mut reply = [0u8; 4];
        timeout(read_timeout, stream.read_exact(&mut reply))
            .await
            .map_err(|_| Error::Timeout(read_timeout))??;

        if reply == [0, 0, 0, 0] {
            return Err(Error::UnsupportedVersion);
        }
        if reply == *b"HTTP" {
            return Err(Error::HandshakeFailed(
                "peer looks like an HTTP server, not a Bolt endpoint".into(),
            ));
        }
        let minor = reply[2];
        let major = reply[3];

        Ok(Self {
            stream,
            state: ConnectionState::Ready,
            bolt_version: (major, minor),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            read_timeout,
        })
    }

    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    async fn send(&mut self, message: Message) -> Result<()> {
        let bytes = serialize_message(&message)?;
        timeout(self.read_timeout, framing::write_message(&mut self.stream, &bytes))
            .await
            .map_err(|_| Error::Timeout(self.read_timeout))??;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Message> {
        let bytes = timeout(
            self.read_timeout,
            framing::read_message(&mut self.stream, self.max_message_size),
        )
        .await
        .map_err(|_| Error::Timeout(self.read_timeout))??;
        parse_message(&bytes)
    }

    /// Send one request and read exactly one summary response
    /// (SUCCESS/FAILURE/IGNORED) — used for every message except PULL/RUN
    /// streaming, which may interleave RECORD messages first.
    async fn request(&mut self, message: Message) -> Result<Message> {
        self.send(message).await?;
        let response = self.recv().await?;
        if response.is_failure() {
            self.state = ConnectionState::Failed;
            let meta = response.metadata();
            let code = meta.get("code").map(|v| v.to_string()).unwrap_or_default();
            let msg = meta.get("message").map(|v| v.to_string()).unwrap_or_default();
            return Err(Error::ServerFailure { code, message: msg });
        }
        Ok(response)
    }

    /// `HELLO` (and, on Bolt 5.1+, a following `LOGON`): authenticate and
    /// move `Failed`/pre-handshake connections into `Ready`.
    pub async fn hello(&mut self, user_agent: &str, auth: HashMap<String, Value>) -> Result<IndexMap<String, Value>> {
        super::telemetry::connection_hello(user_agent, &auth);
        let response = self
            .request(Message::hello(user_agent, auth))
            .await
            .map_err(|e| match e {
                Error::ServerFailure { code, message } => Error::AuthenticationFailed(format!("{code}: {message}")),
                other => other,
            })?;
        self.state = ConnectionState::Ready;
        Ok(response.metadata())
    }

    /// `GOODBYE`: no response expected, best-effort.
    pub async fn goodbye(&mut self) -> Result<()> {
        self.send(Message::goodbye()).await
    }

    /// `RESET`: unconditionally returns the connection to `Ready`, draining
    /// any pending result stream server-side (§4.7 recovery protocol).
    pub async fn reset(&mut self) -> Result<()> {
        self.send(Message::reset()).await?;
        let response = self.recv().await?;
        if !response.is_success() {
            return Err(Error::ProtocolViolation("RESET did not receive SUCCESS".into()));
        }
        self.state = ConnectionState::Ready;
        Ok(())
    }

    fn assert_ready_for_run(&self) -> Result<()> {
        match self.state {
            ConnectionState::Ready | ConnectionState::TxReady => Ok(()),
            other => Err(Error::ProtocolViolation(format!("cannot RUN while connection is {other:?}"))),
        }
    }

    /// `RUN`: submit a query; moves `Ready -> Streaming` or
    /// `TxReady -> TxStreaming`.
    pub async fn run(
        &mut self,
        query: &str,
        parameters: IndexMap<String, Value>,
        extra: IndexMap<String, Value>,
    ) -> Result<IndexMap<String, Value>> {
        self.assert_ready_for_run()?;
        let response = self.request(Message::run(query, parameters, extra)).await?;
        self.state = match self.state {
            ConnectionState::TxReady => ConnectionState::TxStreaming,
            _ => ConnectionState::Streaming,
        };
        Ok(response.metadata())
    }

    /// `PULL`: stream records until the server sends SUCCESS (or FAILURE).
    /// Returns the decoded records plus the terminal SUCCESS metadata.
    pub async fn pull(&mut self, n: i64, qid: Option<i64>) -> Result<(Vec<Vec<Value>>, IndexMap<String, Value>)> {
        self.send(Message::pull(n, qid)).await?;
        let mut records = Vec::new();
        loop {
            let message = self.recv().await?;
            if message.is_record() {
                records.push(message.record_values());
                continue;
            }
            if message.is_failure() {
                self.state = ConnectionState::Failed;
                let meta = message.metadata();
                let code = meta.get("code").map(|v| v.to_string()).unwrap_or_default();
                let msg = meta.get("message").map(|v| v.to_string()).unwrap_or_default();
                return Err(Error::ServerFailure { code, message: msg });
            }
            if message.is_success() {
                let meta = message.metadata();
                let has_more = matches!(meta.get("has_more"), Some(Value::Bool(true)));
                if !has_more {
                    self.state = match self.state {
                        ConnectionState::TxStreaming => ConnectionState::TxReady,
                        _ => ConnectionState::Ready,
                    };
                }
                return Ok((records, meta));
            }
            return Err(Error::ProtocolViolation(format!(
                "unexpected message signature 0x{:02X} during PULL",
                message.signature
            )));
        }
    }

    /// `BEGIN`: `Ready -> TxReady`.
    pub async fn begin(&mut self, extra: IndexMap<String, Value>) -> Result<()> {
        if self.state != ConnectionState::Ready {
            return Err(Error::ProtocolViolation(format!("cannot BEGIN while connection is {:?}", self.state)));
        }
        self.request(Message::begin(extra)).await?;
        self.state = ConnectionState::TxReady;
        Ok(())
    }

    /// `COMMIT`: `TxReady -> Ready`.
    pub async fn commit(&mut self) -> Result<()> {
        if self.state != ConnectionState::TxReady {
            return Err(Error::TransactionError(format!("cannot COMMIT while connection is {:?}", self.state)));
        }
        self.request(Message::commit()).await?;
        self.state = ConnectionState::Ready;
        Ok(())
    }

    /// `ROLLBACK`: `TxReady -> Ready`.
    pub async fn rollback(&mut self) -> Result<()> {
        if self.state != ConnectionState::TxReady {
            return Err(Error::TransactionError(format!("cannot ROLLBACK while connection is {:?}", self.state)));
        }
        self.request(Message::rollback()).await?;
        self.state = ConnectionState::Ready;
        Ok(())
    }

    pub fn is_usable(&self) -> bool {
        matches!(self.state, ConnectionState::Ready)
    }
}

impl Connection<super::stream::Stream> {
    /// Dial `endpoint`, negotiate the Bolt version, and authenticate —
    /// everything the pool needs to hand back a `Ready` connection in one
    /// call (§4.7 Startup, §4.9 Pool connection creation).
    pub async fn open(
        endpoint: &crate::url::Endpoint,
        user_agent: &str,
        read_timeout: Duration,
    ) -> Result<Self> {
        let stream = super::stream::Stream::connect(endpoint).await?;
        let mut conn = Self::handshake(stream, read_timeout).await?;

        let mut auth = HashMap::new();
        auth.insert("scheme".to_string(), Value::String("basic".to_string()));
        if let Some(user) = &endpoint.username {
            auth.insert("principal".to_string(), Value::String(user.clone()));
        }
        if let Some(password) = &endpoint.password {
            auth.insert("credentials".to_string(), Value::String(password.clone()));
        }
        conn.hello(user_agent, auth).await?;
        Ok(conn)
    }
}

fn serialize_message(message: &Message) -> Result<Vec<u8>> {
    if message.fields.len() > 15 {
        return Err(Error::ProtocolViolation("a Bolt message may carry at most 15 fields".into()));
    }
    let mut bytes = Vec::new();
    bytes.push(0xB0 | message.fields.len() as u8);
    bytes.push(message.signature);
    for field in &message.fields {
        packstream::encode(field, &mut bytes);
    }
    Ok(bytes)
}

fn parse_message(bytes: &[u8]) -> Result<Message> {
    let marker = *bytes.first().ok_or_else(|| Error::ProtocolViolation("empty message".into()))?;
    if (marker & 0xF0) != 0xB0 {
        return Err(Error::ProtocolViolation(format!(
            "expected a structure marker (0xB0-0xBF), got 0x{marker:02X}"
        )));
    }
    let field_count = (marker & 0x0F) as usize;
    let signature = *bytes.get(1).ok_or_else(|| Error::ProtocolViolation("truncated message".into()))?;

    let mut offset = 2;
    let mut fields = Vec::with_capacity(field_count);
    for _ in 0..field_count {
        let (value, consumed) = packstream::decode(&bytes[offset..])?;
        fields.push(value);
        offset += consumed;
    }
    Ok(Message::new(signature, fields))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handshake_negotiates_highest_common_version() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let negotiate = tokio::spawn(async move {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};
            let mut preamble = [0u8; 20];
            server.read_exact(&mut preamble).await.unwrap();
            assert_eq!(&preamble[..4], &MAGIC_PREAMBLE);
            server.write_all(&[0, 0, 4, 4]).await.unwrap();
            server.flush().await.unwrap();
            server
        });
        let conn = Connection::handshake(&mut client, Duration::from_secs(1)).await.unwrap();
        assert_eq!(conn.bolt_version, (4, 4));
        assert_eq!(conn.state, ConnectionState::Ready);
        negotiate.await.unwrap();
    }

    #[tokio::test]
    async fn handshake_rejects_unsupported_version() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let task = tokio::spawn(async move {
            use tokio::io::{AsyncReadExt, AsyncWriteExt};
            let mut preamble = [0u8; 20];
            server.read_exact(&mut preamble).await.unwrap();
            server.write_all(&[0, 0, 0, 0]).await.unwrap();
            server.flush().await.unwrap();
        });
        let err = Connection::handshake(&mut client, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion));
        task.await.unwrap();
    }

    #[test]
    fn serialize_then_parse_roundtrips_a_run_message() {
        let mut params = IndexMap::new();
        params.insert("name".to_string(), Value::String("Ada".into()));
        let message = Message::run("RETURN $name", params, IndexMap::new());
        let bytes = serialize_message(&message).unwrap();
        let parsed = parse_message(&bytes).unwrap();
        assert_eq!(parsed.signature, signatures::RUN);
        assert_eq!(parsed.fields.len(), 3);
    }
}
