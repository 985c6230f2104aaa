//! Message-oriented reply-socket RPC layer.
//!
//! A [`RepServer`] owns one listening socket and a table mapping one-byte
//! message types to handlers. Each accepted connection carries exactly one
//! request/reply transaction: a length-prefixed frame whose first payload
//! byte selects the handler and whose remaining bytes are the handler input.
//! Requests are served strictly one at a time; throughput scales by running
//! independent servers, each with its own socket and task.

use crate::error::ServiceError;
use crate::messages::MessageType;
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{info, warn};

/// Upper bound on a single frame, to keep a bad peer from forcing an
/// arbitrarily large allocation.
const MAX_FRAME_LEN: usize = 1 << 20;

/// How a handler aborts a request.
#[derive(Debug)]
pub enum DispatchError {
    /// Log-and-drop: no reply is sent and the peer is left to time out.
    /// Used for malformed payloads and infrastructure failures, which must
    /// never surface as well-formed domain error payloads.
    Discard,
    /// The process cannot usefully continue; the serve loop returns this
    /// error. Used when an otherwise-successful response fails to
    /// serialize, which indicates a data-model/serializer mismatch.
    Fatal(ServiceError),
}

/// A registered message handler.
///
/// The input is the request payload with the type byte already stripped;
/// the output is the raw reply payload, sent back without a type prefix.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, data: &[u8]) -> Result<Vec<u8>, DispatchError>;
}

/// Single-socket request/reply server.
pub struct RepServer {
    listener: TcpListener,
    handlers: HashMap<u8, Arc<dyn MessageHandler>>,
}

impl RepServer {
    /// Bind the reply socket to a local endpoint.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, ServiceError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            handlers: HashMap::new(),
        })
    }

    /// The bound address; useful when binding to port 0.
    pub fn local_addr(&self) -> Result<SocketAddr, ServiceError> {
        Ok(self.listener.local_addr()?)
    }

    /// Register a handler for a message type.
    ///
    /// Registering a second handler for the same type silently replaces the
    /// first. The table is only mutated here, before the loop starts.
    pub fn add_handler(&mut self, message_type: MessageType, handler: Arc<dyn MessageHandler>) {
        info!(message_type = message_type as u8, "Adding handler");
        self.handlers.insert(message_type as u8, handler);
    }

    /// Run the receive/dispatch/reply loop.
    ///
    /// Returns only on a fatal dispatch error; the caller decides whether
    /// that tears the process down.
    pub async fn serve(self) -> Result<(), ServiceError> {
        loop {
            let (mut stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(error = %err, "Error accepting connection");
                    continue;
                }
            };
            if let Err(err) = self.handle_request(&mut stream, peer).await {
                match err {
                    DispatchError::Discard => {}
                    DispatchError::Fatal(cause) => return Err(cause),
                }
            }
        }
    }

    /// Serve one request/reply transaction on an accepted connection.
    async fn handle_request(
        &self,
        stream: &mut TcpStream,
        peer: SocketAddr,
    ) -> Result<(), DispatchError> {
        let request = match read_frame(stream).await {
            Ok(data) => data,
            Err(err) => {
                warn!(peer = %peer, error = %err, "Error receiving message");
                return Err(DispatchError::Discard);
            }
        };
        if request.is_empty() {
            warn!(peer = %peer, "Unexpected empty message");
            return Err(DispatchError::Discard);
        }

        let message_type = request[0];
        let Some(handler) = self.handlers.get(&message_type) else {
            warn!(message_type, "Unknown message type");
            return Err(DispatchError::Discard);
        };

        let response = handler.handle(&request[1..]).await?;
        if let Err(err) = write_frame(stream, &response).await {
            warn!(peer = %peer, error = %err, "Error sending reply");
        }
        Ok(())
    }
}

/// Send one request and wait for the reply.
///
/// One transaction per connection, mirroring the server side. A dropped
/// request surfaces as an i/o error when the server closes the connection
/// without replying.
pub async fn request(
    addr: impl ToSocketAddrs,
    message_type: MessageType,
    payload: &[u8],
) -> Result<Vec<u8>, ServiceError> {
    let mut stream = TcpStream::connect(addr).await?;
    let mut framed = Vec::with_capacity(payload.len() + 1);
    framed.push(message_type as u8);
    framed.extend_from_slice(payload);
    write_frame(&mut stream, &framed).await?;
    read_frame(&mut stream).await
}

/// Serialize an outbound response payload.
///
/// Failure is unrecoverable for the process: it means the data model and
/// the serializer disagree, not that anything transient went wrong.
pub fn encode_response<T: serde::Serialize>(response: &T) -> Result<Vec<u8>, DispatchError> {
    serde_json::to_vec(response).map_err(|err| {
        tracing::error!(error = %err, "Error encoding response");
        DispatchError::Fatal(ServiceError::Serialization(err))
    })
}

async fn read_frame(stream: &mut TcpStream) -> Result<Vec<u8>, ServiceError> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ServiceError::Internal(format!(
            "frame of {} bytes exceeds limit",
            len
        )));
    }
    let mut data = vec![0u8; len];
    stream.read_exact(&mut data).await?;
    Ok(data)
}

async fn write_frame(stream: &mut TcpStream, data: &[u8]) -> Result<(), ServiceError> {
    let len = u32::try_from(data.len())
        .map_err(|_| ServiceError::Internal("frame too large to send".to_string()))?;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(data).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticHandler(Vec<u8>);

    #[async_trait]
    impl MessageHandler for StaticHandler {
        async fn handle(&self, _data: &[u8]) -> Result<Vec<u8>, DispatchError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let mut server = RepServer::bind("127.0.0.1:0").await.unwrap();
        server.add_handler(MessageType::RegisterUser, Arc::new(StaticHandler(b"first".to_vec())));
        server.add_handler(MessageType::RegisterUser, Arc::new(StaticHandler(b"second".to_vec())));
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.serve());

        let reply = request(addr, MessageType::RegisterUser, b"payload").await.unwrap();
        assert_eq!(reply, b"second");
    }

    #[tokio::test]
    async fn test_unknown_message_type_gets_no_reply() {
        let mut server = RepServer::bind("127.0.0.1:0").await.unwrap();
        server.add_handler(MessageType::RegisterUser, Arc::new(StaticHandler(b"ok".to_vec())));
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.serve());

        let result = request(addr, MessageType::RevokeToken, b"payload").await;
        assert!(matches!(result, Err(ServiceError::Io(_))));
    }

    struct EchoHandler;

    #[async_trait]
    impl MessageHandler for EchoHandler {
        async fn handle(&self, data: &[u8]) -> Result<Vec<u8>, DispatchError> {
            Ok(data.to_vec())
        }
    }

    #[tokio::test]
    async fn test_type_byte_is_stripped_from_handler_input() {
        let mut server = RepServer::bind("127.0.0.1:0").await.unwrap();
        server.add_handler(MessageType::ValidateToken, Arc::new(EchoHandler));
        let addr = server.local_addr().unwrap();
        tokio::spawn(server.serve());

        let reply = request(addr, MessageType::ValidateToken, b"just-the-payload").await.unwrap();
        assert_eq!(reply, b"just-the-payload");
    }
}
