use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Send/receive view over a socket so connections can run against fakes in tests
#[async_trait]
pub trait SocketWrapper: Send {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError>;

    /// Next text frame from the client, `None` once the connection is closed
    async fn receive_message(&mut self) -> Result<Option<String>, SocketError>;

    async fn close(&mut self) -> Result<(), SocketError>;
}

/// Who is on the other end of a connection
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub connection_id: Uuid,
    /// Queue address of the authenticated user (their user id)
    pub user: String,
    pub username: String,
}

/// Handles a raw inbound text frame
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, session: &SessionInfo, message: String);
}

#[derive(Debug)]
pub enum SocketError {
    SendFailed(String),
    ReceiveFailed(String),
}

#[async_trait]
impl SocketWrapper for WebSocket {
    async fn send_message(&mut self, message: String) -> Result<(), SocketError> {
        self.send(Message::Text(message))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }

    async fn receive_message(&mut self) -> Result<Option<String>, SocketError> {
        loop {
            match self.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // axum answers pings itself; binary frames are not part of the protocol
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(SocketError::ReceiveFailed(e.to_string())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::SendFailed(e.to_string()))
    }
}

/// A registered socket: pumps frames queued by the connection manager out to
/// the client and hands inbound frames to the message handler
pub struct Connection {
    pub session: SessionInfo,
    socket: Box<dyn SocketWrapper>,
    outbound_receiver: mpsc::UnboundedReceiver<String>,
    message_handler: Arc<dyn MessageHandler>,
}

impl Connection {
    pub fn new(
        session: SessionInfo,
        socket: Box<dyn SocketWrapper>,
        outbound_receiver: mpsc::UnboundedReceiver<String>,
        message_handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            session,
            socket,
            outbound_receiver,
            message_handler,
        }
    }

    /// Runs until either side hangs up
    pub async fn run(mut self) -> Result<(), SocketError> {
        loop {
            tokio::select! {
                outbound = self.outbound_receiver.recv() => {
                    match outbound {
                        Some(message) => self.socket.send_message(message).await?,
                        None => break,
                    }
                }

                inbound = self.socket.receive_message() => {
                    match inbound {
                        Ok(Some(message)) => {
                            self.message_handler
                                .handle_message(&self.session, message)
                                .await;
                        }
                        Ok(None) => break,
                        Err(e) => return Err(e),
                    }
                }
            }
        }

        let _ = self.socket.close().await;
        Ok(())
    }
}
