//! WebSocket client for the live-update endpoint.
//!
//! [`ChannelClient`] holds the connection configuration for one
//! authenticated identity. Call [`ChannelClient::connect`] to establish
//! a live [`ChannelConnection`] over WebSocket.

use tokio_tungstenite::{connect_async, MaybeTlsStream};

/// Configuration handle for the live-update channel.
pub struct ChannelClient {
    ws_url: String,
    user_id: String,
}

/// A live WebSocket connection to the push-notification endpoint.
pub struct ChannelConnection {
    /// Authenticated user the subscription is keyed by.
    pub user_id: String,
    /// Unique client ID sent during the WebSocket handshake.
    pub client_id: String,
    /// The raw WebSocket stream for reading frames.
    pub ws_stream: tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

impl ChannelClient {
    /// Create a client for one user identity.
    ///
    /// * `ws_url`  - WebSocket base URL, e.g. `ws://host:4000`.
    /// * `user_id` - authenticated user id the channel is keyed by.
    pub fn new(ws_url: String, user_id: String) -> Self {
        Self { ws_url, user_id }
    }

    /// User id this client subscribes as.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Connect to the live-update WebSocket endpoint.
    ///
    /// Generates a unique `clientId` (UUID v4) and appends it together
    /// with the `userId` as query parameters so the server can address
    /// notifications to this session.
    pub async fn connect(&self) -> Result<ChannelConnection, ChannelClientError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let url = format!(
            "{}/ws?userId={}&clientId={}",
            self.ws_url, self.user_id, client_id
        );

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            ChannelClientError::Connection(format!(
                "Failed to connect to live-update channel at {}: {e}",
                self.ws_url
            ))
        })?;

        tracing::info!(
            user_id = %self.user_id,
            client_id = %client_id,
            "Connected to live-update channel at {}",
            self.ws_url,
        );

        Ok(ChannelConnection {
            user_id: self.user_id.clone(),
            client_id,
            ws_stream,
        })
    }
}

/// Errors that can occur when working with the WebSocket client.
#[derive(Debug, thiserror::Error)]
pub enum ChannelClientError {
    /// Failed to establish the initial WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),
}
