//! Connection orchestration for the live-update channel.
//!
//! [`LiveUpdateBridge`] owns the connect → read → reconnect loop for one
//! user identity and fans parsed [`LiveEvent`]s out on a
//! [`tokio::sync::broadcast`] channel. The store drives it through
//! `connect`/`disconnect`; re-connecting with a different user id
//! replaces the subscription, so handlers never accumulate across
//! identity changes.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{broadcast, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::backoff::Backoff;
use crate::client::{ChannelClient, ChannelConnection};
use crate::events::{parse_frame, ChannelState, LiveEvent};

/// Broadcast channel capacity for live events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

const STATE_DISCONNECTED: u8 = 0;
const STATE_CONNECTING: u8 = 1;
const STATE_CONNECTED: u8 = 2;

/// Internal bookkeeping for the current subscription.
struct Session {
    user_id: String,
    /// Per-session cancellation token; cancelled on disconnect or
    /// identity change.
    cancel: CancellationToken,
    #[allow(dead_code)]
    task_handle: tokio::task::JoinHandle<()>,
}

/// Manages the persistent WebSocket subscription for one user identity.
///
/// Created once per store via [`LiveUpdateBridge::new`]; the returned
/// `Arc` can be cheaply cloned.
pub struct LiveUpdateBridge {
    ws_url: String,
    event_tx: broadcast::Sender<LiveEvent>,
    state: AtomicU8,
    session: Mutex<Option<Session>>,
}

impl LiveUpdateBridge {
    /// Create a bridge targeting the given WebSocket base URL. No
    /// connection is made until [`connect`](Self::connect).
    pub fn new(ws_url: String) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            ws_url,
            event_tx,
            state: AtomicU8::new(STATE_DISCONNECTED),
            session: Mutex::new(None),
        })
    }

    /// Subscribe to live events.
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.event_tx.subscribe()
    }

    /// Current connection state.
    pub fn state(&self) -> ChannelState {
        match self.state.load(Ordering::Relaxed) {
            STATE_CONNECTED => ChannelState::Connected,
            STATE_CONNECTING => ChannelState::Connecting,
            _ => ChannelState::Disconnected,
        }
    }

    /// Connectivity as the boolean the rendering layer displays.
    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// User id of the active subscription, if any.
    pub async fn subscribed_user(&self) -> Option<String> {
        self.session.lock().await.as_ref().map(|s| s.user_id.clone())
    }

    /// Start (or replace) the subscription for a user identity.
    ///
    /// A no-op when already subscribed for the same user. A different
    /// user id cancels the previous session before starting the new one.
    pub async fn connect(self: &Arc<Self>, user_id: &str) {
        let mut session = self.session.lock().await;

        if let Some(existing) = session.as_ref() {
            if existing.user_id == user_id {
                return;
            }
            tracing::info!(
                old_user = %existing.user_id,
                new_user = %user_id,
                "Replacing live-update subscription",
            );
        }
        if let Some(old) = session.take() {
            old.cancel.cancel();
        }

        let cancel = CancellationToken::new();
        let client = ChannelClient::new(self.ws_url.clone(), user_id.to_string());
        let task_handle = tokio::spawn(Arc::clone(self).run(client, cancel.clone()));

        *session = Some(Session {
            user_id: user_id.to_string(),
            cancel,
            task_handle,
        });
    }

    /// Tear down the subscription and stop reconnecting.
    pub async fn disconnect(&self) {
        if let Some(old) = self.session.lock().await.take() {
            tracing::info!(user_id = %old.user_id, "Disconnecting live-update channel");
            old.cancel.cancel();
        }
        self.state.store(STATE_DISCONNECTED, Ordering::Relaxed);
    }

    /// Connection task: connect (retrying with backoff), read frames,
    /// repeat on drop, until cancelled.
    async fn run(self: Arc<Self>, client: ChannelClient, cancel: CancellationToken) {
        let mut backoff = Backoff::new();

        loop {
            self.state.store(STATE_CONNECTING, Ordering::Relaxed);
            let Some(mut connection) = self.acquire(&client, &mut backoff, &cancel).await else {
                self.state.store(STATE_DISCONNECTED, Ordering::Relaxed);
                return;
            };
            backoff.reset();

            self.state.store(STATE_CONNECTED, Ordering::Relaxed);
            let _ = self.event_tx.send(LiveEvent::Connected);

            self.read_frames(&mut connection.ws_stream, &cancel).await;

            self.state.store(STATE_DISCONNECTED, Ordering::Relaxed);
            if cancel.is_cancelled() {
                return;
            }

            // One notification per connected → disconnected transition.
            let _ = self.event_tx.send(LiveEvent::Disconnected);
        }
    }

    /// Attempt connects, pacing retries by the backoff generator, until
    /// one succeeds or the session is cancelled.
    async fn acquire(
        &self,
        client: &ChannelClient,
        backoff: &mut Backoff,
        cancel: &CancellationToken,
    ) -> Option<ChannelConnection> {
        loop {
            let attempt = tokio::select! {
                _ = cancel.cancelled() => return None,
                result = client.connect() => result,
            };

            let error = match attempt {
                Ok(connection) => return Some(connection),
                Err(e) => e,
            };

            let delay = backoff.next_delay();
            tracing::warn!(
                user_id = %client.user_id(),
                error = %error,
                retry_in_ms = delay.as_millis() as u64,
                "Channel connect failed",
            );
            tokio::select! {
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Consume frames until the socket closes, errors, or is cancelled.
    async fn read_frames(
        &self,
        ws_stream: &mut tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        cancel: &CancellationToken,
    ) {
        loop {
            let msg_result = tokio::select! {
                _ = cancel.cancelled() => return,
                msg = ws_stream.next() => match msg {
                    Some(m) => m,
                    None => return,
                },
            };

            match msg_result {
                Ok(Message::Text(text)) => match parse_frame(&text) {
                    Ok(Some(event)) => {
                        let _ = self.event_tx.send(event);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Unparseable channel frame");
                    }
                },
                Ok(Message::Binary(_)) => {
                    tracing::trace!("Ignoring binary channel frame");
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Handled automatically by tungstenite.
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!(?frame, "Live-update channel closed");
                    return;
                }
                Ok(Message::Frame(_)) => {}
                Err(e) => {
                    tracing::error!(error = %e, "Channel receive error");
                    return;
                }
            }
        }
    }
}
