//! WebSocket bridge for the live-update channel.
//!
//! Connects to the push-notification endpoint keyed by the authenticated
//! user id, parses named record events (`empresa:creado`,
//! `conductor:actualizado`, ...), and fans them out on a broadcast
//! channel. Reconnection with exponential backoff is owned by the bridge
//! task; consumers only see connectivity as a boolean plus
//! connected/disconnected events.

pub mod backoff;
pub mod bridge;
pub mod client;
pub mod events;

pub use bridge::LiveUpdateBridge;
pub use events::{parse_frame, ChannelState, LiveEvent};
