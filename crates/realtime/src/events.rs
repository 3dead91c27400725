//! Live-update channel events and wire-frame parsing.

use serde::Deserialize;

/// Connection lifecycle of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

/// A push notification from the live-update channel.
#[derive(Debug, Clone)]
pub enum LiveEvent {
    /// The channel came up (initial connect or reconnect).
    Connected,
    /// The transport dropped. Emitted once per transition.
    Disconnected,
    /// `<entity>:creado` — another session created a record.
    RecordCreated {
        entity: String,
        data: serde_json::Value,
    },
    /// `<entity>:actualizado` — another session updated a record.
    RecordUpdated {
        entity: String,
        data: serde_json::Value,
    },
}

/// Wire shape of one channel frame: `{"event": "empresa:creado", "data": {...}}`.
#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Parse one text frame into a [`LiveEvent`].
///
/// Returns `Ok(None)` for event names the data layer does not handle;
/// unknown events are not an error, the channel may carry more than
/// record notifications.
pub fn parse_frame(text: &str) -> Result<Option<LiveEvent>, serde_json::Error> {
    let frame: Frame = serde_json::from_str(text)?;

    let Some((entity, action)) = frame.event.split_once(':') else {
        return Ok(None);
    };

    let event = match action {
        "creado" => LiveEvent::RecordCreated {
            entity: entity.to_string(),
            data: frame.data,
        },
        "actualizado" => LiveEvent::RecordUpdated {
            entity: entity.to_string(),
            data: frame.data,
        },
        _ => return Ok(None),
    };
    Ok(Some(event))
}
