//! Client configuration loaded from environment variables.

use std::time::Duration;

/// Which list-resolution strategy a collection store runs with.
///
/// `Server` trusts the remote API's paged/sorted/filtered queries;
/// `Client` fetches the whole collection once and runs the local
/// pipeline. Both share the same store surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationMode {
    Server,
    Client,
}

/// Configuration for the remote API and live-update channel.
///
/// All fields have defaults suitable for local development. In
/// production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base HTTP URL of the remote API (default: `http://localhost:4000`).
    pub api_base_url: String,
    /// Base WebSocket URL of the live-update channel
    /// (default: `ws://localhost:4000`).
    pub ws_base_url: String,
    /// Records per page (default: `10`).
    pub page_size: u32,
    /// Per-request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Bound on the blocking first-load window in seconds (default: `5`).
    /// After this the store stops reporting `initializing` even if no
    /// result has arrived.
    pub first_load_timeout_secs: u64,
    /// List-resolution strategy (default: [`PaginationMode::Server`]).
    pub pagination_mode: PaginationMode,
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                 |
    /// |---------------------------|-------------------------|
    /// | `API_BASE_URL`            | `http://localhost:4000` |
    /// | `WS_BASE_URL`             | `ws://localhost:4000`   |
    /// | `PAGE_SIZE`               | `10`                    |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`                    |
    /// | `FIRST_LOAD_TIMEOUT_SECS` | `5`                     |
    /// | `PAGINATION_MODE`         | `server`                |
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_base_url =
            std::env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:4000".into());

        let ws_base_url =
            std::env::var("WS_BASE_URL").unwrap_or_else(|_| "ws://localhost:4000".into());

        let page_size: u32 = std::env::var("PAGE_SIZE")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("PAGE_SIZE must be a valid u32");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let first_load_timeout_secs: u64 = std::env::var("FIRST_LOAD_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".into())
            .parse()
            .expect("FIRST_LOAD_TIMEOUT_SECS must be a valid u64");

        let pagination_mode = match std::env::var("PAGINATION_MODE")
            .unwrap_or_else(|_| "server".into())
            .to_lowercase()
            .as_str()
        {
            "server" => PaginationMode::Server,
            "client" => PaginationMode::Client,
            other => panic!("PAGINATION_MODE must be 'server' or 'client', got {other:?}"),
        };

        Self {
            api_base_url,
            ws_base_url,
            page_size,
            request_timeout_secs,
            first_load_timeout_secs,
            pagination_mode,
        }
    }

    /// Per-request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// First-load window as a [`Duration`].
    pub fn first_load_timeout(&self) -> Duration {
        Duration::from_secs(self.first_load_timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:4000".into(),
            ws_base_url: "ws://localhost:4000".into(),
            page_size: 10,
            request_timeout_secs: 30,
            first_load_timeout_secs: 5,
            pagination_mode: PaginationMode::Server,
        }
    }
}
