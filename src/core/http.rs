use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

const APP_USER_AGENT: &str = concat!("FacultyLauncher/", env!("CARGO_PKG_VERSION"));

/// Per-request ceiling applied to every metadata call and file transfer.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Shared client for mirrors and the backend. Bodies are requested uncompressed
/// so the bytes hashed on disk are exactly the bytes published upstream.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .timeout(timeout)
        .build()
}
