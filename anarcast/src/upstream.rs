//! Icecast origin client.
//!
//! Opens `GET {base}/{mount}`, verifies the response, and captures the
//! headers the pipeline cares about: `Content-Type` plus anything in the
//! `icy-`/`ice-` families. `icy-metaint`, when present, configures the
//! metadata demuxer.

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("origin returned status {0}")]
    Status(StatusCode),

    #[error("icy-metaint must be a non-negative integer, got {0:?}")]
    InvalidMetaint(String),
}

/// An open origin connection, ready to stream.
pub struct Upstream {
    pub response: reqwest::Response,
    /// Audio bytes between metadata blocks; 0 when the origin sends none.
    pub metaint: usize,
    /// Captured `Content-Type` and `icy-`/`ice-` headers.
    pub headers: Vec<(String, String)>,
}

pub async fn connect(
    client: &reqwest::Client,
    base: &str,
    mount: &str,
) -> Result<Upstream, UpstreamError> {
    let url = format!("{base}/{mount}");
    let response = client.get(&url).send().await?;

    if response.status() != StatusCode::OK {
        return Err(UpstreamError::Status(response.status()));
    }

    let mut headers = Vec::new();
    for (name, value) in response.headers() {
        let name = name.as_str();
        if name == "content-type" || name.starts_with("icy-") || name.starts_with("ice-") {
            headers.push((
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            ));
        }
    }

    let metaint = match headers
        .iter()
        .find(|(name, _)| name == "icy-metaint")
        .map(|(_, value)| value)
    {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| UpstreamError::InvalidMetaint(value.clone()))?,
        None => 0,
    };

    Ok(Upstream {
        response,
        metaint,
        headers,
    })
}
