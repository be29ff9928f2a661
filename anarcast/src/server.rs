//! HLS HTTP endpoints.
//!
//! `/` and `/healthy` are fixed routes; everything else funnels through
//! one dispatcher that parses `/{mount}/...` itself, mirroring the
//! reference server's single-handler layout while keeping the router
//! scoped to this instance. Unmatched paths redirect when a redirect URL
//! is configured, otherwise 404.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::directory::Directory;

#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<Directory>,
    pub redirect: Option<String>,
    pub minimum: usize,
}

const CORS_HEADERS: [(&str, &str); 6] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Credentials", "true"),
    ("Access-Control-Allow-Methods", "OPTIONS, GET, POST, HEAD"),
    (
        "Access-Control-Allow-Headers",
        "Content-Type, User-Agent, If-Modified-Since, Cache-Control, Range",
    ),
    (
        "Access-Control-Expose-Headers",
        "Date, Server, Content-Type, Content-Length",
    ),
    ("Cache-Control", "no-cache"),
];

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthy", get(healthy))
        .fallback(get(dispatch))
        .layer(middleware::from_fn(server_header))
        .with_state(state)
}

pub async fn serve(
    addr: &str,
    state: AppState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen_addr(addr)).await?;
    info!(addr = %listener.local_addr()?, "http server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Accepts Go-style listen addresses like `:8888`.
fn listen_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

async fn server_header(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert(header::SERVER, HeaderValue::from_static("Anarcast"));
    response
}

async fn root(State(state): State<AppState>) -> Response {
    match &state.redirect {
        Some(url) => Redirect::to(url).into_response(),
        None => (StatusCode::OK, "Hello, World!\n").into_response(),
    }
}

async fn healthy(State(state): State<AppState>) -> StatusCode {
    if state.directory.list().len() >= state.minimum {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Debug, PartialEq, Eq)]
enum StreamRoute {
    MasterPlaylist,
    ChunkList,
    Segment(u64),
}

async fn dispatch(State(state): State<AppState>, uri: Uri) -> Response {
    let Some((mount, route)) = parse_path(uri.path()) else {
        return miss(&state);
    };

    let Some(stream) = state.directory.find(mount) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let window = stream.index();
    if window.is_empty() {
        return StatusCode::NOT_FOUND.into_response();
    }

    match route {
        StreamRoute::MasterPlaylist => (
            [(header::CONTENT_TYPE.as_str(), "application/vnd.apple.mpegurl")],
            master_playlist(stream.bandwidth()),
        )
            .into_response(),
        StreamRoute::ChunkList => (
            CORS_HEADERS,
            [(header::CONTENT_TYPE.as_str(), "application/vnd.apple.mpegurl")],
            media_playlist(&window),
        )
            .into_response(),
        StreamRoute::Segment(index) => match stream.chunk(index) {
            Some(data) => (
                CORS_HEADERS,
                [(header::CONTENT_TYPE.as_str(), "video/MP2T")],
                data,
            )
                .into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
    }
}

/// Splits `/{mount}/{file}` and validates the mount name. Returns `None`
/// for anything that should fall through to the redirect/404 path.
fn parse_path(path: &str) -> Option<(&str, StreamRoute)> {
    let rest = path.strip_prefix('/')?;
    let (mount, file) = rest.split_once('/')?;
    if mount.is_empty() || file.contains('/') || !mount.bytes().all(is_mount_byte) {
        return None;
    }

    let route = match file {
        "" | "playlist.m3u8" => StreamRoute::MasterPlaylist,
        "chunklist.m3u8" => StreamRoute::ChunkList,
        _ => {
            let digits = file.strip_suffix(".ts")?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            StreamRoute::Segment(digits.parse().ok()?)
        }
    };
    Some((mount, route))
}

fn is_mount_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'.' || b == b'-' || b == b'_'
}

fn miss(state: &AppState) -> Response {
    match &state.redirect {
        Some(url) => Redirect::to(url).into_response(),
        None => (StatusCode::NOT_FOUND, "Sorry\n").into_response(),
    }
}

fn master_playlist(bandwidth: u32) -> String {
    format!(
        "#EXTM3U\n\
         #EXT-X-VERSION:3\n\
         #EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH={bandwidth},CODECS=\"mp4a.40.2\"\n\
         chunklist.m3u8\n"
    )
}

fn media_playlist(window: &[(u64, u64)]) -> String {
    use std::fmt::Write;

    let mut body = String::from("#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:12\n");
    let _ = writeln!(body, "#EXT-X-MEDIA-SEQUENCE:  {}", window[0].0);
    for (index, duration_nanos) in window {
        let _ = writeln!(
            body,
            "#EXTINF:{:.2},\n{index}.ts",
            *duration_nanos as f64 / 1e9
        );
    }
    body
}
