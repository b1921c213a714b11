use crate::accounting::{rounded_kib, size_reduction_percent};
use crate::compressor::{Compressor, ImageCompressor};
use crate::config::ServerConfig;
use crate::constants::{
    COMPRESS_ROUTE, MSG_COMPRESS_ERROR, MSG_INVALID_TYPE, MSG_NO_IMAGE, TEMP_ROUTE_PREFIX,
    TEMP_SWEEP_INTERVAL_SECS, UPLOAD_FIELD_NAME,
};
use crate::error::{CompressionError, Result};
use crate::mime::ImageMime;
use crate::profile::CompressionProfile;
use crate::temp_store::{TempFile, TempStore};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::Multipart;
use bytes::Bytes;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Room for multipart boundaries and headers on top of the file limit.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Body of a successful `POST /api/compress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressResponse {
    pub compressed_image_url: String,
    /// KiB, rounded.
    pub original_size: i64,
    /// KiB, rounded.
    pub compressed_size: i64,
    /// Percent, rounded.
    pub size_reduction: i64,
}

impl CompressResponse {
    pub fn new(compressed_image_url: String, original_bytes: u64, compressed_bytes: u64) -> Self {
        Self {
            compressed_image_url,
            original_size: rounded_kib(original_bytes),
            compressed_size: rounded_kib(compressed_bytes),
            size_reduction: size_reduction_percent(original_bytes, compressed_bytes),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound,
    Compression(CompressionError),
    Internal(String),
}

impl From<CompressionError> for ApiError {
    fn from(err: CompressionError) -> Self {
        ApiError::Compression(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                warn!("Rejected upload: {}", message);
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ApiError::Compression(e) => {
                error!("Error compressing image: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_COMPRESS_ERROR).into_response()
            }
            ApiError::Internal(message) => {
                error!("Error compressing image: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, MSG_COMPRESS_ERROR).into_response()
            }
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<TempStore>,
    compressor: Arc<dyn Compressor>,
    profile: CompressionProfile,
    max_upload_bytes: u64,
    fallback_host: String,
}

impl AppState {
    pub fn new(
        store: Arc<TempStore>,
        compressor: Arc<dyn Compressor>,
        profile: CompressionProfile,
        max_upload_bytes: u64,
        fallback_host: impl Into<String>,
    ) -> Self {
        Self {
            store,
            compressor,
            profile,
            max_upload_bytes,
            fallback_host: fallback_host.into(),
        }
    }

    pub fn from_config(config: &ServerConfig, store: Arc<TempStore>) -> Self {
        Self::new(
            store,
            Arc::new(ImageCompressor::for_profile(config.profile)),
            config.profile,
            config.max_upload_bytes,
            format!("{}:{}", config.host, config.port),
        )
    }

    pub fn store(&self) -> &Arc<TempStore> {
        &self.store
    }
}

pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route(COMPRESS_ROUTE, post(compress_image))
        .route(
            &format!("{}/:name", TEMP_ROUTE_PREFIX),
            get(download_temp).head(describe_temp),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

struct Upload {
    name: String,
    mime: ImageMime,
    bytes: Vec<u8>,
}

/// Pulls the single `image` file out of the form, validating its declared
/// type before reading it and its size while reading it.
async fn read_upload(multipart: &mut Multipart, state: &AppState) -> std::result::Result<Upload, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD_NAME) || field.file_name().is_none() {
            continue;
        }

        let name = field.file_name().unwrap_or("image").to_string();
        let mime = field
            .content_type()
            .and_then(|declared| state.profile.accepts(declared))
            .ok_or_else(|| ApiError::BadRequest(MSG_INVALID_TYPE.to_string()))?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Malformed upload: {}", e)))?
        {
            if (bytes.len() + chunk.len()) as u64 > state.max_upload_bytes {
                return Err(ApiError::BadRequest(
                    CompressionError::FileTooLarge(
                        (bytes.len() + chunk.len()) as u64,
                        state.max_upload_bytes,
                    )
                    .to_string(),
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        return Ok(Upload { name, mime, bytes });
    }

    Err(ApiError::BadRequest(MSG_NO_IMAGE.to_string()))
}

async fn compress_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> std::result::Result<Json<CompressResponse>, ApiError> {
    let upload = read_upload(&mut multipart, &state).await?;
    let original_size = upload.bytes.len() as u64;
    info!("Compressing {} ({}, {} bytes)", upload.name, upload.mime, original_size);

    let compressor = state.compressor.clone();
    let store = state.store.clone();
    // The guard removes the file if anything below fails.
    let (temp_file, compressed_size): (TempFile, u64) =
        tokio::task::spawn_blocking(move || -> Result<(TempFile, u64)> {
            let compressed = compressor.compress(&upload.bytes, upload.mime)?;
            let file = store.write(&compressed)?;
            Ok((file, compressed.len() as u64))
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or(state.fallback_host.as_str());
    let url = format!("http://{}{}/{}", host, TEMP_ROUTE_PREFIX, temp_file.name());
    let response = CompressResponse::new(url, original_size, compressed_size);

    info!(
        "Compressed: {} KB -> {} KB ({}%)",
        response.original_size, response.compressed_size, response.size_reduction
    );

    state.store.register(temp_file);
    Ok(Json(response))
}

/// Streams a file and holds its guard until the stream is dropped, which
/// happens once the response body has been sent (or abandoned).
struct ServeOnce {
    inner: ReaderStream<tokio::fs::File>,
    _guard: TempFile,
}

impl Stream for ServeOnce {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

async fn download_temp(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> std::result::Result<Response, ApiError> {
    let temp_file = state.store.claim(&name).ok_or(ApiError::NotFound)?;

    let file = tokio::fs::File::open(temp_file.path()).await.map_err(|e| {
        warn!("Temporary file {} vanished before download: {}", name, e);
        ApiError::NotFound
    })?;
    let length = file.metadata().await.map(|m| m.len()).ok();

    let body = Body::from_stream(ServeOnce {
        inner: ReaderStream::new(file),
        _guard: temp_file,
    });

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ImageMime::Jpeg.as_str());
    if let Some(length) = length {
        response = response.header(header::CONTENT_LENGTH, length);
    }
    response
        .body(body)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Answers HEAD without claiming, so the single download is still available.
async fn describe_temp(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> std::result::Result<Response, ApiError> {
    let path = state.store.peek_path(&name).ok_or(ApiError::NotFound)?;
    let length = tokio::fs::metadata(&path)
        .await
        .map_err(|_| ApiError::NotFound)?
        .len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, ImageMime::Jpeg.as_str())
        .header(header::CONTENT_LENGTH, length)
        .body(Body::empty())
        .map_err(|e| ApiError::Internal(e.to_string()))
}

fn spawn_sweeper(store: Arc<TempStore>, max_age: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(TEMP_SWEEP_INTERVAL_SECS));
        loop {
            interval.tick().await;
            store.sweep_expired(max_age);
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

/// Runs the HTTP service until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<()> {
    let addr = config.socket_addr()?;
    let store = Arc::new(TempStore::create(&config.temp_dir)?);
    let state = AppState::from_config(&config, store.clone());
    let sweeper = spawn_sweeper(store.clone(), config.temp_max_age());

    let listener = TcpListener::bind(addr).await?;
    info!(
        "Server running at http://{} (profile: {}, temp dir: {:?})",
        addr,
        config.profile,
        store.dir()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    let removed = store.sweep_expired(Duration::ZERO);
    if removed > 0 {
        info!("Removed {} unclaimed temporary files", removed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_response_accounting() {
        let response = CompressResponse::new(
            "http://localhost:5000/temp/x.jpg".to_string(),
            2000 * 1024,
            1000 * 1024,
        );
        assert_eq!(response.original_size, 2000);
        assert_eq!(response.compressed_size, 1000);
        assert_eq!(response.size_reduction, 50);
    }

    #[test]
    fn test_compress_response_is_camel_case() {
        let response = CompressResponse::new("u".to_string(), 1024, 512);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["compressedImageUrl"], "u");
        assert_eq!(json["originalSize"], 1);
        assert_eq!(json["compressedSize"], 1);
        assert_eq!(json["sizeReduction"], 50);
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Compression(CompressionError::UnsupportedFormat("svg".into()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
