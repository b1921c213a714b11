use crate::compressor::Compressor;
use crate::constants::{COMPRESS_ROUTE, UPLOAD_FIELD_NAME};
use crate::error::{CompressionError, Result};
use crate::mime::ImageMime;
use crate::server::CompressResponse;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use std::time::Duration;
use tracing::debug;

/// Compresses by delegating to a running `img-compressor serve` instance:
/// one upload per image, then one download of the returned URL.
#[derive(Debug, Clone)]
pub struct HttpCompressor {
    base_url: String,
    client: Client,
}

impl HttpCompressor {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Option::<Duration>::None)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, COMPRESS_ROUTE)
    }
}

fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(CompressionError::Remote(format!("{}: {}", status, body.trim())))
}

impl Compressor for HttpCompressor {
    fn compress(&self, source: &[u8], mime: ImageMime) -> Result<Vec<u8>> {
        let part = Part::bytes(source.to_vec())
            .file_name(format!("upload.{}", mime.extension()))
            .mime_str(mime.as_str())?;
        let form = Form::new().part(UPLOAD_FIELD_NAME, part);

        let response = self.client.post(self.endpoint()).multipart(form).send()?;
        let payload: CompressResponse = ensure_success(response)?.json()?;
        debug!(
            "Server reported {} KB -> {} KB ({}%)",
            payload.original_size, payload.compressed_size, payload.size_reduction
        );

        let download = self.client.get(&payload.compressed_image_url).send()?;
        let bytes = ensure_success(download)?.bytes()?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let compressor = HttpCompressor::new("http://localhost:5000/").unwrap();
        assert_eq!(compressor.endpoint(), "http://localhost:5000/api/compress");
    }

    #[test]
    fn test_unreachable_server_is_a_remote_error() {
        let compressor = HttpCompressor::new("http://127.0.0.1:9").unwrap();
        let result = compressor.compress(b"bytes", ImageMime::Png);
        assert!(matches!(result, Err(CompressionError::Remote(_))));
    }
}
