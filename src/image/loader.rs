use super::ImageAcquirer;
use crate::ai::mime;
use crate::error::FetchFailure;
use crate::models::{CanonicalImage, DisplayRef};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

// Generic binary type some hosts use for images; treated as undeclared.
const OCTET_STREAM: &str = "application/octet-stream";

/// Reads local files and fetches remote images.
pub struct ImageLoader {
    client: Client,
    timeout: Duration,
}

impl ImageLoader {
    pub fn new(timeout: Duration) -> Self {
        Self::new_with_client(Client::new(), timeout)
    }

    pub fn new_with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Best-effort preview reference; a failed probe only loses dimensions.
    fn display_ref(source: &str, bytes: &[u8]) -> DisplayRef {
        let dimensions = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)
            .and_then(|reader| reader.into_dimensions());

        let dimensions = match dimensions {
            Ok(dimensions) => Some(dimensions),
            Err(e) => {
                tracing::debug!("Could not probe preview dimensions for {}: {}", source, e);
                None
            }
        };

        DisplayRef {
            source: source.to_string(),
            dimensions,
        }
    }

    fn fetch_error(url: &str, failure: FetchFailure) -> Error {
        tracing::error!("Image fetch from {} failed: {}", url, failure);
        Error::Fetch {
            url: url.to_string(),
            failure,
        }
    }

    fn classify_status(status: StatusCode) -> FetchFailure {
        match status {
            StatusCode::UNAUTHORIZED
            | StatusCode::FORBIDDEN
            | StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS => FetchFailure::Blocked(status.as_u16()),
            _ => FetchFailure::Status(status.as_u16()),
        }
    }
}

#[async_trait]
impl ImageAcquirer for ImageLoader {
    async fn from_local_file(&self, path: &Path) -> Result<CanonicalImage> {
        let bytes = tokio::fs::read(path).await.map_err(|source| {
            tracing::error!("Failed to read {}: {}", path.display(), source);
            Error::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let source = path.display().to_string();
        if bytes.is_empty() {
            return Err(Error::EmptyImage(source));
        }

        let media_type = mime::media_type_for_path(path)
            .or_else(|| mime::detect_image_mime(&bytes))
            .ok_or_else(|| Error::UnsupportedMediaType(format!("unknown file type: {}", source)))?;
        if !mime::is_image_media_type(media_type) {
            return Err(Error::UnsupportedMediaType(format!(
                "{} is {}, not an image",
                source, media_type
            )));
        }

        tracing::info!(
            "Read local image {} ({} bytes, {})",
            source,
            bytes.len(),
            media_type
        );

        let display = Self::display_ref(&source, &bytes);
        CanonicalImage::from_bytes(&bytes, media_type, display)
    }

    async fn from_remote_url(&self, url: &str) -> Result<CanonicalImage> {
        tracing::debug!("Fetching image from {}", url);

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Self::fetch_error(url, FetchFailure::Network(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::fetch_error(url, Self::classify_status(status)));
        }

        let declared = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(mime::normalize_media_type)
            .filter(|media_type| !media_type.is_empty() && media_type != OCTET_STREAM);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::fetch_error(url, FetchFailure::Network(e.to_string())))?;
        if bytes.is_empty() {
            return Err(Error::EmptyImage(url.to_string()));
        }

        let media_type = match declared {
            Some(media_type) if mime::is_image_media_type(&media_type) => media_type,
            Some(media_type) => {
                return Err(Self::fetch_error(url, FetchFailure::NotAnImage(media_type)));
            }
            None => mime::detect_image_mime(&bytes)
                .map(str::to_string)
                .ok_or_else(|| {
                    Self::fetch_error(url, FetchFailure::NotAnImage("unknown".to_string()))
                })?,
        };

        tracing::info!(
            "Fetched remote image {} ({} bytes, {})",
            url,
            bytes.len(),
            media_type
        );

        let display = Self::display_ref(url, &bytes);
        CanonicalImage::from_bytes(&bytes, &media_type, display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn loader() -> ImageLoader {
        ImageLoader::new(Duration::from_secs(5))
    }

    fn tiny_png() -> Vec<u8> {
        let mut bytes = Vec::new();
        image::RgbImage::new(3, 2)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[tokio::test]
    async fn test_local_file_is_encoded_with_declared_type() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("photo.png");
        let bytes = tiny_png();
        fs::write(&file, &bytes).unwrap();

        let image = loader().from_local_file(&file).await.unwrap();

        assert_eq!(image.media_type(), "image/png");
        assert_eq!(image.decode_payload().unwrap(), bytes);
        assert_eq!(image.display().dimensions, Some((3, 2)));
    }

    #[tokio::test]
    async fn test_local_file_without_extension_is_sniffed() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("upload");
        fs::write(&file, [0xFF, 0xD8, 0xFF, 0xE0, 0x00]).unwrap();

        let image = loader().from_local_file(&file).await.unwrap();
        assert_eq!(image.media_type(), "image/jpeg");
        assert_eq!(image.display().dimensions, None);
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let dir = tempdir().unwrap();
        let err = loader()
            .from_local_file(&dir.path().join("missing.jpg"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Read { .. }));
    }

    #[tokio::test]
    async fn test_non_image_file_is_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        fs::write(&file, "not an image").unwrap();

        let err = loader().from_local_file(&file).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedMediaType(_)));
    }

    #[tokio::test]
    async fn test_empty_file_is_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("empty.png");
        fs::write(&file, b"").unwrap();

        let err = loader().from_local_file(&file).await.unwrap_err();
        assert!(matches!(err, Error::EmptyImage(_)));
    }

    #[tokio::test]
    async fn test_remote_image_uses_reported_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.webp"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(PNG_SIGNATURE.to_vec(), "image/webp"),
            )
            .mount(&server)
            .await;

        let url = format!("{}/img.webp", server.uri());
        let image = loader().from_remote_url(&url).await.unwrap();

        // The declared type is trusted over the bytes.
        assert_eq!(image.media_type(), "image/webp");
        assert_eq!(image.decode_payload().unwrap(), PNG_SIGNATURE.to_vec());
        assert_eq!(image.display().source, url);
    }

    #[tokio::test]
    async fn test_remote_not_found_is_fetch_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = loader()
            .from_remote_url(&format!("{}/gone.png", server.uri()))
            .await
            .unwrap_err();

        match err {
            Error::Fetch { failure, .. } => assert_eq!(failure, FetchFailure::Status(404)),
            other => panic!("expected fetch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_forbidden_is_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = loader()
            .from_remote_url(&format!("{}/img.png", server.uri()))
            .await
            .unwrap_err();

        assert!(err.user_message().contains("download the image"));
        assert!(matches!(
            err,
            Error::Fetch {
                failure: FetchFailure::Blocked(403),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_remote_html_page_is_not_an_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html>hotlinking not allowed</html>", "text/html"),
            )
            .mount(&server)
            .await;

        let err = loader()
            .from_remote_url(&format!("{}/img.png", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Fetch {
                failure: FetchFailure::NotAnImage(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_remote_octet_stream_is_sniffed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(tiny_png(), "application/octet-stream"),
            )
            .mount(&server)
            .await;

        let image = loader()
            .from_remote_url(&format!("{}/raw", server.uri()))
            .await
            .unwrap();
        assert_eq!(image.media_type(), "image/png");
        assert_eq!(image.display().dimensions, Some((3, 2)));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let err = loader()
            .from_remote_url("http://127.0.0.1:9/img.png")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::Fetch {
                failure: FetchFailure::Network(_),
                ..
            }
        ));
    }
}
