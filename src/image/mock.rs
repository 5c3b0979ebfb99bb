use super::ImageAcquirer;
use crate::error::FetchFailure;
use crate::models::{CanonicalImage, DisplayRef};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// In-memory acquirer: serves registered files and URLs, fails the rest.
#[derive(Clone)]
pub struct MockImageLoader {
    files: Arc<Mutex<HashMap<String, (Vec<u8>, String)>>>,
    urls: Arc<Mutex<HashMap<String, std::result::Result<(Vec<u8>, String), FetchFailure>>>>,
    acquire_count: Arc<Mutex<usize>>,
}

impl MockImageLoader {
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            urls: Arc::new(Mutex::new(HashMap::new())),
            acquire_count: Arc::new(Mutex::new(0)),
        }
    }

    pub fn with_file(self, path: &str, bytes: Vec<u8>, media_type: &str) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), (bytes, media_type.to_string()));
        self
    }

    pub fn with_url(self, url: &str, bytes: Vec<u8>, media_type: &str) -> Self {
        self.urls
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok((bytes, media_type.to_string())));
        self
    }

    pub fn with_url_failure(self, url: &str, failure: FetchFailure) -> Self {
        self.urls
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(failure));
        self
    }

    pub fn get_acquire_count(&self) -> usize {
        *self.acquire_count.lock().unwrap()
    }

    fn bump(&self) {
        *self.acquire_count.lock().unwrap() += 1;
    }

    fn canonical(source: &str, bytes: &[u8], media_type: &str) -> Result<CanonicalImage> {
        CanonicalImage::from_bytes(
            bytes,
            media_type,
            DisplayRef {
                source: source.to_string(),
                dimensions: None,
            },
        )
    }
}

impl Default for MockImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageAcquirer for MockImageLoader {
    async fn from_local_file(&self, path: &Path) -> Result<CanonicalImage> {
        self.bump();

        let key = path.to_string_lossy().to_string();
        let entry = self.files.lock().unwrap().get(&key).cloned();
        match entry {
            Some((bytes, media_type)) => Self::canonical(&key, &bytes, &media_type),
            None => Err(Error::Read {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock file not found"),
            }),
        }
    }

    async fn from_remote_url(&self, url: &str) -> Result<CanonicalImage> {
        self.bump();

        let entry = self.urls.lock().unwrap().get(url).cloned();
        match entry {
            Some(Ok((bytes, media_type))) => Self::canonical(url, &bytes, &media_type),
            Some(Err(failure)) => Err(Error::Fetch {
                url: url.to_string(),
                failure,
            }),
            None => Err(Error::Fetch {
                url: url.to_string(),
                failure: FetchFailure::Status(404),
            }),
        }
    }
}
