//! Test doubles for the external generation and image-search services

#![allow(dead_code)]

use async_trait::async_trait;
use kweb_server::services::{
    GenerationBackend, GenerationError, ImageHit, ImageSearch, ImageSearchError,
    KnowledgePipeline, PipelineOptions,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

type Responder = Box<dyn Fn(&str) -> Result<String, GenerationError> + Send + Sync>;

/// Generation backend answering from a closure and counting calls
pub struct StubBackend {
    responder: Responder,
    delay: Duration,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    models: Mutex<Vec<String>>,
}

impl StubBackend {
    pub fn new(
        responder: impl Fn(&str) -> Result<String, GenerationError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            models: Mutex::new(Vec::new()),
        }
    }

    /// Same text for every prompt
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Every call fails as if the service were down
    pub fn unreachable() -> Self {
        Self::new(|_| Err(GenerationError::Network("connection refused".to_string())))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of received prompts containing `needle`
    pub fn calls_matching(&self, needle: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }

    pub fn models(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for StubBackend {
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.models.lock().unwrap().push(model.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.responder)(prompt)
    }
}

/// Image search answering per query and counting calls
///
/// Queries without a configured answer return no hits.
pub struct StubImageSearch {
    answers: HashMap<String, Result<Vec<ImageHit>, ImageSearchError>>,
    download: Result<Vec<u8>, ImageSearchError>,
    searches: Mutex<Vec<String>>,
    downloads: AtomicUsize,
}

impl StubImageSearch {
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
            download: Ok(b"\xFF\xD8\xFFjpeg-bytes".to_vec()),
            searches: Mutex::new(Vec::new()),
            downloads: AtomicUsize::new(0),
        }
    }

    pub fn with_hit(mut self, query: &str, url: &str) -> Self {
        self.answers.insert(
            query.to_string(),
            Ok(vec![ImageHit {
                large_image_url: url.to_string(),
            }]),
        );
        self
    }

    pub fn with_error(mut self, query: &str, error: ImageSearchError) -> Self {
        self.answers.insert(query.to_string(), Err(error));
        self
    }

    pub fn with_download_error(mut self, error: ImageSearchError) -> Self {
        self.download = Err(error);
        self
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSearch for StubImageSearch {
    async fn search(&self, query: &str) -> Result<Vec<ImageHit>, ImageSearchError> {
        self.searches.lock().unwrap().push(query.to_string());
        self.answers
            .get(query)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn download(&self, _url: &str) -> Result<Vec<u8>, ImageSearchError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        self.download.clone()
    }
}

/// Pipeline over stubs with a temporary image directory
pub struct TestPipeline {
    pub pipeline: KnowledgePipeline,
    pub backend: Arc<StubBackend>,
    pub search: Arc<StubImageSearch>,
    pub images_dir: TempDir,
}

impl TestPipeline {
    pub fn new(backend: StubBackend, search: StubImageSearch) -> Self {
        Self::with_options(backend, search, |options| options)
    }

    pub fn with_options(
        backend: StubBackend,
        search: StubImageSearch,
        configure: impl FnOnce(PipelineOptions) -> PipelineOptions,
    ) -> Self {
        let images_dir = TempDir::new().unwrap();
        let backend = Arc::new(backend);
        let search = Arc::new(search);
        let options = configure(PipelineOptions::new(images_dir.path()));

        let pipeline = KnowledgePipeline::new(backend.clone(), search.clone(), options);

        Self {
            pipeline,
            backend,
            search,
            images_dir,
        }
    }
}

/// Answers topic prompts with a fixed five-element list, everything else
/// with `article`
pub fn astronomy_backend(title: &'static str) -> StubBackend {
    StubBackend::new(move |prompt| {
        if prompt.contains("Generate exactly 5 short, specific topics") {
            Ok("['Black Holes', 'Exoplanets', 'Nebulae', 'Stars', 'Galaxies']".to_string())
        } else if prompt.contains("Generate a proper article title") {
            Ok(title.to_string())
        } else {
            Ok("A long article body.".to_string())
        }
    })
}

/// Poll until `path` exists or `timeout` elapses
pub async fn wait_for_file(path: &std::path::Path, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    path.exists()
}

/// Bind an ephemeral local port for a fake upstream service
pub async fn bind_local() -> (tokio::net::TcpListener, std::net::SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Serve `app` on `listener` until the test runtime shuts down
pub fn spawn_server(listener: tokio::net::TcpListener, app: axum::Router) {
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
}
