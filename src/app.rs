//! Application orchestration for one analysis session.

use crate::ai::{AnalysisService, GeminiAnalysisClient};
use crate::image::{ImageAcquirer, ImageInput, ImageLoader};
use crate::models::{CanonicalImage, Config, PromptResult};
use crate::session::{AnalysisSession, AnalysisStateMachine, Ticket};
use crate::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Owns the single session and runs submissions through acquisition and
/// analysis.
pub struct App {
    acquirer: Box<dyn ImageAcquirer>,
    analyzer: Box<dyn AnalysisService>,
    session: AnalysisStateMachine,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub acquirer: Box<dyn ImageAcquirer>,
    pub analyzer: Box<dyn AnalysisService>,
}

impl App {
    /// Build an app from concrete service dependencies.
    ///
    /// This is primarily useful for integration tests and local harnesses that
    /// need to inject mocks.
    pub fn with_services(services: AppServices) -> Self {
        Self {
            acquirer: services.acquirer,
            analyzer: services.analyzer,
            session: AnalysisStateMachine::new(),
        }
    }

    /// Compose the production app. The credential is validated here, once;
    /// a missing key fails before any request is made.
    pub fn new(config: &Config) -> Result<Self> {
        // Reuse one HTTP connection pool for image fetches and analysis.
        let http_client = reqwest::Client::new();

        let analyzer = GeminiAnalysisClient::from_config(config, http_client.clone())?;
        info!("Analysis provider: Gemini (model: {})", analyzer.model());

        let acquirer = ImageLoader::new_with_client(http_client, config.fetch_timeout);

        Ok(Self::with_services(AppServices {
            acquirer: Box::new(acquirer),
            analyzer: Box::new(analyzer),
        }))
    }

    pub fn snapshot(&self) -> AnalysisSession {
        self.session.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisSession> {
        self.session.subscribe()
    }

    /// User-initiated restart. Allowed at any time; an in-flight result is
    /// discarded when it arrives.
    pub fn reset(&self) {
        info!("Resetting session");
        self.session.reset();
    }

    /// Acquire `input`, analyze it, and return the final snapshot.
    ///
    /// Acquisition and analysis failures end the session in `error` and are
    /// not returned as `Err`; only a rejected submission (one already in
    /// flight) is.
    pub async fn submit(&self, input: &ImageInput) -> Result<AnalysisSession> {
        let ticket = self.session.submit_pending()?;
        info!("Acquiring image from {}", input);

        let image = match self.acquirer.acquire(input).await {
            Ok(image) => Arc::new(image),
            Err(e) => return Ok(self.finish(&ticket, Err(e))),
        };

        if !self.session.record_image(&ticket, Arc::clone(&image))? {
            return Ok(self.session.snapshot());
        }

        let outcome = self.analyzer.analyze(&image).await;
        Ok(self.finish(&ticket, outcome))
    }

    /// Analyze an image that was already acquired.
    pub async fn submit_image(&self, image: CanonicalImage) -> Result<AnalysisSession> {
        let image = Arc::new(image);
        let ticket = self.session.submit(Arc::clone(&image))?;

        let outcome = self.analyzer.analyze(&image).await;
        Ok(self.finish(&ticket, outcome))
    }

    fn finish(&self, ticket: &Ticket, outcome: Result<PromptResult>) -> AnalysisSession {
        let applied = match outcome {
            Ok(result) => {
                info!("Analysis succeeded");
                self.session.resolve(ticket, result)
            }
            Err(e) => {
                error!("Submission failed: {}", e);
                self.session.reject(ticket, e.user_message())
            }
        };

        match applied {
            Ok(true) => {}
            Ok(false) => warn!("Session was reset before the analysis finished; result discarded"),
            Err(e) => error!("Could not record analysis outcome: {}", e),
        }

        self.session.snapshot()
    }
}
