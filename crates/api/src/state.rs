use std::sync::Arc;

use deepguard_domain::account_store::InMemoryAccountRepository;
use deepguard_domain::accounts::AccountService;
use deepguard_domain::admission::AdmissionController;
use deepguard_domain::ports::media::{FrameClassifier, FrameDecoder, FrameExtractor, ResourceFetcher};
use deepguard_domain::ports::research::ThreatResearch;
use deepguard_domain::ports::webhook::WebhookTransport;
use deepguard_domain::rate_limit::FixedWindowRateLimiter;
use deepguard_domain::research::ResearchService;
use deepguard_domain::reviews::ReviewService;
use deepguard_domain::scoring::{ScoreAggregator, ScoringConfig};
use deepguard_domain::webhook::{DispatcherConfig, NotificationDispatcher};
use deepguard_infra::auth::{AdminCredentials, StaticAdminSecret};
use deepguard_infra::config::AppConfig;
use deepguard_infra::frame_extractor::CommandFrameExtractor;
use deepguard_infra::http_fetcher::HttpResourceFetcher;
use deepguard_infra::labels::LabelStore;
use deepguard_infra::media::{BaselineFrameClassifier, ImageFrameDecoder};
use deepguard_infra::research_client::ChatCompletionsResearchClient;
use deepguard_infra::webhook_transport::ReqwestWebhookTransport;

/// The outbound edges of the service. Tests swap these for local stubs.
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn ResourceFetcher>,
    pub decoder: Arc<dyn FrameDecoder>,
    pub classifier: Arc<dyn FrameClassifier>,
    pub extractor: Arc<dyn FrameExtractor>,
    pub transport: Arc<dyn WebhookTransport>,
    pub research: Option<Arc<dyn ThreatResearch>>,
}

impl Collaborators {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let research = ChatCompletionsResearchClient::from_config(config)?
            .map(|client| Arc::new(client) as Arc<dyn ThreatResearch>);
        if research.is_none() {
            tracing::info!("research api key not set; research endpoints disabled");
        }
        Ok(Self {
            fetcher: Arc::new(HttpResourceFetcher::new(config.fetch_timeout())?),
            decoder: Arc::new(ImageFrameDecoder),
            classifier: Arc::new(BaselineFrameClassifier::default()),
            extractor: Arc::new(CommandFrameExtractor::from_config(config)),
            transport: Arc::new(ReqwestWebhookTransport::new()?),
            research,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub accounts: AccountService,
    pub admission: AdmissionController,
    pub aggregator: ScoreAggregator,
    pub reviews: ReviewService,
    pub research: ResearchService,
    pub labels: LabelStore,
    pub legacy_keys: Arc<Vec<String>>,
    pub legacy_limiter: Arc<FixedWindowRateLimiter>,
    pub admin: Arc<dyn AdminCredentials>,
}

impl AppState {
    /// Fails when an outbound HTTP client cannot be built.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let collaborators = Collaborators::from_config(&config)?;
        Ok(Self::with_collaborators(config, collaborators))
    }

    pub fn with_collaborators(config: AppConfig, collaborators: Collaborators) -> Self {
        let repository = Arc::new(InMemoryAccountRepository::default());
        let accounts = AccountService::new(repository.clone());

        let aggregator = ScoreAggregator::new(
            collaborators.fetcher,
            collaborators.decoder,
            collaborators.classifier,
            collaborators.extractor,
            ScoringConfig {
                fetch_timeout: config.fetch_timeout(),
                video_frame_count: config.video_frame_count,
            },
        );
        let dispatcher = NotificationDispatcher::new(
            collaborators.transport,
            DispatcherConfig {
                timeout: config.webhook_timeout(),
                max_attempts: config.webhook_max_attempts,
                backoff_base: config.webhook_backoff_base(),
            },
        );

        let admin = StaticAdminSecret::new(config.admin_secret.clone());
        if !admin.is_configured() {
            tracing::warn!("admin secret not set; admin endpoints will reject every request");
        }

        Self {
            admission: AdmissionController::new(
                accounts.clone(),
                aggregator.clone(),
                dispatcher.clone(),
            ),
            reviews: ReviewService::new(repository, dispatcher),
            research: ResearchService::new(collaborators.research),
            labels: LabelStore::from_config(&config),
            legacy_keys: Arc::new(config.legacy_keys()),
            legacy_limiter: Arc::new(FixedWindowRateLimiter::new(
                config.rate_limit_per_min,
                config.rate_limit_window_secs,
            )),
            admin: Arc::new(admin),
            accounts,
            aggregator,
            config,
        }
    }
}
