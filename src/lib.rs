pub mod algorithms;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{Error, Result};
pub use models::*;

use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ratings_store: Arc<services::ratings_store::RatingsStoreHandle>,
    pub recommendation_service: Arc<services::recommendation::RecommendationService>,
    pub onboarding_service: Arc<services::onboarding::OnboardingService>,
    pub serving_service: Arc<services::serving::ServingService>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let ratings_store = Arc::new(services::ratings_store::RatingsStoreHandle::new(
            config.data.clone(),
        ));

        let recommendation_service = Arc::new(services::recommendation::RecommendationService::new(
            ratings_store.clone(),
            config.clone(),
        )?);

        let onboarding_service = Arc::new(services::onboarding::OnboardingService::new(
            ratings_store.clone(),
            config.clone(),
        ));

        let serving_service = Arc::new(services::serving::ServingService::new(
            recommendation_service.clone(),
            onboarding_service.clone(),
        ));

        Ok(Self {
            config,
            ratings_store,
            recommendation_service,
            onboarding_service,
            serving_service,
        })
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
