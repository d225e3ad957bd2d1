use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub recommendation: RecommendationConfig,
    pub onboarding: OnboardingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::InvalidConfig(format!("bad server address: {}", e)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub ratings_path: PathBuf,
    #[serde(default)]
    pub titles_path: Option<PathBuf>,
}

impl DataConfig {
    pub fn new(ratings_path: impl Into<PathBuf>) -> Self {
        Self {
            ratings_path: ratings_path.into(),
            titles_path: None,
        }
    }

    pub fn with_titles(mut self, titles_path: impl Into<PathBuf>) -> Self {
        self.titles_path = Some(titles_path.into());
        self
    }

    pub fn titles_path(&self) -> PathBuf {
        match &self.titles_path {
            Some(path) => path.clone(),
            None => self
                .ratings_path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join("u.item"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub num_recommendations: usize,
    /// Below this many candidates the most active users are added to the pool.
    pub min_candidate_pool: usize,
    pub fallback_active_users: usize,
    pub min_shared_items: usize,
    /// Candidates must score strictly above this to become neighbors.
    pub similarity_floor: f32,
    pub max_neighbors: usize,
    pub min_neighbor_support: usize,
    pub rating_min: f32,
    pub rating_max: f32,
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardingConfig {
    pub prompt_size: usize,
    pub popular_pool: usize,
    pub top_score: f32,
    pub score_step: f32,
}

impl OnboardingConfig {
    pub fn score_for_position(&self, position: usize) -> f32 {
        self.top_score - self.score_step * position as f32
    }
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            num_recommendations: 5,
            min_candidate_pool: 50,
            fallback_active_users: 100,
            min_shared_items: 3,
            similarity_floor: 0.1,
            max_neighbors: 20,
            min_neighbor_support: 2,
            rating_min: 1.0,
            rating_max: 5.0,
            max_request_size: 1000,
        }
    }
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        Self {
            prompt_size: 5,
            popular_pool: 50,
            top_score: 5.0,
            score_step: 0.5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                workers: num_cpus::get(),
            },
            data: DataConfig::new("data/u.data"),
            recommendation: RecommendationConfig::default(),
            onboarding: OnboardingConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("COLLABREC").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let rec = &self.recommendation;
        if !(rec.rating_min < rec.rating_max) {
            return Err(Error::InvalidConfig(format!(
                "rating scale [{}, {}] is empty",
                rec.rating_min, rec.rating_max
            )));
        }
        if rec.max_neighbors == 0 || rec.min_neighbor_support == 0 {
            return Err(Error::InvalidConfig(
                "max_neighbors and min_neighbor_support must be positive".to_string(),
            ));
        }
        if !rec.similarity_floor.is_finite() {
            return Err(Error::InvalidConfig("similarity_floor must be finite".to_string()));
        }
        if rec.num_recommendations == 0 || rec.num_recommendations > rec.max_request_size {
            return Err(Error::InvalidConfig(format!(
                "num_recommendations must be in 1..={}",
                rec.max_request_size
            )));
        }

        let onboarding = &self.onboarding;
        if onboarding.prompt_size == 0 || onboarding.prompt_size > onboarding.popular_pool {
            return Err(Error::InvalidConfig(format!(
                "prompt_size must be in 1..={}",
                onboarding.popular_pool
            )));
        }
        let lowest = onboarding.score_for_position(onboarding.prompt_size - 1);
        if onboarding.top_score > rec.rating_max || lowest < rec.rating_min {
            return Err(Error::InvalidConfig(format!(
                "ranking scores {}..{} fall outside the rating scale",
                onboarding.top_score, lowest
            )));
        }
        Ok(())
    }
}
