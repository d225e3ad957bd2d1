use crate::algorithms::{RecommendationAlgorithm, RecommendationEngine};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::*;
use crate::services::ratings_store::{RatingsStore, RatingsStoreHandle};
use crate::utils::validation::{validate_batch_size, validate_recommendation_request};
use chrono::Utc;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, info};

const MAX_BATCH_SIZE: usize = 256;

pub struct RecommendationService {
    store: Arc<RatingsStoreHandle>,
    config: Arc<Config>,
    pool: Arc<rayon::ThreadPool>,
}

impl RecommendationService {
    pub fn new(store: Arc<RatingsStoreHandle>, config: Arc<Config>) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.server.workers.max(1))
            .thread_name(|index| format!("collabrec-worker-{}", index))
            .build()
            .map_err(|e| Error::Worker(e.to_string()))?;

        Ok(Self {
            store,
            config,
            pool: Arc::new(pool),
        })
    }

    pub async fn load(&self) -> Result<()> {
        let store = self.store.load().await?;
        info!(
            "Recommendation service ready: {} users, {} items, {} titles",
            store.user_count(),
            store.item_count(),
            store.title_count()
        );
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    pub fn engine(&self) -> Result<RecommendationEngine> {
        Ok(RecommendationEngine::new(
            self.store.get()?,
            self.config.recommendation.clone(),
        ))
    }

    pub async fn get_recommendations(
        &self,
        request: RecommendationRequest,
    ) -> Result<RecommendationResponse> {
        let num_recommendations =
            validate_recommendation_request(&request, &self.config.recommendation)?;
        let engine = self.engine()?;

        debug!(
            "Scoring {} seed items for {} recommendations",
            request.ratings.len(),
            num_recommendations
        );

        tokio::task::spawn_blocking(move || respond(&engine, &request.ratings, num_recommendations))
            .await
            .map_err(|e| Error::Worker(e.to_string()))
    }

    pub async fn get_batch_recommendations(
        &self,
        requests: Vec<RecommendationRequest>,
    ) -> Result<Vec<Result<RecommendationResponse>>> {
        validate_batch_size(requests.len(), MAX_BATCH_SIZE)?;
        let engine = Arc::new(self.engine()?);
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            pool.install(|| {
                requests
                    .into_par_iter()
                    .map(|request| -> Result<RecommendationResponse> {
                        let num_recommendations =
                            validate_recommendation_request(&request, engine.config())?;
                        Ok(respond(engine.as_ref(), &request.ratings, num_recommendations))
                    })
                    .collect::<Vec<_>>()
            })
        })
        .await
        .map_err(|e| Error::Worker(e.to_string()))
    }

    pub fn popular_items(&self, limit: usize) -> Result<Vec<ItemPopularity>> {
        let store = self.store.get()?;
        Ok(store
            .most_rated_items(limit)
            .into_iter()
            .map(|(item_id, rating_count)| ItemPopularity {
                item_id,
                title: store.item_title(item_id),
                rating_count,
            })
            .collect())
    }

    pub fn item_title(&self, item_id: ItemId) -> Result<String> {
        Ok(self.store.get()?.item_title(item_id))
    }

    pub fn user_ratings(&self, user_id: UserId) -> Result<RatingVector> {
        Ok(self.store.get()?.user_ratings(user_id).clone())
    }

    pub fn store(&self) -> Result<Arc<RatingsStore>> {
        self.store.get()
    }
}

fn respond(
    engine: &RecommendationEngine,
    ratings: &VirtualUserRatings,
    num_recommendations: usize,
) -> RecommendationResponse {
    let outcome = engine.recommend(ratings, num_recommendations);
    let store = engine.store();

    RecommendationResponse {
        recommendations: outcome
            .recommendations
            .into_iter()
            .map(|rec| RecommendationItem {
                item_id: rec.item_id,
                title: store.item_title(rec.item_id),
                predicted_rating: rec.predicted_rating,
            })
            .collect(),
        candidate_count: outcome.candidate_count,
        neighbor_count: outcome.neighbor_count,
        generated_at: Utc::now(),
    }
}
