use crate::error::Result;
use crate::models::*;
use crate::services::onboarding::{parse_ranking, OnboardingService};
use crate::services::recommendation::RecommendationService;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServingStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub empty_results: u64,
    pub batch_requests: u64,
    pub avg_latency_ms: u64,
    pub max_latency_ms: u64,
}

pub struct ServingService {
    recommendation_service: Arc<RecommendationService>,
    onboarding_service: Arc<OnboardingService>,
    serving_stats: DashMap<&'static str, u64>,
}

impl ServingService {
    pub fn new(
        recommendation_service: Arc<RecommendationService>,
        onboarding_service: Arc<OnboardingService>,
    ) -> Self {
        Self {
            recommendation_service,
            onboarding_service,
            serving_stats: DashMap::new(),
        }
    }

    pub async fn serve_recommendations(
        &self,
        request: RecommendationRequest,
    ) -> Result<RecommendationResponse> {
        self.increment_stat("total_requests");
        let start_time = Instant::now();

        let result = self.recommendation_service.get_recommendations(request).await;
        self.record_latency(start_time.elapsed().as_millis() as u64);

        match &result {
            Ok(response) => {
                self.increment_stat("successful_requests");
                if response.is_empty() {
                    self.increment_stat("empty_results");
                }
                info!(
                    "Served {} recommendations from {} neighbors",
                    response.recommendations.len(),
                    response.neighbor_count
                );
            }
            Err(e) => {
                self.increment_stat("failed_requests");
                error!("Failed to get recommendations: {}", e);
            }
        }

        result
    }

    pub async fn serve_ranking(&self, request: RankingRequest) -> Result<RecommendationResponse> {
        let ranking = parse_ranking(&request.ranking);
        let ratings = ranking.and_then(|ranking| {
            self.onboarding_service
                .ratings_from_ranking(&request.prompt, &ranking)
        });

        match ratings {
            Ok(ratings) => {
                let mut recommendation = RecommendationRequest::new(ratings);
                recommendation.num_recommendations = request.num_recommendations;
                self.serve_recommendations(recommendation).await
            }
            Err(e) => {
                self.increment_stat("total_requests");
                self.increment_stat("failed_requests");
                Err(e)
            }
        }
    }

    pub async fn serve_batch(
        &self,
        requests: Vec<RecommendationRequest>,
    ) -> Result<Vec<Result<RecommendationResponse>>> {
        self.increment_stat("batch_requests");
        let start_time = Instant::now();

        let batch = self
            .recommendation_service
            .get_batch_recommendations(requests)
            .await;
        let responses = match batch {
            Ok(responses) => responses,
            Err(e) => {
                self.increment_stat("total_requests");
                self.increment_stat("failed_requests");
                error!("Failed to serve batch: {}", e);
                return Err(e);
            }
        };

        for response in &responses {
            self.increment_stat("total_requests");
            match response {
                Ok(response) => {
                    self.increment_stat("successful_requests");
                    if response.is_empty() {
                        self.increment_stat("empty_results");
                    }
                }
                Err(_) => self.increment_stat("failed_requests"),
            }
        }

        let total_latency = start_time.elapsed().as_millis() as u64;
        info!("Batch served {} requests in {}ms", responses.len(), total_latency);
        Ok(responses)
    }

    pub fn stats(&self) -> ServingStats {
        let get = |key: &str| self.serving_stats.get(key).map(|v| *v).unwrap_or(0);
        let total_latency = get("total_latency_ms");
        let timed_requests = get("timed_requests");

        ServingStats {
            total_requests: get("total_requests"),
            successful_requests: get("successful_requests"),
            failed_requests: get("failed_requests"),
            empty_results: get("empty_results"),
            batch_requests: get("batch_requests"),
            avg_latency_ms: if timed_requests > 0 { total_latency / timed_requests } else { 0 },
            max_latency_ms: get("max_latency_ms"),
        }
    }

    fn increment_stat(&self, key: &'static str) {
        *self.serving_stats.entry(key).or_insert(0) += 1;
    }

    fn record_latency(&self, latency_ms: u64) {
        *self.serving_stats.entry("total_latency_ms").or_insert(0) += latency_ms;
        self.increment_stat("timed_requests");

        let mut max = self.serving_stats.entry("max_latency_ms").or_insert(0);
        if latency_ms > *max {
            *max = latency_ms;
        }
    }
}
