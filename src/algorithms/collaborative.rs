use super::similarity::{shared_item_count, CosineSimilarity, SimilarityMeasure};
use super::RecommendationAlgorithm;
use crate::config::RecommendationConfig;
use crate::models::*;
use crate::services::ratings_store::RatingsStore;
use crate::utils::{top_k, weighted_mean};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// User-based collaborative filtering over a shared, read-only ratings store.
pub struct RecommendationEngine<S = CosineSimilarity> {
    store: Arc<RatingsStore>,
    config: RecommendationConfig,
    similarity: S,
}

impl RecommendationEngine<CosineSimilarity> {
    pub fn new(store: Arc<RatingsStore>, config: RecommendationConfig) -> Self {
        Self::with_similarity(store, config, CosineSimilarity)
    }
}

impl<S: SimilarityMeasure> RecommendationEngine<S> {
    pub fn with_similarity(
        store: Arc<RatingsStore>,
        config: RecommendationConfig,
        similarity: S,
    ) -> Self {
        Self {
            store,
            config,
            similarity,
        }
    }

    pub fn config(&self) -> &RecommendationConfig {
        &self.config
    }

    pub fn store(&self) -> &RatingsStore {
        &self.store
    }

    pub fn generate_recommendations(
        &self,
        ratings: &VirtualUserRatings,
        num_recommendations: usize,
    ) -> Vec<Recommendation> {
        self.run(ratings, num_recommendations).recommendations
    }

    pub fn run(
        &self,
        ratings: &VirtualUserRatings,
        num_recommendations: usize,
    ) -> RecommendationOutcome {
        let candidates = self.candidate_pool(ratings);
        let candidate_count = candidates.len();
        debug!("Candidate pool: {} users", candidate_count);

        let neighbors = self.select_neighbors(ratings, &candidates);
        for (rank, neighbor) in neighbors.iter().take(5).enumerate() {
            debug!(
                "Neighbor {}: user {} (similarity {:.3})",
                rank + 1,
                neighbor.user_id,
                neighbor.similarity
            );
        }

        if neighbors.is_empty() {
            info!(
                "No similar users among {} candidates for {} seed items",
                candidate_count,
                ratings.len()
            );
            return RecommendationOutcome {
                candidate_count,
                ..Default::default()
            };
        }

        let contributions = self.collect_contributions(ratings, &neighbors);
        let scored_item_count = contributions.len();
        debug!("Collected neighbor ratings for {} items", scored_item_count);

        let recommendations = self.rank_predictions(&contributions, num_recommendations);
        info!(
            "Generated {} recommendations from {} neighbors ({} candidates)",
            recommendations.len(),
            neighbors.len(),
            candidate_count
        );

        RecommendationOutcome {
            recommendations,
            candidate_count,
            neighbor_count: neighbors.len(),
            scored_item_count,
        }
    }

    // Raters of any seed item, topped up with the most active users when too few.
    pub fn candidate_pool(&self, ratings: &VirtualUserRatings) -> HashSet<UserId> {
        let mut candidates: HashSet<UserId> = ratings
            .items()
            .flat_map(|item_id| self.store.item_raters(item_id).iter().copied())
            .collect();

        if candidates.len() < self.config.min_candidate_pool {
            let fallback = self.store.most_active_users(self.config.fallback_active_users);
            debug!(
                "Only {} candidates, adding {} most active users",
                candidates.len(),
                fallback.len()
            );
            candidates.extend(fallback);
        }

        candidates
    }

    pub fn select_neighbors(
        &self,
        ratings: &VirtualUserRatings,
        candidates: &HashSet<UserId>,
    ) -> Vec<Neighbor> {
        let seed = ratings.ratings();

        let scored: Vec<(UserId, f32)> = candidates
            .iter()
            .filter_map(|&user_id| {
                let vector = self.store.user_ratings(user_id);
                if shared_item_count(seed, vector) < self.config.min_shared_items {
                    return None;
                }
                let similarity = self.similarity.similarity(seed, vector);
                (similarity > self.config.similarity_floor).then_some((user_id, similarity))
            })
            .collect();

        top_k(scored, self.config.max_neighbors)
            .into_iter()
            .map(|(user_id, similarity)| Neighbor { user_id, similarity })
            .collect()
    }

    pub fn collect_contributions(
        &self,
        ratings: &VirtualUserRatings,
        neighbors: &[Neighbor],
    ) -> HashMap<ItemId, Vec<(f32, f32)>> {
        let mut contributions: HashMap<ItemId, Vec<(f32, f32)>> = HashMap::new();

        for neighbor in neighbors {
            for (&item_id, &rating) in self.store.user_ratings(neighbor.user_id) {
                if ratings.contains(item_id) {
                    continue;
                }
                contributions
                    .entry(item_id)
                    .or_default()
                    .push((rating, neighbor.similarity));
            }
        }

        contributions
    }

    pub fn rank_predictions(
        &self,
        contributions: &HashMap<ItemId, Vec<(f32, f32)>>,
        num_recommendations: usize,
    ) -> Vec<Recommendation> {
        let predicted: Vec<(ItemId, f32)> = contributions
            .iter()
            .filter(|(_, scores)| scores.len() >= self.config.min_neighbor_support)
            .filter_map(|(&item_id, scores)| {
                weighted_mean(scores).map(|predicted| {
                    (
                        item_id,
                        predicted.clamp(self.config.rating_min, self.config.rating_max),
                    )
                })
            })
            .collect();

        top_k(predicted, num_recommendations)
            .into_iter()
            .map(|(item_id, predicted_rating)| Recommendation {
                item_id,
                predicted_rating,
            })
            .collect()
    }
}

impl<S: SimilarityMeasure> RecommendationAlgorithm for RecommendationEngine<S> {
    fn recommend(
        &self,
        ratings: &VirtualUserRatings,
        num_recommendations: usize,
    ) -> RecommendationOutcome {
        self.run(ratings, num_recommendations)
    }
}
