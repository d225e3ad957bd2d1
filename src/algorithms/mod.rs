pub mod collaborative;
pub mod similarity;

pub use collaborative::RecommendationEngine;
pub use similarity::{cosine_similarity, CosineSimilarity, SimilarityMeasure};

use crate::models::*;

pub trait RecommendationAlgorithm: Send + Sync {
    fn recommend(
        &self,
        ratings: &VirtualUserRatings,
        num_recommendations: usize,
    ) -> RecommendationOutcome;
}
