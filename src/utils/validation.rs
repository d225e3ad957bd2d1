use crate::config::RecommendationConfig;
use crate::error::{Error, Result};
use crate::models::*;
use std::collections::HashSet;

pub fn validate_virtual_ratings(
    ratings: &VirtualUserRatings,
    config: &RecommendationConfig,
) -> Result<()> {
    if ratings.is_empty() {
        return Err(Error::InvalidRatings("at least one rated item is required".to_string()));
    }

    for (&item_id, &rating) in ratings.ratings() {
        if !rating.is_finite() {
            return Err(Error::InvalidRatings(format!(
                "rating for item {} is not a finite number",
                item_id
            )));
        }
        if rating < config.rating_min || rating > config.rating_max {
            return Err(Error::InvalidRatings(format!(
                "rating {} for item {} is outside [{}, {}]",
                rating, item_id, config.rating_min, config.rating_max
            )));
        }
    }

    Ok(())
}

pub fn validate_num_recommendations(
    num_recommendations: usize,
    config: &RecommendationConfig,
) -> Result<()> {
    if num_recommendations == 0 {
        return Err(Error::InvalidRequest(
            "Number of recommendations must be greater than 0".to_string(),
        ));
    }

    if num_recommendations > config.max_request_size {
        return Err(Error::InvalidRequest(format!(
            "Number of recommendations too large (max {})",
            config.max_request_size
        )));
    }

    Ok(())
}

// Returns the effective recommendation count.
pub fn validate_recommendation_request(
    request: &RecommendationRequest,
    config: &RecommendationConfig,
) -> Result<usize> {
    validate_virtual_ratings(&request.ratings, config)?;
    let num_recommendations = request.num_recommendations.unwrap_or(config.num_recommendations);
    validate_num_recommendations(num_recommendations, config)?;
    Ok(num_recommendations)
}

// A ranking names every prompt position exactly once.
pub fn validate_ranking(ranking: &[usize], prompt_size: usize) -> Result<()> {
    let expected = || {
        Error::InvalidRanking(format!(
            "enter every number from 1 to {} exactly once, e.g. 3, 1, 5, 2, 4",
            prompt_size
        ))
    };

    if ranking.len() != prompt_size {
        return Err(expected());
    }

    let mut seen = HashSet::with_capacity(ranking.len());
    for &position in ranking {
        if position == 0 || position > prompt_size || !seen.insert(position) {
            return Err(expected());
        }
    }

    Ok(())
}

pub fn validate_batch_size(batch_size: usize, max_batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(Error::InvalidRequest("Batch cannot be empty".to_string()));
    }

    if batch_size > max_batch_size {
        return Err(Error::InvalidRequest(format!(
            "Batch size too large: {} (max {})",
            batch_size, max_batch_size
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_virtual_ratings() {
        let config = RecommendationConfig::default();

        let valid: VirtualUserRatings = [(50, 5.0), (181, 3.0)].into_iter().collect();
        assert!(validate_virtual_ratings(&valid, &config).is_ok());

        let empty = VirtualUserRatings::default();
        assert!(validate_virtual_ratings(&empty, &config).is_err());

        let out_of_scale: VirtualUserRatings = [(50, 5.5)].into_iter().collect();
        assert!(validate_virtual_ratings(&out_of_scale, &config).is_err());

        let nan: VirtualUserRatings = [(50, f32::NAN)].into_iter().collect();
        assert!(validate_virtual_ratings(&nan, &config).is_err());
    }

    #[test]
    fn test_validate_request_defaults_count() {
        let config = RecommendationConfig::default();
        let ratings: VirtualUserRatings = [(50, 5.0)].into_iter().collect();

        let request = RecommendationRequest::new(ratings.clone());
        assert_eq!(validate_recommendation_request(&request, &config).unwrap(), 5);

        let request = RecommendationRequest::new(ratings.clone()).with_limit(0);
        assert!(validate_recommendation_request(&request, &config).is_err());

        let request = RecommendationRequest::new(ratings).with_limit(1001);
        assert!(validate_recommendation_request(&request, &config).is_err());
    }

    #[test]
    fn test_validate_ranking() {
        assert!(validate_ranking(&[3, 1, 5, 2, 4], 5).is_ok());
        assert!(validate_ranking(&[3, 1, 5, 2], 5).is_err());
        assert!(validate_ranking(&[3, 1, 5, 2, 2], 5).is_err());
        assert!(validate_ranking(&[3, 1, 6, 2, 4], 5).is_err());
        assert!(validate_ranking(&[0, 1, 3, 2, 4], 5).is_err());
    }
}
