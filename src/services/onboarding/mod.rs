use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::*;
use crate::services::ratings_store::RatingsStoreHandle;
use crate::utils::validation::validate_ranking;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Builds "rank these popular items" prompts and turns the answers into ratings.
pub struct OnboardingService {
    store: Arc<RatingsStoreHandle>,
    config: Arc<Config>,
}

impl OnboardingService {
    pub fn new(store: Arc<RatingsStoreHandle>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    pub fn ranking_prompt(&self, count: Option<usize>) -> Result<RankingPrompt> {
        self.ranking_prompt_with_rng(count, &mut rand::thread_rng())
    }

    pub fn ranking_prompt_with_rng<R: Rng + ?Sized>(
        &self,
        count: Option<usize>,
        rng: &mut R,
    ) -> Result<RankingPrompt> {
        let count = count.unwrap_or(self.config.onboarding.prompt_size);
        let max_count = self.max_prompt_size();
        if count == 0 || count > max_count {
            return Err(Error::InvalidRequest(format!(
                "prompt size must be in 1..={}",
                max_count
            )));
        }

        let store = self.store.get()?;
        let popular = store.most_rated_items(self.config.onboarding.popular_pool);
        let items = popular
            .choose_multiple(rng, count)
            .enumerate()
            .map(|(index, &(item_id, _))| PromptItem {
                position: index + 1,
                item_id,
                title: store.item_title(item_id),
            })
            .collect();

        Ok(RankingPrompt { items })
    }

    // Largest prompt whose lowest score still sits on the rating scale.
    pub fn max_prompt_size(&self) -> usize {
        let onboarding = &self.config.onboarding;
        let rating_min = self.config.recommendation.rating_min;
        (1..=onboarding.popular_pool)
            .take_while(|&size| onboarding.score_for_position(size - 1) >= rating_min)
            .last()
            .unwrap_or(0)
    }

    pub fn ratings_from_ranking(
        &self,
        prompt: &RankingPrompt,
        ranking: &[usize],
    ) -> Result<VirtualUserRatings> {
        validate_ranking(ranking, prompt.len())?;

        let mut distinct = HashSet::with_capacity(prompt.len());
        if !prompt.items.iter().all(|item| distinct.insert(item.item_id)) {
            return Err(Error::InvalidRanking("prompt lists an item twice".to_string()));
        }

        let ratings: VirtualUserRatings = ranking
            .iter()
            .enumerate()
            .map(|(position, &choice)| {
                let item = &prompt.items[choice - 1];
                let score = self.config.onboarding.score_for_position(position);
                debug!("Ranked '{}' at position {} -> rating {}", item.title, position + 1, score);
                (item.item_id, score)
            })
            .collect();

        Ok(ratings)
    }
}

pub fn parse_ranking(text: &str) -> Result<Vec<usize>> {
    text.split(',')
        .map(|part| {
            part.trim().parse::<usize>().map_err(|_| {
                Error::InvalidRanking(
                    "enter numbers separated by commas, e.g. 3, 1, 5, 2, 4".to_string(),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use crate::services::ratings_store::RatingsStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn service() -> OnboardingService {
        let mut records = Vec::new();
        // Item i is rated by i users, so popularity rises with the id.
        for item_id in 1..=60u32 {
            for user_id in 1..=item_id {
                records.push(RatingRecord::new(user_id, item_id, 4.0, 0));
            }
        }
        let store = RatingsStore::from_records(records, HashMap::new()).unwrap();
        let handle = RatingsStoreHandle::ready(Arc::new(store), DataConfig::new("u.data"));
        OnboardingService::new(Arc::new(handle), Arc::new(Config::default()))
    }

    #[test]
    fn test_parse_ranking() {
        assert_eq!(parse_ranking("3, 1, 5, 2, 4").unwrap(), vec![3, 1, 5, 2, 4]);
        assert_eq!(parse_ranking("2,1").unwrap(), vec![2, 1]);
        assert!(parse_ranking("3, one, 5").is_err());
        assert!(parse_ranking("").is_err());
    }

    #[test]
    fn test_prompt_samples_popular_items() {
        let service = service();
        let mut rng = StdRng::seed_from_u64(7);
        let prompt = service.ranking_prompt_with_rng(None, &mut rng).unwrap();

        assert_eq!(prompt.len(), 5);
        let positions: Vec<usize> = prompt.items.iter().map(|item| item.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4, 5]);
        // The 50 most rated items are 11..=60.
        assert!(prompt.items.iter().all(|item| item.item_id > 10));
        let distinct: HashSet<ItemId> = prompt.items.iter().map(|item| item.item_id).collect();
        assert_eq!(distinct.len(), 5);

        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(service.ranking_prompt_with_rng(None, &mut rng).unwrap(), prompt);
    }

    #[test]
    fn test_prompt_size_bounds() {
        let service = service();
        assert_eq!(service.max_prompt_size(), 9);
        assert!(service.ranking_prompt(Some(0)).is_err());
        assert!(service.ranking_prompt(Some(10)).is_err());
        assert_eq!(service.ranking_prompt(Some(9)).unwrap().len(), 9);
    }

    #[test]
    fn test_ratings_from_ranking() {
        let service = service();
        let prompt = RankingPrompt {
            items: (1..=5)
                .map(|position| PromptItem {
                    position,
                    item_id: 100 + position as ItemId,
                    title: format!("Item {}", 100 + position),
                })
                .collect(),
        };

        let ratings = service.ratings_from_ranking(&prompt, &[3, 1, 5, 2, 4]).unwrap();
        let ratings = ratings.ratings();
        assert_eq!(ratings[&103], 5.0);
        assert_eq!(ratings[&101], 4.5);
        assert_eq!(ratings[&105], 4.0);
        assert_eq!(ratings[&102], 3.5);
        assert_eq!(ratings[&104], 3.0);

        assert!(service.ratings_from_ranking(&prompt, &[1, 1, 2, 3, 4]).is_err());
        assert!(service.ratings_from_ranking(&prompt, &[1, 2, 3]).is_err());
    }
}
