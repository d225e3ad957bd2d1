pub mod onboarding;
pub mod ratings_store;
pub mod recommendation;
pub mod serving;
