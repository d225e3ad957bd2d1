use std::path::PathBuf;
use thiserror::Error;

use crate::models::{ItemId, UserId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read ratings source {path}: {source}")]
    RatingsSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed rating record at line {line}: {reason}")]
    MalformedRating { line: usize, reason: String },

    #[error("Duplicate rating for user {user_id} and item {item_id} (record {record})")]
    DuplicateRating {
        record: usize,
        user_id: UserId,
        item_id: ItemId,
    },

    #[error("Ratings source contains no records")]
    EmptyCorpus,

    #[error("Malformed title record at line {line}: {reason}")]
    MalformedTitle { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ratings corpus is not loaded yet")]
    NotReady,

    #[error("Invalid ratings: {0}")]
    InvalidRatings(String),

    #[error("Invalid ranking: {0}")]
    InvalidRanking(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Worker task failed: {0}")]
    Worker(String),
}

impl Error {
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidRatings(_) | Error::InvalidRanking(_) | Error::InvalidRequest(_)
        )
    }
}
