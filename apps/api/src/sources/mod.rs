//! Content sources: where source excerpts come from.
//!
//! The pipeline only sees the `ExcerptSource` trait. `RedditSource` is the production
//! implementation; tests substitute scripted sources.

pub mod reddit;

use std::str::FromStr;

use async_trait::async_trait;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::SourceExcerpt;

pub use reddit::RedditSource;

/// Number of excerpts a run weaves together.
pub const EXCERPTS_PER_RUN: usize = 10;
/// Size of the pool drawn from in randomized mode (the listing endpoint caps at 100).
pub const RANDOMIZED_POOL_SIZE: usize = 100;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Source responded with status {0}")]
    Status(u16),

    #[error("Invalid payload from source: {0}")]
    InvalidPayload(String),
}

/// How the excerpts for a run are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// The first ten items the source ranks highest.
    #[serde(alias = "hot")]
    Curated,
    /// Ten items sampled uniformly from a larger pool.
    #[serde(alias = "random")]
    Randomized,
}

impl FetchMode {
    /// How many items to request from the source for this mode.
    pub fn pool_size(self) -> usize {
        match self {
            FetchMode::Curated => EXCERPTS_PER_RUN,
            FetchMode::Randomized => RANDOMIZED_POOL_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown mode '{0}'; expected 'curated' or 'randomized'")]
pub struct UnknownFetchMode(pub String);

impl FromStr for FetchMode {
    type Err = UnknownFetchMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "curated" | "hot" => Ok(FetchMode::Curated),
            "randomized" | "random" => Ok(FetchMode::Randomized),
            other => Err(UnknownFetchMode(other.to_string())),
        }
    }
}

#[async_trait]
pub trait ExcerptSource: Send + Sync {
    /// Returns at most `count` excerpts in the source's own order.
    async fn fetch(&self, count: usize) -> Result<Vec<SourceExcerpt>, SourceError>;
}

/// Narrows a fetched pool to the excerpts used by a run.
///
/// Curated keeps the source order. Randomized shuffles the whole pool and keeps the
/// first `EXCERPTS_PER_RUN`, which is uniform sampling without replacement.
pub fn select_excerpts<R: Rng + ?Sized>(
    mut pool: Vec<SourceExcerpt>,
    mode: FetchMode,
    rng: &mut R,
) -> Vec<SourceExcerpt> {
    if mode == FetchMode::Randomized {
        pool.shuffle(rng);
    }
    pool.truncate(EXCERPTS_PER_RUN);
    pool
}
