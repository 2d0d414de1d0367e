pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, Result};
pub use jobs::JobScheduler;
pub use services::{DiversitySelector, FeatureIndex, HybridRanker, RecommendationEngine};
pub use storage::{ContentStore, MemoryCache, MemoryStore, RecommendationCache, RedisCache};
