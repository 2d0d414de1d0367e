use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub hybrid: HybridWeights,
    pub recall: RecallConfig,
    pub diversity: DiversityConfig,
    pub jobs: JobsConfig,
    pub cache: CacheConfig,
}

/// Source fusion weights for the hybrid scorer.
#[derive(Debug, Clone, Deserialize)]
pub struct HybridWeights {
    pub collaborative: f64,
    pub content: f64,
    pub trending: f64,
    /// Only applied when a model scorer is plugged in.
    pub model: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            collaborative: 0.6,
            content: 0.3,
            trending: 0.1,
            model: 0.2,
        }
    }
}

impl HybridWeights {
    pub fn balanced() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecallConfig {
    /// Candidates requested per source = response limit x this multiplier.
    pub candidate_multiplier: usize,
    pub similar_user_limit: usize,
    pub similar_user_sample_size: usize,
    pub min_user_similarity: f64,
    pub similar_video_threshold: f32,
    pub history_limit: usize,
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            candidate_multiplier: 3,
            similar_user_limit: 50,
            similar_user_sample_size: 1000,
            min_user_similarity: 0.5,
            similar_video_threshold: 0.7,
            history_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiversityConfig {
    pub max_per_category: usize,
    pub max_per_creator: usize,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            max_per_category: 3,
            max_per_creator: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    pub feature_refresh_secs: u64,
    pub trending_update_secs: u64,
    pub segment_update_secs: u64,
    pub cache_warm_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            feature_refresh_secs: 900,
            trending_update_secs: 3600,
            segment_update_secs: 21600,
            cache_warm_secs: 1800,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub recommendation_ttl_secs: u64,
    pub warm_user_limit: usize,
    pub warm_recommendation_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            recommendation_ttl_secs: 180,
            warm_user_limit: 100,
            warm_recommendation_count: 50,
        }
    }
}

impl Config {
    pub fn from_env() -> crate::error::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            hybrid: HybridWeights {
                collaborative: env::var("HYBRID_COLLABORATIVE_WEIGHT")
                    .unwrap_or_else(|_| "0.6".to_string())
                    .parse()
                    .expect("HYBRID_COLLABORATIVE_WEIGHT must be a valid f64"),
                content: env::var("HYBRID_CONTENT_WEIGHT")
                    .unwrap_or_else(|_| "0.3".to_string())
                    .parse()
                    .expect("HYBRID_CONTENT_WEIGHT must be a valid f64"),
                trending: env::var("HYBRID_TRENDING_WEIGHT")
                    .unwrap_or_else(|_| "0.1".to_string())
                    .parse()
                    .expect("HYBRID_TRENDING_WEIGHT must be a valid f64"),
                model: env::var("HYBRID_MODEL_WEIGHT")
                    .unwrap_or_else(|_| "0.2".to_string())
                    .parse()
                    .expect("HYBRID_MODEL_WEIGHT must be a valid f64"),
            },
            recall: RecallConfig {
                candidate_multiplier: env::var("RECALL_CANDIDATE_MULTIPLIER")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .expect("RECALL_CANDIDATE_MULTIPLIER must be a valid usize"),
                similar_user_limit: env::var("SIMILAR_USER_LIMIT")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()
                    .expect("SIMILAR_USER_LIMIT must be a valid usize"),
                similar_user_sample_size: env::var("SIMILAR_USER_SAMPLE_SIZE")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .expect("SIMILAR_USER_SAMPLE_SIZE must be a valid usize"),
                min_user_similarity: env::var("MIN_USER_SIMILARITY")
                    .unwrap_or_else(|_| "0.5".to_string())
                    .parse()
                    .expect("MIN_USER_SIMILARITY must be a valid f64"),
                similar_video_threshold: env::var("SIMILAR_VIDEO_THRESHOLD")
                    .unwrap_or_else(|_| "0.7".to_string())
                    .parse()
                    .expect("SIMILAR_VIDEO_THRESHOLD must be a valid f32"),
                history_limit: env::var("HISTORY_LIMIT")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .expect("HISTORY_LIMIT must be a valid usize"),
            },
            diversity: DiversityConfig {
                max_per_category: env::var("DIVERSITY_MAX_PER_CATEGORY")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .expect("DIVERSITY_MAX_PER_CATEGORY must be a valid usize"),
                max_per_creator: env::var("DIVERSITY_MAX_PER_CREATOR")
                    .unwrap_or_else(|_| "2".to_string())
                    .parse()
                    .expect("DIVERSITY_MAX_PER_CREATOR must be a valid usize"),
            },
            jobs: JobsConfig {
                feature_refresh_secs: env::var("FEATURE_REFRESH_SECS")
                    .unwrap_or_else(|_| "900".to_string())
                    .parse()
                    .expect("FEATURE_REFRESH_SECS must be a valid u64"),
                trending_update_secs: env::var("TRENDING_UPDATE_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .expect("TRENDING_UPDATE_SECS must be a valid u64"),
                segment_update_secs: env::var("SEGMENT_UPDATE_SECS")
                    .unwrap_or_else(|_| "21600".to_string())
                    .parse()
                    .expect("SEGMENT_UPDATE_SECS must be a valid u64"),
                cache_warm_secs: env::var("CACHE_WARM_SECS")
                    .unwrap_or_else(|_| "1800".to_string())
                    .parse()
                    .expect("CACHE_WARM_SECS must be a valid u64"),
            },
            cache: CacheConfig {
                recommendation_ttl_secs: env::var("RECOMMENDATION_CACHE_TTL_SECS")
                    .unwrap_or_else(|_| "180".to_string())
                    .parse()
                    .expect("RECOMMENDATION_CACHE_TTL_SECS must be a valid u64"),
                warm_user_limit: env::var("WARM_CACHE_USER_LIMIT")
                    .unwrap_or_else(|_| "100".to_string())
                    .parse()
                    .expect("WARM_CACHE_USER_LIMIT must be a valid usize"),
                warm_recommendation_count: env::var("WARM_CACHE_RECOMMENDATION_COUNT")
                    .unwrap_or_else(|_| "50".to_string())
                    .parse()
                    .expect("WARM_CACHE_RECOMMENDATION_COUNT must be a valid usize"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let weights = HybridWeights::balanced();
        assert_eq!(weights.collaborative, 0.6);
        assert_eq!(weights.content, 0.3);
        assert_eq!(weights.trending, 0.1);
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.recall.candidate_multiplier, 3);
        assert_eq!(config.diversity.max_per_category, 3);
        assert_eq!(config.diversity.max_per_creator, 2);
        assert_eq!(config.cache.recommendation_ttl_secs, 180);
        assert_eq!(config.jobs.trending_update_secs, 3600);
    }
}
