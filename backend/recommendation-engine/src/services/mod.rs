pub mod diversity;
pub mod engine;
pub mod enrichment;
pub mod experiments;
pub mod features;
pub mod profile;
pub mod ranking;
pub mod recall;
pub mod segmentation;
pub mod similarity;
pub mod trending;

pub use diversity::DiversitySelector;
pub use engine::{RecommendationEngine, WarmCacheStats};
pub use experiments::ExperimentRegistry;
pub use features::FeatureIndex;
pub use profile::ProfileResolver;
pub use ranking::HybridRanker;
pub use recall::{CandidateSource, ModelScorer, RecallContext};
pub use segmentation::SegmentationService;
pub use trending::TrendingScoreUpdater;
