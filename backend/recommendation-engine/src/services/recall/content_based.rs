use super::{CandidateSource, RecallContext};
use crate::models::{InteractionAction, Source, SourceCandidate};
use crate::services::features::FeatureIndex;
use crate::services::similarity::{average_vector, cosine_similarity};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Content-based recall: average the feature vectors of the user's liked
/// videos into a profile vector, then score every indexed video against it.
///
/// Returns nothing when no liked video resolves to a feature row; the
/// caller's other sources carry the request in that case.
pub struct ContentBasedSource {
    features: Arc<FeatureIndex>,
    candidate_multiplier: usize,
}

impl ContentBasedSource {
    pub fn new(features: Arc<FeatureIndex>, candidate_multiplier: usize) -> Self {
        Self {
            features,
            candidate_multiplier,
        }
    }
}

#[async_trait]
impl CandidateSource for ContentBasedSource {
    async fn candidates(&self, ctx: &RecallContext<'_>) -> Result<Vec<SourceCandidate>> {
        let liked_vectors: Vec<Vec<f32>> = ctx
            .history
            .iter()
            .filter(|i| i.action == InteractionAction::Like)
            .filter_map(|i| self.features.video(&i.video_id))
            .map(|f| f.vector.clone())
            .collect();

        if liked_vectors.is_empty() {
            debug!(user_id = ctx.user_id, "no liked videos with features");
            return Ok(Vec::new());
        }

        let profile = average_vector(&liked_vectors);
        let snapshot = self.features.snapshot();

        let preferred = &ctx.preferences.categories;
        let mut candidates: Vec<SourceCandidate> = snapshot
            .values()
            .filter(|f| {
                preferred.is_empty()
                    || f.categories.iter().any(|c| preferred.contains(c))
            })
            .map(|f| {
                let similarity = cosine_similarity(&profile, &f.vector);
                SourceCandidate::new(f.video_id.clone(), similarity as f64)
            })
            .collect();

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(ctx.limit * self.candidate_multiplier);

        info!(
            user_id = ctx.user_id,
            liked = liked_vectors.len(),
            candidates = candidates.len(),
            "content-based recall completed"
        );
        Ok(candidates)
    }

    fn source(&self) -> Source {
        Source::Content
    }
}
