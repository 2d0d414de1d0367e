//! Join selected candidates with full video records and attach a
//! human-readable reason.

use crate::models::{Recommendation, ScoredCandidate, Source, VideoRecord, VideoSummary};
use crate::storage::ContentStore;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

pub struct Enricher {
    store: Arc<dyn ContentStore>,
}

impl Enricher {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Resolve full records for the selected candidates. Candidates whose
    /// record is missing from the store are dropped.
    pub async fn enrich(&self, candidates: &[ScoredCandidate]) -> Result<Vec<Recommendation>> {
        let ids: Vec<String> = candidates
            .iter()
            .map(|c| c.candidate.video_id.clone())
            .collect();
        let videos = self.store.videos_by_ids(&ids).await?;
        let by_id: HashMap<&str, &VideoRecord> =
            videos.iter().map(|v| (v.video_id.as_str(), v)).collect();

        let enriched: Vec<Recommendation> = candidates
            .iter()
            .filter_map(|c| {
                by_id
                    .get(c.candidate.video_id.as_str())
                    .map(|video| Recommendation {
                        video_id: c.candidate.video_id.clone(),
                        score: c.final_score,
                        sources: c.candidate.sources.clone(),
                        video: VideoSummary::from(*video),
                        reason: reason_for(&c.candidate.sources),
                    })
            })
            .collect();

        if enriched.len() < candidates.len() {
            debug!(
                requested = candidates.len(),
                enriched = enriched.len(),
                "dropped candidates with missing video records"
            );
        }
        Ok(enriched)
    }
}

/// Reason shown alongside a recommendation, picked from the first matching
/// source tag.
pub fn reason_for(sources: &[Source]) -> String {
    let reason = if sources.contains(&Source::Collaborative) {
        "Users like you enjoyed this"
    } else if sources.contains(&Source::Content) {
        "Similar to videos you like"
    } else if sources.contains(&Source::Trending) {
        "Trending now"
    } else {
        "Recommended for you"
    };
    reason.to_string()
}
