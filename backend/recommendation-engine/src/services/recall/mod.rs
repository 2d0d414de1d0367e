//! Candidate generation: independent sources producing `(video, score)`
//! pairs, run concurrently and merged into per-video candidates.

mod collaborative;
mod content_based;
mod model;
mod trending;

pub use collaborative::CollaborativeSource;
pub use content_based::ContentBasedSource;
pub use model::{EngagementModelScorer, ModelScorer, ModelSource};
pub use trending::TrendingSource;

use crate::models::{Candidate, Interaction, Source, SourceCandidate, UserPreferences};
use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-request inputs shared by all candidate sources.
pub struct RecallContext<'a> {
    pub user_id: &'a str,
    /// Recent interactions, newest first.
    pub history: &'a [Interaction],
    pub preferences: &'a UserPreferences,
    /// Requested response size; sources oversample from it as needed.
    pub limit: usize,
}

#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn candidates(&self, ctx: &RecallContext<'_>) -> Result<Vec<SourceCandidate>>;
    fn source(&self) -> Source;
}

/// Run every source concurrently. A failing source contributes nothing and
/// never aborts the request.
pub async fn gather_candidates(
    sources: &[Arc<dyn CandidateSource>],
    ctx: &RecallContext<'_>,
) -> Vec<(Source, Vec<SourceCandidate>)> {
    let futures = sources.iter().map(|source| async move {
        let tag = source.source();
        match source.candidates(ctx).await {
            Ok(candidates) => (tag, candidates),
            Err(e) => {
                warn!(
                    source = tag.as_str(),
                    user_id = ctx.user_id,
                    error = %e,
                    "candidate source failed"
                );
                (tag, Vec::new())
            }
        }
    });

    let outputs = join_all(futures).await;

    let total: usize = outputs.iter().map(|(_, c)| c.len()).sum();
    info!(
        user_id = ctx.user_id,
        sources = outputs.len(),
        total_candidates = total,
        "candidate generation completed"
    );

    outputs
}

/// Keyed merge: one `Candidate` per video, carrying each source's score and
/// the ordered list of contributing sources. First-seen order is preserved.
pub fn merge_candidates(outputs: Vec<(Source, Vec<SourceCandidate>)>) -> Vec<Candidate> {
    let mut order: Vec<String> = Vec::new();
    let mut merged: HashMap<String, Candidate> = HashMap::new();

    for (source, candidates) in outputs {
        for sc in candidates {
            let entry = merged.entry(sc.video_id.clone()).or_insert_with(|| {
                order.push(sc.video_id.clone());
                Candidate::new(sc.video_id.clone())
            });
            entry.scores.insert(source, sc.score);
            if !entry.sources.contains(&source) {
                entry.sources.push(source);
            }
            entry.supporters.extend(sc.supporters);
        }
    }

    order
        .into_iter()
        .filter_map(|video_id| merged.remove(&video_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keyed_by_video() {
        let outputs = vec![
            (
                Source::Collaborative,
                vec![
                    SourceCandidate::new("v1", 0.8),
                    SourceCandidate::new("v2", 0.4),
                ],
            ),
            (
                Source::Content,
                vec![
                    SourceCandidate::new("v1", 0.6),
                    SourceCandidate::new("v3", 0.5),
                ],
            ),
        ];

        let merged = merge_candidates(outputs);
        assert_eq!(merged.len(), 3);

        let v1 = &merged[0];
        assert_eq!(v1.video_id, "v1");
        assert_eq!(v1.scores[&Source::Collaborative], 0.8);
        assert_eq!(v1.scores[&Source::Content], 0.6);
        assert_eq!(v1.sources, vec![Source::Collaborative, Source::Content]);

        let v2 = &merged[1];
        assert_eq!(v2.video_id, "v2");
        assert_eq!(v2.sources, vec![Source::Collaborative]);
    }

    #[test]
    fn test_merge_preserves_first_seen_order() {
        let outputs = vec![
            (Source::Trending, vec![SourceCandidate::new("b", 1.0)]),
            (Source::Content, vec![SourceCandidate::new("a", 1.0)]),
        ];
        let merged = merge_candidates(outputs);
        let ids: Vec<&str> = merged.iter().map(|c| c.video_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    struct FailingSource;

    #[async_trait]
    impl CandidateSource for FailingSource {
        async fn candidates(&self, _ctx: &RecallContext<'_>) -> Result<Vec<SourceCandidate>> {
            anyhow::bail!("backing service unavailable")
        }

        fn source(&self) -> Source {
            Source::Collaborative
        }
    }

    struct FixedSource(Vec<SourceCandidate>);

    #[async_trait]
    impl CandidateSource for FixedSource {
        async fn candidates(&self, _ctx: &RecallContext<'_>) -> Result<Vec<SourceCandidate>> {
            Ok(self.0.clone())
        }

        fn source(&self) -> Source {
            Source::Trending
        }
    }

    #[tokio::test]
    async fn test_failing_source_contributes_nothing() {
        let sources: Vec<Arc<dyn CandidateSource>> = vec![
            Arc::new(FailingSource),
            Arc::new(FixedSource(vec![SourceCandidate::new("v1", 1.0)])),
        ];

        let preferences = UserPreferences {
            user_id: "u1".to_string(),
            categories: Vec::new(),
            hashtags: Vec::new(),
            favorite_creators: Vec::new(),
            avg_duration: 30.0,
        };
        let ctx = RecallContext {
            user_id: "u1",
            history: &[],
            preferences: &preferences,
            limit: 10,
        };

        let outputs = gather_candidates(&sources, &ctx).await;
        assert_eq!(outputs.len(), 2);
        assert!(outputs[0].1.is_empty());
        assert_eq!(outputs[1].1.len(), 1);
    }
}
