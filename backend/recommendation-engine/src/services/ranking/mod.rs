//! Hybrid scoring: fuse per-source scores with configured weights, then
//! apply segment and recency boosts.

use crate::config::HybridWeights;
use crate::models::{Candidate, ScoredCandidate, Segment, Source, VideoFeatures};
use crate::services::features::FeatureIndex;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

/// Trending contributions are normalized against this ceiling before
/// weighting.
const TRENDING_NORMALIZATION: f64 = 100.0;

/// Predicate thresholds for segment boosts.
const TRENDING_BOOST_FLOOR: f64 = 50.0;
const FRESH_AGE_DAYS: f64 = 2.0;
const NICHE_VIEW_CEILING: u64 = 10_000;
const POPULAR_VIEW_FLOOR: u64 = 100_000;

/// Half-life of the recency boost, in days.
const RECENCY_HALF_LIFE_DAYS: f64 = 7.0;

pub struct HybridRanker {
    weights: HybridWeights,
    features: Arc<FeatureIndex>,
}

impl HybridRanker {
    pub fn new(weights: HybridWeights, features: Arc<FeatureIndex>) -> Self {
        Self { weights, features }
    }

    /// Score and sort merged candidates, descending. Attaches each
    /// candidate's feature row for the downstream diversity pass.
    pub fn score(&self, candidates: Vec<Candidate>, segment: Option<Segment>) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|candidate| {
                let features = self.features.video(&candidate.video_id);
                let final_score = self.final_score(&candidate, segment, features.as_deref());
                ScoredCandidate {
                    candidate,
                    final_score,
                    features,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(Ordering::Equal)
        });

        debug!(
            candidates = scored.len(),
            top_score = scored.first().map(|c| c.final_score),
            "hybrid scoring completed"
        );
        scored
    }

    fn final_score(
        &self,
        candidate: &Candidate,
        segment: Option<Segment>,
        features: Option<&VideoFeatures>,
    ) -> f64 {
        let mut score = 0.0;

        if let Some(s) = candidate.scores.get(&Source::Collaborative) {
            score += s * self.weights.collaborative;
        }
        if let Some(s) = candidate.scores.get(&Source::Content) {
            score += s * self.weights.content;
        }
        if let Some(s) = candidate.scores.get(&Source::Trending) {
            score += (s / TRENDING_NORMALIZATION).min(1.0) * self.weights.trending;
        }
        if let Some(s) = candidate.scores.get(&Source::Model) {
            score += s * self.weights.model;
        }

        if let Some(segment) = segment {
            score *= segment_boost(segment, candidate, features);
        }

        score * recency_boost(features.map(|f| f.age_in_days))
    }
}

/// `0.5^(age/7) + 0.5`: 1.5 for brand-new content, ~1.0 at one week,
/// asymptotically 0.5. Candidates without features are left untouched.
pub fn recency_boost(age_in_days: Option<f64>) -> f64 {
    match age_in_days {
        Some(age) => 0.5f64.powf(age / RECENCY_HALF_LIFE_DAYS) + 0.5,
        None => 1.0,
    }
}

#[derive(Debug, Clone, Copy)]
enum BoostRule {
    Trending,
    Fresh,
    Niche,
    Popular,
    Category(&'static str),
}

impl BoostRule {
    fn matches(&self, candidate: &Candidate, features: &VideoFeatures) -> bool {
        match self {
            BoostRule::Trending => candidate
                .scores
                .get(&Source::Trending)
                .map_or(false, |&s| s > TRENDING_BOOST_FLOOR),
            BoostRule::Fresh => features.age_in_days < FRESH_AGE_DAYS,
            BoostRule::Niche => features.view_count < NICHE_VIEW_CEILING,
            BoostRule::Popular => features.view_count > POPULAR_VIEW_FLOOR,
            BoostRule::Category(name) => features.categories.iter().any(|c| c == name),
        }
    }
}

/// Multiplicative boost from the segment lookup table. Candidates without
/// features match no predicate and keep multiplier 1.
pub fn segment_boost(
    segment: Segment,
    candidate: &Candidate,
    features: Option<&VideoFeatures>,
) -> f64 {
    let Some(features) = features else {
        return 1.0;
    };

    let rules: &[(BoostRule, f64)] = match segment {
        Segment::PowerUser => &[
            (BoostRule::Trending, 0.8),
            (BoostRule::Fresh, 1.2),
            (BoostRule::Niche, 1.1),
        ],
        Segment::Casual => &[
            (BoostRule::Trending, 1.2),
            (BoostRule::Fresh, 0.9),
            (BoostRule::Popular, 1.1),
        ],
        Segment::Creator => &[
            (BoostRule::Category("tools"), 1.3),
            (BoostRule::Category("educational"), 1.2),
            (BoostRule::Trending, 0.9),
        ],
        Segment::Regular => &[],
    };

    let mut boost = 1.0;
    for (rule, multiplier) in rules {
        if rule.matches(candidate, features) {
            boost *= multiplier;
        }
    }
    boost
}
