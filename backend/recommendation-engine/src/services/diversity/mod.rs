//! Final-list selection under per-category and per-creator caps.

use crate::config::DiversityConfig;
use crate::models::ScoredCandidate;
use std::collections::HashMap;
use tracing::debug;

pub struct DiversitySelector {
    max_per_category: usize,
    max_per_creator: usize,
}

impl DiversitySelector {
    pub fn new(config: &DiversityConfig) -> Self {
        Self {
            max_per_category: config.max_per_category,
            max_per_creator: config.max_per_creator,
        }
    }

    /// Greedy walk of the score-sorted candidates. Candidates without a
    /// resolved feature row are dropped outright: the caps key off category
    /// and creator, which only the feature row provides.
    ///
    /// A candidate skipped by the caps is not retried in the constrained
    /// pass; if the caps starve the list below `limit`, the skipped
    /// candidates backfill in score order with the caps ignored.
    pub fn select(&self, candidates: Vec<ScoredCandidate>, limit: usize) -> Vec<ScoredCandidate> {
        let total = candidates.len();
        let mut slots: Vec<Option<ScoredCandidate>> = candidates
            .into_iter()
            .map(|c| c.features.is_some().then_some(c))
            .collect();

        let mut category_counts: HashMap<String, usize> = HashMap::new();
        let mut creator_counts: HashMap<String, usize> = HashMap::new();
        let mut selected: Vec<usize> = Vec::new();
        let mut picked = vec![false; slots.len()];

        for index in 0..slots.len() {
            if selected.len() >= limit {
                break;
            }
            let Some(candidate) = &slots[index] else {
                continue;
            };
            let Some(features) = &candidate.features else {
                continue;
            };

            let category_count = category_counts
                .get(&features.primary_category)
                .copied()
                .unwrap_or(0);
            let creator_count = creator_counts.get(&features.creator_id).copied().unwrap_or(0);

            if category_count < self.max_per_category && creator_count < self.max_per_creator {
                *category_counts
                    .entry(features.primary_category.clone())
                    .or_insert(0) += 1;
                *creator_counts.entry(features.creator_id.clone()).or_insert(0) += 1;
                picked[index] = true;
                selected.push(index);
            }
        }

        // Backfill from the skipped candidates, caps ignored.
        if selected.len() < limit {
            for index in 0..slots.len() {
                if selected.len() >= limit {
                    break;
                }
                if !picked[index] && slots[index].is_some() {
                    picked[index] = true;
                    selected.push(index);
                }
            }
        }

        debug!(
            candidates = total,
            selected = selected.len(),
            limit, "diversity selection completed"
        );

        selected
            .into_iter()
            .filter_map(|index| slots[index].take())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candidate, VideoFeatures};
    use std::sync::Arc;

    fn scored(id: &str, score: f64, category: &str, creator: &str) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate::new(id),
            final_score: score,
            features: Some(Arc::new(VideoFeatures {
                video_id: id.to_string(),
                vector: vec![0.0],
                categories: vec![category.to_string()],
                primary_category: category.to_string(),
                creator_id: creator.to_string(),
                age_in_days: 1.0,
                view_count: 100,
            })),
        }
    }

    fn featureless(id: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate::new(id),
            final_score: score,
            features: None,
        }
    }

    fn selector() -> DiversitySelector {
        DiversitySelector::new(&DiversityConfig::default())
    }

    #[test]
    fn test_category_cap_enforced() {
        let candidates: Vec<ScoredCandidate> = (0..6)
            .map(|i| {
                scored(
                    &format!("m{}", i),
                    1.0 - i as f64 * 0.1,
                    "music",
                    &format!("c{}", i),
                )
            })
            .chain(std::iter::once(scored("g0", 0.1, "gaming", "c9")))
            .collect();

        // Plenty of candidates: the cap holds and gaming fills slot 4.
        let selected = selector().select(candidates, 4);
        assert_eq!(selected.len(), 4);
        let music = selected
            .iter()
            .filter(|c| c.features.as_ref().unwrap().primary_category == "music")
            .count();
        assert_eq!(music, 3);
        assert_eq!(selected[3].candidate.video_id, "g0");
    }

    #[test]
    fn test_creator_cap_enforced() {
        let candidates = vec![
            scored("a", 1.0, "music", "c1"),
            scored("b", 0.9, "gaming", "c1"),
            scored("c", 0.8, "comedy", "c1"),
            scored("d", 0.7, "news", "c2"),
        ];

        let selected = selector().select(candidates, 3);
        let ids: Vec<&str> = selected.iter().map(|c| c.candidate.video_id.as_str()).collect();
        // Third video from c1 is skipped in favor of c2.
        assert_eq!(ids, vec!["a", "b", "d"]);
    }

    #[test]
    fn test_backfill_when_constraints_starve() {
        // Only one creator: the constrained pass stops at 2, backfill
        // ignores the cap to reach the limit.
        let candidates = vec![
            scored("a", 1.0, "music", "c1"),
            scored("b", 0.9, "music", "c1"),
            scored("c", 0.8, "music", "c1"),
            scored("d", 0.7, "music", "c1"),
        ];

        let selected = selector().select(candidates, 4);
        let ids: Vec<&str> = selected.iter().map(|c| c.candidate.video_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_backfill_keeps_score_order() {
        let candidates = vec![
            scored("a", 1.0, "music", "c1"),
            scored("b", 0.9, "music", "c1"),
            scored("c", 0.8, "music", "c1"),
            scored("d", 0.7, "gaming", "c2"),
        ];

        let selected = selector().select(candidates, 4);
        let ids: Vec<&str> = selected.iter().map(|c| c.candidate.video_id.as_str()).collect();
        // Constrained pass: a, b (creator cap), d. Backfill: c.
        assert_eq!(ids, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_featureless_candidates_dropped() {
        let candidates = vec![
            featureless("ghost", 2.0),
            scored("a", 1.0, "music", "c1"),
        ];

        let selected = selector().select(candidates, 5);
        let ids: Vec<&str> = selected.iter().map(|c| c.candidate.video_id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_limit_respected() {
        let candidates: Vec<ScoredCandidate> = (0..20)
            .map(|i| scored(&format!("v{}", i), 1.0, &format!("cat{}", i), &format!("c{}", i)))
            .collect();

        assert_eq!(selector().select(candidates, 7).len(), 7);
    }

    #[test]
    fn test_empty_input() {
        assert!(selector().select(Vec::new(), 10).is_empty());
    }
}
