//! Deterministic hash-bucket A/B variant assignment.
//!
//! Assignment is a pure function of `(user_id, experiment)`: nothing is
//! stored, and the same inputs yield the same variant on every call.

use crate::services::similarity::hash_bucket;
use std::collections::HashMap;

const BUCKETS: u32 = 100;
const CONTROL: &str = "control";

#[derive(Debug, Clone)]
pub struct ExperimentVariant {
    pub name: String,
    /// Percent of the bucket space, all variants summing to 100.
    pub allocation: u32,
}

#[derive(Debug, Clone)]
pub struct Experiment {
    pub name: String,
    pub variants: Vec<ExperimentVariant>,
}

impl Experiment {
    pub fn new(name: &str, variants: &[(&str, u32)]) -> Self {
        Self {
            name: name.to_string(),
            variants: variants
                .iter()
                .map(|(name, allocation)| ExperimentVariant {
                    name: name.to_string(),
                    allocation: *allocation,
                })
                .collect(),
        }
    }
}

pub struct ExperimentRegistry {
    experiments: HashMap<String, Experiment>,
}

impl Default for ExperimentRegistry {
    fn default() -> Self {
        let mut registry = Self {
            experiments: HashMap::new(),
        };
        registry.register(Experiment::new(
            "recommendation_algorithm",
            &[(CONTROL, 50), ("ml_enhanced", 50)],
        ));
        registry.register(Experiment::new(
            "diversity_level",
            &[("low", 33), ("medium", 34), ("high", 33)],
        ));
        registry
    }
}

impl ExperimentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, experiment: Experiment) {
        self.experiments
            .insert(experiment.name.clone(), experiment);
    }

    /// Assign a variant by hashing the user into one of 100 buckets and
    /// walking the allocation list. Unknown experiments get "control".
    pub fn variant(&self, user_id: &str, experiment: &str) -> String {
        let Some(config) = self.experiments.get(experiment) else {
            return CONTROL.to_string();
        };

        let bucket = hash_bucket(&format!("{}-{}", user_id, experiment), BUCKETS);

        let mut cumulative = 0;
        for variant in &config.variants {
            cumulative += variant.allocation;
            if bucket < cumulative {
                return variant.name.clone();
            }
        }

        CONTROL.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignment_is_deterministic() {
        let registry = ExperimentRegistry::new();
        let first = registry.variant("u1", "recommendation_algorithm");
        let second = registry.variant("u1", "recommendation_algorithm");
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_experiment_is_control() {
        let registry = ExperimentRegistry::new();
        assert_eq!(registry.variant("u1", "does_not_exist"), "control");
    }

    #[test]
    fn test_allocation_split_within_tolerance() {
        let registry = ExperimentRegistry::new();

        let mut control = 0u32;
        let mut enhanced = 0u32;
        for i in 0..10_000 {
            match registry
                .variant(&format!("user{}", i), "recommendation_algorithm")
                .as_str()
            {
                "control" => control += 1,
                "ml_enhanced" => enhanced += 1,
                other => panic!("unexpected variant {}", other),
            }
        }

        // 50/50 configured; allow +-5%.
        let control_share = control as f64 / 10_000.0;
        assert!(
            (control_share - 0.5).abs() < 0.05,
            "control share {} out of tolerance",
            control_share
        );
        assert_eq!(control + enhanced, 10_000);
    }

    #[test]
    fn test_three_way_experiment_covers_all_variants() {
        let registry = ExperimentRegistry::new();

        let mut seen = std::collections::HashSet::new();
        for i in 0..1000 {
            seen.insert(registry.variant(&format!("user{}", i), "diversity_level"));
        }
        assert!(seen.contains("low"));
        assert!(seen.contains("medium"));
        assert!(seen.contains("high"));
    }

    #[test]
    fn test_custom_experiment_registration() {
        let mut registry = ExperimentRegistry::new();
        registry.register(Experiment::new("everything_on", &[("on", 100)]));
        assert_eq!(registry.variant("anyone", "everything_on"), "on");
    }
}
