use std::collections::HashMap;

use serde::Deserialize;

use crate::catalog::FeatureKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptRetention {
    Retain,
    Clear,
}

/// What happens to the prompt text once a generation settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetentionRule {
    pub on_success: PromptRetention,
    pub on_failure: PromptRetention,
}

impl RetentionRule {
    pub const RETAIN: Self = Self {
        on_success: PromptRetention::Retain,
        on_failure: PromptRetention::Retain,
    };

    pub const fn for_outcome(self, succeeded: bool) -> PromptRetention {
        if succeeded {
            self.on_success
        } else {
            self.on_failure
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRetentionPolicy {
    rules: HashMap<FeatureKind, RetentionRule>,
}

impl Default for PromptRetentionPolicy {
    /// Map prompts are cleared once an image is generated; every other prompt is kept
    /// so the user can refine it.
    fn default() -> Self {
        let mut rules: HashMap<_, _> = FeatureKind::ALL
            .into_iter()
            .map(|kind| (kind, RetentionRule::RETAIN))
            .collect();
        rules.insert(
            FeatureKind::Map,
            RetentionRule {
                on_success: PromptRetention::Clear,
                on_failure: PromptRetention::Retain,
            },
        );
        Self { rules }
    }
}

impl PromptRetentionPolicy {
    pub fn with_overrides(overrides: &HashMap<FeatureKind, RetentionRule>) -> Self {
        let mut policy = Self::default();
        policy.rules.extend(overrides.iter().map(|(kind, rule)| (*kind, *rule)));
        policy
    }

    pub fn rule(&self, kind: FeatureKind) -> RetentionRule {
        self.rules.get(&kind).copied().unwrap_or(RetentionRule::RETAIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_clears_only_successful_map_prompts() {
        let policy = PromptRetentionPolicy::default();
        assert_eq!(
            policy.rule(FeatureKind::Map).for_outcome(true),
            PromptRetention::Clear
        );
        assert_eq!(
            policy.rule(FeatureKind::Map).for_outcome(false),
            PromptRetention::Retain
        );
        for kind in [FeatureKind::Localized, FeatureKind::Global, FeatureKind::Instant] {
            assert_eq!(policy.rule(kind), RetentionRule::RETAIN);
        }
    }

    #[test]
    fn overrides_replace_individual_kinds() {
        let overrides: HashMap<FeatureKind, RetentionRule> = serde_json::from_str(
            r#"{ "global": { "on_success": "clear", "on_failure": "retain" } }"#,
        )
        .expect("override should parse");
        let policy = PromptRetentionPolicy::with_overrides(&overrides);

        assert_eq!(
            policy.rule(FeatureKind::Global).for_outcome(true),
            PromptRetention::Clear
        );
        assert_eq!(
            policy.rule(FeatureKind::Map).for_outcome(true),
            PromptRetention::Clear
        );
        assert_eq!(policy.rule(FeatureKind::Localized), RetentionRule::RETAIN);
    }
}
