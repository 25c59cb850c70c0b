//! Identity canonicalization.
//!
//! Every id the crawler stores goes through one [`Canonicalize`]
//! implementation first, so aliases of the same identity collapse onto one
//! map key. Implementations must be idempotent: `canon(canon(x)) == canon(x)`.

use regex::Regex;
use tracing::warn;

use crate::config::AliasRule;
use crate::error::{GraphError, Result};
use crate::identity::CanonicalId;

/// Rewrites are applied until the id stops changing, bounded by this many passes.
const MAX_REWRITE_PASSES: usize = 16;

/// Pluggable normalization of raw identity references.
pub trait Canonicalize: Send + Sync {
    fn canonicalize(&self, raw: &str) -> CanonicalId;
}

/// Leaves ids untouched apart from surrounding whitespace.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl Canonicalize for Verbatim {
    fn canonicalize(&self, raw: &str) -> CanonicalId {
        CanonicalId::new(raw.trim())
    }
}

/// Ordered regex rewrite rules, applied to a fixpoint.
///
/// Running to a fixpoint is what makes the result idempotent even when a
/// rule could match again after an earlier rewrite.
#[derive(Debug, Clone)]
pub struct AliasRules {
    rules: Vec<(Regex, String)>,
}

impl AliasRules {
    pub fn new(rules: &[AliasRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .map(|re| (re, rule.replacement.clone()))
                    .map_err(|source| GraphError::AliasPattern {
                        pattern: rule.pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// The legacy `*.solid.community` pod host is served as `*.solidcommunity.net`.
    pub fn solid_community() -> Self {
        // Literal pattern, always compiles.
        Self::new(&[AliasRule::solid_community()]).unwrap_or_else(|_| Self { rules: Vec::new() })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn rewrite_once(&self, id: &str) -> String {
        self.rules
            .iter()
            .fold(id.to_string(), |acc, (re, replacement)| {
                re.replace_all(&acc, replacement.as_str()).into_owned()
            })
    }
}

impl Canonicalize for AliasRules {
    fn canonicalize(&self, raw: &str) -> CanonicalId {
        let mut current = raw.trim().to_string();
        for _ in 0..MAX_REWRITE_PASSES {
            let next = self.rewrite_once(&current);
            if next == current {
                return CanonicalId::new(current);
            }
            current = next;
        }
        warn!(raw, "alias rules did not converge, using last rewrite");
        CanonicalId::new(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_solid_community_alias() {
        let canon = AliasRules::solid_community();
        let id = canon.canonicalize("https://alice.solid.community/profile/card#me");
        assert_eq!(
            id.as_str(),
            "https://alice.solidcommunity.net/profile/card#me"
        );
    }

    #[test]
    fn test_unrelated_hosts_untouched() {
        let canon = AliasRules::solid_community();
        for raw in [
            "https://bob.solidcommunity.net/profile/card#me",
            "https://ruben.verborgh.org/profile/#me",
            "https://solid.community.example/#me",
        ] {
            assert_eq!(canon.canonicalize(raw).as_str(), raw);
        }
    }

    #[test]
    fn test_whitespace_trimmed() {
        let canon = AliasRules::solid_community();
        assert_eq!(canon.canonicalize("  https://x.org/#me\n").as_str(), "https://x.org/#me");
        assert_eq!(Verbatim.canonicalize(" a ").as_str(), "a");
    }

    #[test]
    fn test_rules_run_to_fixpoint() {
        let canon = AliasRules::new(&[
            AliasRule::new("^http://", "https://"),
            AliasRule::new("^https://www\\.", "https://"),
        ])
        .unwrap();
        let once = canon.canonicalize("http://www.example.org/#me");
        assert_eq!(once.as_str(), "https://example.org/#me");
        assert_eq!(canon.canonicalize(once.as_str()), once);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = AliasRules::new(&[AliasRule::new("(unclosed", "x")]).unwrap_err();
        assert!(matches!(err, GraphError::AliasPattern { .. }));
    }

    proptest! {
        #[test]
        fn canonicalization_is_idempotent(
            user in "[a-z]{1,8}",
            host in prop::sample::select(vec![
                ".solid.community",
                ".solidcommunity.net",
                ".solid.community.solid.community",
                ".inrupt.net",
            ]),
            path in "(/[a-z]{0,6}){0,3}",
            fragment in prop::option::of("[a-z]{1,4}"),
        ) {
            let canon = AliasRules::solid_community();
            let raw = match fragment {
                Some(f) => format!("https://{user}{host}{path}#{f}"),
                None => format!("https://{user}{host}{path}"),
            };
            let once = canon.canonicalize(&raw);
            let twice = canon.canonicalize(once.as_str());
            prop_assert_eq!(once, twice);
        }
    }
}
