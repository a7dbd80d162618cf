//! Idea curation: shape validation and near-duplicate filtering

use tracing::{debug, info};

use crate::domain::Idea;
use crate::similarity::{self, DEFAULT_THRESHOLD};

/// Curation limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CuratorConfig {
    /// Title similarity at or above which a candidate is a duplicate
    pub threshold: f64,
    /// Inclusive summary length bounds, in characters
    pub summary_min_chars: usize,
    pub summary_max_chars: usize,
}

impl Default for CuratorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            summary_min_chars: 100,
            summary_max_chars: 150,
        }
    }
}

/// Result of curating one candidate batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Curation {
    /// Surviving candidates, in input order
    pub accepted: Vec<Idea>,
    /// Candidates dropped for an empty title or out-of-range summary
    pub invalid: usize,
    /// Candidates dropped as near-duplicates
    pub duplicates: usize,
}

impl Curation {
    pub fn rejected(&self) -> usize {
        self.invalid + self.duplicates
    }
}

/// Whether an idea has a non-empty title and an in-range summary
pub fn is_well_formed(idea: &Idea, config: &CuratorConfig) -> bool {
    let len = idea.summary.trim().chars().count();
    !idea.title.trim().is_empty() && len >= config.summary_min_chars && len <= config.summary_max_chars
}

/// Filter candidates down to the novel, well-formed subset
///
/// Each candidate title is compared against every previously accepted title
/// and against every candidate already kept from this batch.
pub fn curate(candidates: &[Idea], accepted: &[Idea], config: &CuratorConfig) -> Curation {
    debug!(
        candidate_count = candidates.len(),
        accepted_count = accepted.len(),
        threshold = %config.threshold,
        "curate: called"
    );
    let mut curation = Curation::default();

    for candidate in candidates {
        if !is_well_formed(candidate, config) {
            debug!(title = %candidate.title, summary_len = candidate.summary_len(), "curate: dropping malformed idea");
            curation.invalid += 1;
            continue;
        }

        let title = candidate.title.trim();
        let duplicate = accepted
            .iter()
            .chain(curation.accepted.iter())
            .any(|existing| similarity::is_duplicate(title, &existing.title, config.threshold));

        if duplicate {
            debug!(%title, "curate: dropping near-duplicate idea");
            curation.duplicates += 1;
            continue;
        }

        curation.accepted.push(Idea::new(title, candidate.summary.trim()));
    }

    info!(
        kept = curation.accepted.len(),
        invalid = curation.invalid,
        duplicates = curation.duplicates,
        "Curated idea batch"
    );
    curation
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn summary(len: usize) -> String {
        "x".repeat(len)
    }

    fn idea(title: &str) -> Idea {
        Idea::new(title, summary(120))
    }

    #[test]
    fn test_batch_internal_duplicate_keeps_first() {
        let candidates = vec![idea("How X Works"), idea("how x works!!")];
        let curation = curate(&candidates, &[], &CuratorConfig::default());

        assert_eq!(curation.accepted.len(), 1);
        assert_eq!(curation.accepted[0].title, "How X Works");
        assert_eq!(curation.duplicates, 1);
    }

    #[test]
    fn test_duplicate_of_accepted_rejected() {
        let accepted = vec![idea("How to Use Wireless Headphones for Running")];
        let candidates = vec![
            idea("How to use wireless headphones for running"),
            idea("Best Wireless Headphones for Gaming"),
        ];
        let curation = curate(&candidates, &accepted, &CuratorConfig::default());

        assert_eq!(curation.accepted, vec![idea("Best Wireless Headphones for Gaming")]);
        assert_eq!(curation.duplicates, 1);
    }

    #[test]
    fn test_shape_validation_drops_without_truncating() {
        let candidates = vec![
            Idea::new("", summary(120)),
            Idea::new("Too Short", summary(99)),
            Idea::new("Too Long", summary(151)),
            Idea::new("Lower Bound", summary(100)),
            Idea::new("Upper Bound", summary(150)),
        ];
        let curation = curate(&candidates, &[], &CuratorConfig::default());

        assert_eq!(curation.invalid, 3);
        assert_eq!(curation.rejected(), 3);
        let titles: Vec<_> = curation.accepted.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Lower Bound", "Upper Bound"]);
        assert_eq!(curation.accepted[1].summary.len(), 150);
    }

    #[test]
    fn test_invalid_candidate_does_not_shadow_later_duplicate() {
        // A malformed idea is never treated as accepted for comparisons
        let candidates = vec![Idea::new("Battery Life Explained", "short"), idea("Battery Life Explained")];
        let curation = curate(&candidates, &[], &CuratorConfig::default());

        assert_eq!(curation.accepted.len(), 1);
        assert_eq!(curation.invalid, 1);
        assert_eq!(curation.duplicates, 0);
    }

    #[test]
    fn test_output_preserves_input_order() {
        let candidates = vec![idea("Zebra Guide"), idea("Apple Review"), idea("Mango Comparison")];
        let curation = curate(&candidates, &[], &CuratorConfig::default());
        let titles: Vec<_> = curation.accepted.iter().map(|i| i.title.as_str()).collect();

        assert_eq!(titles, vec!["Zebra Guide", "Apple Review", "Mango Comparison"]);
    }

    #[test]
    fn test_inputs_untouched() {
        let candidates = vec![idea("  Padded Title  ")];
        let before = candidates.clone();
        let curation = curate(&candidates, &[], &CuratorConfig::default());

        assert_eq!(candidates, before);
        assert_eq!(curation.accepted[0].title, "Padded Title");
    }

    fn title_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec!["how", "x", "works", "best", "guide", "battery", "vs"]), 1..5)
            .prop_map(|words| words.join(" "))
    }

    proptest! {
        #[test]
        fn prop_accepted_set_has_no_duplicates(
            existing in prop::collection::vec(title_strategy(), 0..4),
            incoming in prop::collection::vec(title_strategy(), 0..8),
        ) {
            let config = CuratorConfig::default();
            let accepted = curate(&existing.iter().map(|t| idea(t)).collect::<Vec<_>>(), &[], &config).accepted;
            let candidates: Vec<_> = incoming.iter().map(|t| idea(t)).collect();
            let curation = curate(&candidates, &accepted, &config);

            let mut all = accepted.clone();
            all.extend(curation.accepted);
            for (i, a) in all.iter().enumerate() {
                for b in all.iter().skip(i + 1) {
                    prop_assert!(!similarity::is_duplicate(&a.title, &b.title, config.threshold));
                }
            }
        }

        #[test]
        fn prop_curate_idempotent(incoming in prop::collection::vec(title_strategy(), 0..8)) {
            let config = CuratorConfig::default();
            let candidates: Vec<_> = incoming.iter().map(|t| idea(t)).collect();
            let accepted = vec![idea("best guide")];

            prop_assert_eq!(curate(&candidates, &accepted, &config), curate(&candidates, &accepted, &config));
        }
    }
}
