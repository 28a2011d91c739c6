// Pattern compilation and budgeted evaluation.
//
// Compilation happens eagerly at trigger creation time and is side-effect
// free. Evaluation during dispatch runs on the blocking pool under a
// wall-clock budget so one pathological pattern cannot starve the event
// loop; exceeding the budget counts as "no match" for that event.

use super::trigger_models::TriggerError;
use regex::{Regex, RegexBuilder};
use std::time::Duration;
use thiserror::Error;

/// Cap on the compiled program size, matching the regex crate's notion of
/// "this pattern is too expensive to even build".
const PATTERN_SIZE_LIMIT: usize = 1 << 21;

/// Matcher evaluation exceeded its wall-clock budget.
#[derive(Debug, Clone, Copy, Error)]
#[error("pattern evaluation exceeded its {budget_ms}ms budget")]
pub struct PatternTimeout {
    pub budget_ms: u64,
}

/// A user-supplied pattern compiled into an executable matcher.
///
/// Keeps the source text so the trigger can be persisted and re-displayed.
#[derive(Debug, Clone)]
pub struct TriggerPattern {
    source: String,
    regex: Regex,
}

impl TriggerPattern {
    pub fn compile(source: &str) -> Result<Self, TriggerError> {
        let regex = RegexBuilder::new(source)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
            .map_err(|e| TriggerError::InvalidPattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Unbudgeted test, for contexts that already control their input size.
    #[allow(dead_code)]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Test `text` against the pattern, giving up after `budget`.
    ///
    /// The match runs on the blocking pool; the regex handle is cheap to
    /// clone (shared internals).
    pub async fn is_match_within(
        &self,
        text: &str,
        budget: Duration,
    ) -> Result<bool, PatternTimeout> {
        let regex = self.regex.clone();
        let haystack = text.to_owned();
        let task = tokio::task::spawn_blocking(move || regex.is_match(&haystack));
        match tokio::time::timeout(budget, task).await {
            Ok(Ok(matched)) => Ok(matched),
            Ok(Err(join_error)) => {
                tracing::error!("pattern evaluation task failed: {join_error}");
                Ok(false)
            }
            Err(_) => Err(PatternTimeout {
                budget_ms: budget.as_millis() as u64,
            }),
        }
    }
}

impl PartialEq for TriggerPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiled_pattern_matches_its_target() {
        let pattern = TriggerPattern::compile(r"\bspam\b").unwrap();
        assert!(pattern.is_match("free spam here"));
        assert!(!pattern.is_match("spammer"));
    }

    #[test]
    fn invalid_syntax_fails_compilation() {
        let result = TriggerPattern::compile("[unterminated");
        assert!(matches!(result, Err(TriggerError::InvalidPattern { .. })));
    }

    #[test]
    fn oversized_pattern_fails_compilation() {
        // Bounded repetition stacked high enough to blow the program size cap.
        let result = TriggerPattern::compile(&"a{250}".repeat(5000));
        assert!(matches!(result, Err(TriggerError::InvalidPattern { .. })));
    }

    #[tokio::test]
    async fn budgeted_match_returns_within_budget() {
        let pattern = TriggerPattern::compile("needle").unwrap();
        let matched = pattern
            .is_match_within("haystack with a needle in it", Duration::from_millis(100))
            .await
            .unwrap();
        assert!(matched);
    }
}
