//! crates/site_audit_core/src/scoring/mod.rs
//!
//! The three category scorers. Each is a fixed, ordered list of weighted rules;
//! a rule either passes or yields one issue. The score is the passed share of
//! the total weight, scaled to 0..=100.

pub mod content;
pub mod seo;
pub mod speed;

use crate::domain::{Category, Document, Issue, Metric, PageTiming, ScoreResult, Severity};

pub use content::score_content;
pub use seo::score_seo;
pub use speed::score_speed;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    #[error("The speed score needs timing data from a live fetch")]
    MissingTiming,
}

/// Scores one category. Only [`Category::Speed`] uses `timing`.
pub fn score(
    category: Category,
    document: &Document,
    timing: Option<&PageTiming>,
) -> Result<ScoreResult, ScoreError> {
    match category {
        Category::Seo => Ok(score_seo(document)),
        Category::Speed => timing
            .map(|t| score_speed(document, t))
            .ok_or(ScoreError::MissingTiming),
        Category::Content => Ok(score_content(document)),
    }
}

/// What a failing rule reports.
pub(crate) struct Finding {
    pub name: &'static str,
    pub severity: Severity,
    pub description: String,
    pub current_value: Option<String>,
}

impl Finding {
    pub fn new(name: &'static str, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            name,
            severity,
            description: description.into(),
            current_value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.current_value = Some(value.into());
        self
    }
}

pub(crate) struct Rule<T> {
    pub weight: u32,
    pub check: fn(&T) -> Option<Finding>,
}

/// Runs `rules` in order against `input`.
pub(crate) fn evaluate<T>(
    category: Category,
    input: &T,
    rules: &[Rule<T>],
    metrics: Vec<Metric>,
) -> ScoreResult {
    let total: u32 = rules.iter().map(|r| r.weight).sum();
    let mut passed = 0u32;
    let mut issues = Vec::new();

    for rule in rules {
        match (rule.check)(input) {
            None => passed += rule.weight,
            Some(finding) => issues.push(Issue {
                category,
                name: finding.name.to_string(),
                description: finding.description,
                severity: finding.severity,
                current_value: finding.current_value,
            }),
        }
    }

    let score = if total == 0 {
        100
    } else {
        (passed * 100 + total / 2) / total
    };

    ScoreResult {
        category,
        score: score.min(100) as u8,
        issues,
        metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MetricValue;

    fn always_fails(_: &u32) -> Option<Finding> {
        Some(Finding::new("broken", Severity::Low, "always"))
    }

    fn always_passes(_: &u32) -> Option<Finding> {
        None
    }

    #[test]
    fn score_is_weighted_share_of_passed_rules() {
        let rules = [
            Rule { weight: 1, check: always_fails },
            Rule { weight: 2, check: always_passes },
        ];
        let result = evaluate(Category::Seo, &0, &rules, vec![]);
        assert_eq!(result.score, 67);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].category, Category::Seo);
    }

    #[test]
    fn empty_rule_set_scores_full_marks() {
        let rules: [Rule<u32>; 0] = [];
        let metrics = vec![Metric::new("n", MetricValue::Count(1))];
        let result = evaluate(Category::Content, &0, &rules, metrics);
        assert_eq!(result.score, 100);
        assert_eq!(result.metrics.len(), 1);
    }

    #[test]
    fn speed_requires_timing() {
        let doc = Document::default();
        assert_eq!(
            score(Category::Speed, &doc, None),
            Err(ScoreError::MissingTiming)
        );
        assert!(score(Category::Seo, &doc, None).is_ok());
        assert!(score(Category::Speed, &doc, Some(&PageTiming::default())).is_ok());
    }
}
