//! Content depth and structure rules.

use super::{evaluate, Finding, Rule};
use crate::domain::{Category, Document, Metric, MetricValue, ScoreResult, Severity};

pub const THIN_CONTENT: &str = "thin content";
pub const MISSING_SUBHEADINGS: &str = "missing subheadings";
pub const HEADING_HIERARCHY_SKIPPED: &str = "heading hierarchy skipped";
pub const LONG_PARAGRAPHS: &str = "long paragraphs";
pub const LOW_TEXT_RATIO: &str = "low text-to-html ratio";
pub const NO_VISUAL_CONTENT: &str = "no visual content";

/// Pages with fewer visible words than this are thin.
pub const MIN_WORDS: usize = 300;
pub const MAX_AVG_PARAGRAPH_WORDS: usize = 150;
pub const MIN_TEXT_RATIO_PERCENT: usize = 10;

const RULES: [Rule<Document>; 6] = [
    Rule { weight: 30, check: word_count },
    Rule { weight: 15, check: subheadings },
    Rule { weight: 10, check: heading_hierarchy },
    Rule { weight: 10, check: paragraph_length },
    Rule { weight: 10, check: text_ratio },
    Rule { weight: 10, check: visuals },
];

pub fn score_content(document: &Document) -> ScoreResult {
    let metrics = vec![
        Metric::new("word_count", MetricValue::Count(document.word_count as u64)),
        Metric::new("paragraph_count", MetricValue::Count(document.paragraph_count as u64)),
        Metric::new(
            "avg_paragraph_words",
            MetricValue::Count(average_paragraph_words(document) as u64),
        ),
        Metric::new(
            "text_to_html_ratio",
            MetricValue::Count(text_ratio_percent(document).unwrap_or(0) as u64),
        ),
        Metric::new("heading_count", MetricValue::Count(document.headings.len() as u64)),
        Metric::new("image_count", MetricValue::Count(document.images.len() as u64)),
    ];
    evaluate(Category::Content, document, &RULES, metrics)
}

fn average_paragraph_words(doc: &Document) -> usize {
    doc.paragraph_words.checked_div(doc.paragraph_count).unwrap_or(0)
}

fn text_ratio_percent(doc: &Document) -> Option<usize> {
    (doc.text_length * 100).checked_div(doc.html_length)
}

fn word_count(doc: &Document) -> Option<Finding> {
    (doc.word_count < MIN_WORDS).then(|| {
        Finding::new(
            THIN_CONTENT,
            Severity::High,
            format!(
                "The page has {} words of visible text; aim for at least {}.",
                doc.word_count, MIN_WORDS
            ),
        )
        .with_value(doc.word_count.to_string())
    })
}

fn subheadings(doc: &Document) -> Option<Finding> {
    (doc.headings_at(2).next().is_none()).then(|| {
        Finding::new(
            MISSING_SUBHEADINGS,
            Severity::Medium,
            "The page has no H2 subheadings to structure its content.",
        )
    })
}

fn heading_hierarchy(doc: &Document) -> Option<Finding> {
    let jump = doc
        .headings
        .windows(2)
        .find(|pair| pair[1].level > pair[0].level + 1)?;
    Some(
        Finding::new(
            HEADING_HIERARCHY_SKIPPED,
            Severity::Low,
            format!(
                "Heading levels jump from H{} to H{}.",
                jump[0].level, jump[1].level
            ),
        )
        .with_value(jump[1].text.clone()),
    )
}

fn paragraph_length(doc: &Document) -> Option<Finding> {
    let average = average_paragraph_words(doc);
    (average > MAX_AVG_PARAGRAPH_WORDS).then(|| {
        Finding::new(
            LONG_PARAGRAPHS,
            Severity::Low,
            format!("Paragraphs average {} words; break them up.", average),
        )
        .with_value(average.to_string())
    })
}

fn text_ratio(doc: &Document) -> Option<Finding> {
    let ratio = text_ratio_percent(doc)?;
    (ratio < MIN_TEXT_RATIO_PERCENT).then(|| {
        Finding::new(
            LOW_TEXT_RATIO,
            Severity::Low,
            format!("Visible text is only {}% of the HTML.", ratio),
        )
        .with_value(format!("{}%", ratio))
    })
}

fn visuals(doc: &Document) -> Option<Finding> {
    doc.images.is_empty().then(|| {
        Finding::new(
            NO_VISUAL_CONTENT,
            Severity::Low,
            "The page has no images to support its text.",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Heading, Image};

    fn rich(words: usize) -> Document {
        Document {
            headings: vec![
                Heading { level: 1, text: "Title".into() },
                Heading { level: 2, text: "Part".into() },
                Heading { level: 3, text: "Detail".into() },
            ],
            images: vec![Image { src: "/a.png".into(), has_alt: true, lazy: true }],
            word_count: words,
            paragraph_count: 4,
            paragraph_words: 400,
            text_length: 3_000,
            html_length: 10_000,
            ..Document::default()
        }
    }

    fn names(result: &ScoreResult) -> Vec<&str> {
        result.issues.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn three_hundred_words_is_not_thin() {
        assert!(score_content(&rich(300)).issues.is_empty());
        assert_eq!(score_content(&rich(300)).score, 100);
    }

    #[test]
    fn two_hundred_ninety_nine_words_is_thin() {
        let result = score_content(&rich(299));
        assert_eq!(names(&result), vec![THIN_CONTENT]);
        assert_eq!(result.issues[0].severity, Severity::High);
        assert_eq!(result.issues[0].current_value.as_deref(), Some("299"));
    }

    #[test]
    fn skipped_heading_levels_are_flagged() {
        let mut doc = rich(500);
        doc.headings = vec![
            Heading { level: 1, text: "Title".into() },
            Heading { level: 3, text: "Deep".into() },
            Heading { level: 2, text: "Part".into() },
        ];
        let result = score_content(&doc);
        assert_eq!(names(&result), vec![HEADING_HIERARCHY_SKIPPED]);
        assert_eq!(result.issues[0].current_value.as_deref(), Some("Deep"));
    }

    #[test]
    fn empty_document_keeps_rule_order() {
        let result = score_content(&Document::default());
        assert_eq!(
            names(&result),
            vec![THIN_CONTENT, MISSING_SUBHEADINGS, NO_VISUAL_CONTENT]
        );
    }

    #[test]
    fn long_paragraphs_and_low_ratio() {
        let mut doc = rich(800);
        doc.paragraph_count = 2;
        doc.paragraph_words = 400;
        doc.text_length = 500;
        let result = score_content(&doc);
        assert_eq!(names(&result), vec![LONG_PARAGRAPHS, LOW_TEXT_RATIO]);
    }
}
