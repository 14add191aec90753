//! On-page SEO rules.

use super::{evaluate, Finding, Rule};
use crate::domain::{Category, Document, Metric, MetricValue, ScoreResult, Severity};

pub const MISSING_TITLE: &str = "missing title";
pub const TITLE_TOO_SHORT: &str = "title too short";
pub const TITLE_TOO_LONG: &str = "title too long";
pub const MISSING_META_DESCRIPTION: &str = "missing meta description";
pub const META_DESCRIPTION_TOO_SHORT: &str = "meta description too short";
pub const META_DESCRIPTION_TOO_LONG: &str = "meta description too long";
pub const MISSING_H1: &str = "missing h1";
pub const MULTIPLE_H1: &str = "multiple h1";
pub const IMAGES_MISSING_ALT: &str = "images missing alt text";
pub const MISSING_CANONICAL: &str = "missing canonical tag";
pub const MISSING_STRUCTURED_DATA: &str = "missing structured data";
pub const MISSING_VIEWPORT: &str = "missing viewport meta";
pub const NO_INTERNAL_LINKS: &str = "no internal links";

/// Titles between these lengths (inclusive, in characters) are good.
pub const TITLE_MIN_CHARS: usize = 10;
pub const TITLE_MAX_CHARS: usize = 60;
pub const DESCRIPTION_MIN_CHARS: usize = 50;
pub const DESCRIPTION_MAX_CHARS: usize = 160;

const RULES: [Rule<Document>; 8] = [
    Rule { weight: 20, check: title },
    Rule { weight: 15, check: meta_description },
    Rule { weight: 15, check: h1 },
    Rule { weight: 10, check: image_alt },
    Rule { weight: 5, check: canonical },
    Rule { weight: 5, check: structured_data },
    Rule { weight: 10, check: viewport },
    Rule { weight: 5, check: internal_links },
];

pub fn score_seo(document: &Document) -> ScoreResult {
    let images_without_alt = document.images.iter().filter(|i| !i.has_alt).count();
    let internal = document.internal_link_count();
    let metrics = vec![
        Metric::new("title_length", MetricValue::Count(document.title.chars().count() as u64)),
        Metric::new(
            "meta_description_length",
            MetricValue::Count(document.meta_description.chars().count() as u64),
        ),
        Metric::new("h1_count", MetricValue::Count(document.headings_at(1).count() as u64)),
        Metric::new("h2_count", MetricValue::Count(document.headings_at(2).count() as u64)),
        Metric::new("image_count", MetricValue::Count(document.images.len() as u64)),
        Metric::new("images_without_alt", MetricValue::Count(images_without_alt as u64)),
        Metric::new("internal_links", MetricValue::Count(internal as u64)),
        Metric::new(
            "external_links",
            MetricValue::Count((document.links.len() - internal) as u64),
        ),
        Metric::new("has_canonical", MetricValue::Flag(document.canonical_url.is_some())),
        Metric::new("has_structured_data", MetricValue::Flag(document.has_structured_data)),
    ];
    evaluate(Category::Seo, document, &RULES, metrics)
}

fn title(doc: &Document) -> Option<Finding> {
    let length = doc.title.chars().count();
    if length == 0 {
        return Some(Finding::new(
            MISSING_TITLE,
            Severity::Critical,
            "The page has no <title> tag.",
        ));
    }
    if length < TITLE_MIN_CHARS {
        return Some(
            Finding::new(
                TITLE_TOO_SHORT,
                Severity::Medium,
                format!("Title is {} characters; aim for {}-{}.", length, TITLE_MIN_CHARS, TITLE_MAX_CHARS),
            )
            .with_value(doc.title.clone()),
        );
    }
    if length > TITLE_MAX_CHARS {
        return Some(
            Finding::new(
                TITLE_TOO_LONG,
                Severity::High,
                format!(
                    "Title is {} characters and will be truncated in search results (max {}).",
                    length, TITLE_MAX_CHARS
                ),
            )
            .with_value(doc.title.clone()),
        );
    }
    None
}

fn meta_description(doc: &Document) -> Option<Finding> {
    let length = doc.meta_description.chars().count();
    if length == 0 {
        return Some(Finding::new(
            MISSING_META_DESCRIPTION,
            Severity::High,
            "The page has no meta description.",
        ));
    }
    if length < DESCRIPTION_MIN_CHARS {
        return Some(
            Finding::new(
                META_DESCRIPTION_TOO_SHORT,
                Severity::Medium,
                format!("Meta description is only {} characters.", length),
            )
            .with_value(doc.meta_description.clone()),
        );
    }
    if length > DESCRIPTION_MAX_CHARS {
        return Some(
            Finding::new(
                META_DESCRIPTION_TOO_LONG,
                Severity::Low,
                format!(
                    "Meta description is {} characters (max {}).",
                    length, DESCRIPTION_MAX_CHARS
                ),
            )
            .with_value(doc.meta_description.clone()),
        );
    }
    None
}

fn h1(doc: &Document) -> Option<Finding> {
    let h1s: Vec<&str> = doc.headings_at(1).map(|h| h.text.as_str()).collect();
    match h1s.len() {
        0 => Some(Finding::new(MISSING_H1, Severity::High, "The page has no H1 heading.")),
        1 => None,
        n => Some(
            Finding::new(
                MULTIPLE_H1,
                Severity::Medium,
                format!("The page has {} H1 headings; use exactly one.", n),
            )
            .with_value(h1s.join(" | ")),
        ),
    }
}

fn image_alt(doc: &Document) -> Option<Finding> {
    let missing: Vec<&str> = doc
        .images
        .iter()
        .filter(|i| !i.has_alt)
        .map(|i| i.src.as_str())
        .collect();
    if missing.is_empty() {
        return None;
    }
    Some(
        Finding::new(
            IMAGES_MISSING_ALT,
            Severity::Medium,
            format!("{} of {} images lack alt text.", missing.len(), doc.images.len()),
        )
        .with_value(missing.join(", ")),
    )
}

fn canonical(doc: &Document) -> Option<Finding> {
    doc.canonical_url.is_none().then(|| {
        Finding::new(
            MISSING_CANONICAL,
            Severity::Low,
            "No canonical URL is declared.",
        )
    })
}

fn structured_data(doc: &Document) -> Option<Finding> {
    (!doc.has_structured_data).then(|| {
        Finding::new(
            MISSING_STRUCTURED_DATA,
            Severity::Low,
            "No JSON-LD structured data was found.",
        )
    })
}

fn viewport(doc: &Document) -> Option<Finding> {
    (!doc.has_viewport_meta).then(|| {
        Finding::new(
            MISSING_VIEWPORT,
            Severity::Medium,
            "No viewport meta tag; the page may not render well on mobile.",
        )
    })
}

fn internal_links(doc: &Document) -> Option<Finding> {
    (doc.internal_link_count() == 0).then(|| {
        Finding::new(
            NO_INTERNAL_LINKS,
            Severity::Low,
            "The page links to no other page on the same site.",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Heading, Image, Link};

    fn healthy() -> Document {
        Document {
            url: "https://example.com/".into(),
            title: "Example Domain for Illustrative Purposes".into(),
            meta_description: "This domain is for use in illustrative examples in documents and tutorials.".into(),
            canonical_url: Some("https://example.com/".into()),
            has_viewport_meta: true,
            has_structured_data: true,
            headings: vec![Heading { level: 1, text: "Example".into() }],
            links: vec![Link { href: "/about".into(), internal: true }],
            images: vec![Image { src: "/a.png".into(), has_alt: true, lazy: false }],
            ..Document::default()
        }
    }

    fn names(result: &ScoreResult) -> Vec<&str> {
        result.issues.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn healthy_page_scores_full_marks() {
        let result = score_seo(&healthy());
        assert_eq!(result.score, 100);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn title_of_exactly_sixty_chars_is_good() {
        let mut doc = healthy();
        doc.title = "a".repeat(60);
        assert!(!names(&score_seo(&doc)).contains(&TITLE_TOO_LONG));

        doc.title = "a".repeat(61);
        let result = score_seo(&doc);
        assert_eq!(names(&result), vec![TITLE_TOO_LONG]);
        assert_eq!(result.issues[0].severity, Severity::High);
        assert_eq!(result.issues[0].current_value.as_deref(), Some(doc.title.as_str()));
    }

    #[test]
    fn title_length_counts_characters_not_bytes() {
        let mut doc = healthy();
        doc.title = "é".repeat(60);
        assert!(score_seo(&doc).issues.is_empty());
    }

    #[test]
    fn short_and_missing_titles() {
        let mut doc = healthy();
        doc.title = "Home".into();
        assert_eq!(names(&score_seo(&doc)), vec![TITLE_TOO_SHORT]);
        doc.title = String::new();
        let result = score_seo(&doc);
        assert_eq!(names(&result), vec![MISSING_TITLE]);
        assert_eq!(result.issues[0].severity, Severity::Critical);
    }

    #[test]
    fn issues_follow_rule_order() {
        let doc = Document {
            title: "t".repeat(75),
            ..Document::default()
        };
        let result = score_seo(&doc);
        assert_eq!(
            names(&result),
            vec![
                TITLE_TOO_LONG,
                MISSING_META_DESCRIPTION,
                MISSING_H1,
                MISSING_CANONICAL,
                MISSING_STRUCTURED_DATA,
                MISSING_VIEWPORT,
                NO_INTERNAL_LINKS,
            ]
        );
        // Only the image rule passes: 10 of 85.
        assert_eq!(result.score, 12);
    }

    #[test]
    fn multiple_h1_and_missing_alt() {
        let mut doc = healthy();
        doc.headings.push(Heading { level: 1, text: "Another".into() });
        doc.images.push(Image { src: "/b.png".into(), has_alt: false, lazy: false });
        let result = score_seo(&doc);
        assert_eq!(names(&result), vec![MULTIPLE_H1, IMAGES_MISSING_ALT]);
        assert_eq!(result.issues[1].current_value.as_deref(), Some("/b.png"));
    }

    #[test]
    fn scoring_is_deterministic() {
        let doc = Document {
            title: "x".repeat(61),
            ..healthy()
        };
        let first = serde_json::to_string(&score_seo(&doc)).unwrap();
        let second = serde_json::to_string(&score_seo(&doc)).unwrap();
        assert_eq!(first, second);
    }
}
