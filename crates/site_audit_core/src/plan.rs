//! crates/site_audit_core/src/plan.rs
//!
//! Rates a page from its category scores and derives a priority plan. Pure and
//! deterministic, so recommendations exist even when fix generation is down.

use crate::domain::{
    ActionPlan, Category, Effort, HealthStatus, OverallHealth, PriorityItem, ScoreResult, Severity,
};

/// Categories scoring below this get priority items and action items.
pub const PRIORITY_THRESHOLD: u8 = 70;
/// Below this a category's priorities are critical rather than high.
pub const CRITICAL_THRESHOLD: u8 = 40;
pub const MAX_PRIORITIES: usize = 5;
const ITEMS_PER_CATEGORY: usize = 2;

struct Template {
    title: &'static str,
    description: &'static str,
    action: &'static str,
    expected: &'static str,
}

const SEO_TEMPLATES: [Template; 3] = [
    Template {
        title: "Optimize Meta Tags",
        description: "Meta title and description need optimization for better search visibility",
        action: "Add a unique, keyword-rich title (50-60 chars) and meta description (150-160 chars) with a call-to-action",
        expected: "+5-10 SEO points",
    },
    Template {
        title: "Add Structured Data",
        description: "Missing or incomplete Schema.org markup",
        action: "Implement JSON-LD schema for Organization, WebPage and relevant content types",
        expected: "+3-5 SEO points",
    },
    Template {
        title: "Improve Internal Linking",
        description: "Internal link structure needs optimization",
        action: "Add contextual internal links between related pages with descriptive anchor text",
        expected: "+3-5 SEO points",
    },
];

const SPEED_TEMPLATES: [Template; 3] = [
    Template {
        title: "Compress Images",
        description: "Large images are slowing down page load",
        action: "Convert images to WebP, resize to display dimensions and lazy-load below-the-fold images",
        expected: "+10-15 Speed points",
    },
    Template {
        title: "Enable Browser Caching",
        description: "Resources are not being cached effectively",
        action: "Set Cache-Control headers for static assets (1 year for versioned files, 1 week for others)",
        expected: "+5-8 Speed points",
    },
    Template {
        title: "Minify CSS/JS",
        description: "Unminified resources increase page size",
        action: "Minify and bundle CSS/JavaScript files and defer non-critical scripts",
        expected: "+3-5 Speed points",
    },
];

const CONTENT_TEMPLATES: [Template; 3] = [
    Template {
        title: "Expand Content Depth",
        description: "Content lacks depth",
        action: "Add 500-1000 more words covering related subtopics, FAQs and examples",
        expected: "+8-12 Content points",
    },
    Template {
        title: "Improve Heading Structure",
        description: "Heading hierarchy needs optimization",
        action: "Use one H1 and organize content with H2-H3 subheadings that include keywords naturally",
        expected: "+3-5 Content points",
    },
    Template {
        title: "Add Visual Content",
        description: "Page lacks engaging visual elements",
        action: "Add infographics, charts or images to break up text",
        expected: "+3-5 Content points",
    },
];

fn templates(category: Category) -> &'static [Template] {
    match category {
        Category::Seo => &SEO_TEMPLATES,
        Category::Speed => &SPEED_TEMPLATES,
        Category::Content => &CONTENT_TEMPLATES,
    }
}

fn label(category: Category) -> &'static str {
    match category {
        Category::Seo => "SEO",
        Category::Speed => "Speed",
        Category::Content => "Content",
    }
}

//=========================================================================================
// Overall Health
//=========================================================================================

/// Rounded mean of the given scores; `None` when nothing was scored.
pub fn overall_score(scores: &[&ScoreResult]) -> Option<u8> {
    if scores.is_empty() {
        return None;
    }
    let count = scores.len() as u32;
    let total: u32 = scores.iter().map(|s| u32::from(s.score)).sum();
    Some(((total + count / 2) / count) as u8)
}

pub fn health(scores: &[&ScoreResult]) -> Option<OverallHealth> {
    let score = overall_score(scores)?;
    let status = HealthStatus::from_score(score);
    let verdict = match status {
        HealthStatus::Critical => "Critical issues need immediate attention.",
        HealthStatus::NeedsWork => "Several optimization opportunities exist.",
        HealthStatus::Good => "Good performance with room for improvement.",
        HealthStatus::Excellent => "Excellent performance. Focus on maintaining it.",
    };
    Some(OverallHealth {
        score,
        status,
        summary: format!("Your website scored {}/100. {}", score, verdict),
    })
}

//=========================================================================================
// Priority Plan
//=========================================================================================

/// Up to `MAX_PRIORITIES` items, weakest category first. Ties keep category order.
pub fn priorities(scores: &[&ScoreResult]) -> Vec<PriorityItem> {
    let mut ranked: Vec<&ScoreResult> = scores.to_vec();
    ranked.sort_by_key(|s| s.score);

    let mut items = Vec::new();
    for result in ranked.into_iter().filter(|s| s.score < PRIORITY_THRESHOLD) {
        let impact = if result.score < CRITICAL_THRESHOLD {
            Severity::Critical
        } else {
            Severity::High
        };
        let effort = match result.category {
            Category::Speed => Effort::Medium,
            Category::Seo | Category::Content => Effort::Low,
        };
        for template in templates(result.category).iter().take(ITEMS_PER_CATEGORY) {
            if items.len() == MAX_PRIORITIES {
                return items;
            }
            items.push(PriorityItem {
                rank: items.len() + 1,
                category: result.category,
                title: template.title.to_string(),
                impact,
                effort,
                description: template.description.to_string(),
                action: template.action.to_string(),
                expected_improvement: template.expected.to_string(),
            });
        }
    }
    items
}

fn verdict(category: Category, score: u8) -> &'static str {
    let band = if score >= PRIORITY_THRESHOLD {
        0
    } else if score >= 50 {
        1
    } else {
        2
    };
    let words: [&str; 3] = match category {
        Category::Seo => ["Strong", "Needs improvement", "Critical attention needed"],
        Category::Speed => ["Excellent", "Moderate", "Slow loading times"],
        Category::Content => ["Rich content", "Average", "Content gaps identified"],
    };
    words[band]
}

pub fn breakdown(scores: &[&ScoreResult]) -> Vec<String> {
    scores
        .iter()
        .map(|s| {
            format!(
                "{}: {}/100 - {}",
                label(s.category),
                s.score,
                verdict(s.category, s.score)
            )
        })
        .collect()
}

/// Two concrete steps for every weak category, or upkeep advice when none is weak.
pub fn action_items(scores: &[&ScoreResult]) -> Vec<String> {
    let mut items: Vec<&str> = Vec::new();
    for result in scores.iter().filter(|s| s.score < PRIORITY_THRESHOLD) {
        items.extend(match result.category {
            Category::Seo => [
                "Optimize all page titles to be 50-60 characters (High Impact)",
                "Add meta descriptions to all pages (High Impact)",
            ],
            Category::Speed => [
                "Compress and optimize all images (High Impact)",
                "Enable browser caching (Medium Impact)",
            ],
            Category::Content => [
                "Publish in-depth articles on topics your visitors search for (High Impact)",
                "Add an FAQ section to address common questions (Medium Impact)",
            ],
        });
    }
    if items.is_empty() {
        items = vec![
            "Maintain current SEO practices (Low Priority)",
            "A/B test landing page elements (Medium Impact)",
            "Build quality backlinks (High Impact)",
            "Update content regularly (Medium Impact)",
        ];
    }
    items.into_iter().map(str::to_string).collect()
}

/// Health rating and plan together; `None` when no category was scored.
pub fn assess(scores: &[&ScoreResult]) -> Option<(OverallHealth, ActionPlan)> {
    let health = health(scores)?;
    let plan = ActionPlan {
        priorities: priorities(scores),
        breakdown: breakdown(scores),
        action_items: action_items(scores),
    };
    Some((health, plan))
}
