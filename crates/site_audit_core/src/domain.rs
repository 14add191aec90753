//! crates/site_audit_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or transport; they derive
//! `serde` traits only so adapters can persist and return them as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Categories and Severities
//=========================================================================================

/// One of the three independent analysis domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Seo,
    Speed,
    Content,
}

impl Category {
    /// All categories in pipeline order.
    pub const ALL: [Category; 3] = [Category::Seo, Category::Speed, Category::Content];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Seo => "seo",
            Category::Speed => "speed",
            Category::Content => "content",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seo" => Ok(Category::Seo),
            "speed" => Ok(Category::Speed),
            "content" => Ok(Category::Content),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//=========================================================================================
// Document (the parsed page)
//=========================================================================================

/// A heading in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub internal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub has_alt: bool,
    pub lazy: bool,
}

/// An external `<script src>` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRef {
    pub src: String,
    /// `async` or `defer` is present.
    pub deferred: bool,
    pub in_head: bool,
}

/// Normalized structured representation of a fetched web page.
///
/// Built once per analysis by the extractor and never mutated afterwards.
/// Absent fields are empty or zero rather than missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub meta_description: String,
    pub canonical_url: Option<String>,
    pub has_viewport_meta: bool,
    pub has_structured_data: bool,
    pub headings: Vec<Heading>,
    pub links: Vec<Link>,
    pub images: Vec<Image>,
    pub scripts: Vec<ScriptRef>,
    pub stylesheets: Vec<String>,
    pub inline_script_count: usize,
    pub inline_style_count: usize,
    pub word_count: usize,
    pub paragraph_count: usize,
    pub paragraph_words: usize,
    pub text_length: usize,
    pub html_length: usize,
    /// Leading visible text, used as context when generating fixes.
    pub excerpt: String,
}

impl Document {
    pub fn headings_at(&self, level: u8) -> impl Iterator<Item = &Heading> {
        self.headings.iter().filter(move |h| h.level == level)
    }

    pub fn internal_link_count(&self) -> usize {
        self.links.iter().filter(|l| l.internal).count()
    }
}

/// Measurements taken while fetching the page, required by the speed scorer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageTiming {
    pub load_time_ms: u64,
    /// Decoded body size.
    pub page_size_bytes: u64,
    /// Body size as received on the wire.
    pub transfer_bytes: u64,
    pub content_encoding: Option<String>,
    pub cache_control: Option<String>,
}

/// Raw output of the fetcher.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub requested_url: String,
    pub final_url: String,
    pub html: String,
    pub timing: PageTiming,
}

//=========================================================================================
// Scoring Results
//=========================================================================================

/// A single detected deficiency in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub category: Category,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Flag(bool),
    Count(u64),
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: MetricValue,
}

impl Metric {
    pub fn new(name: &str, value: MetricValue) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// One per (URL, category) pair. Issues keep rule order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub category: Category,
    pub score: u8,
    pub issues: Vec<Issue>,
    pub metrics: Vec<Metric>,
}

impl ScoreResult {
    pub fn issue_names(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.name.clone()).collect()
    }
}

//=========================================================================================
// Fixes
//=========================================================================================

/// Identifies the issue a fix was generated for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub category: Category,
    pub name: String,
}

/// Remediation text/code for one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    pub issue: IssueRef,
    pub instructions: String,
    pub fixed_code: String,
    pub impact: String,
    /// `false` for the "fix unavailable" sentinel.
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl Fix {
    /// Placeholder used when the generation service could not resolve an issue.
    pub fn unavailable(category: Category, name: &str, reason: &str) -> Self {
        Self {
            issue: IssueRef {
                category,
                name: name.to_string(),
            },
            instructions: format!("Fix unavailable: {}", reason),
            fixed_code: String::new(),
            impact: "unknown".to_string(),
            available: false,
        }
    }
}

/// Where the speed configuration fixes will be deployed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerType {
    #[default]
    Nginx,
    Apache,
    Node,
}

impl ServerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerType::Nginx => "nginx",
            ServerType::Apache => "apache",
            ServerType::Node => "node",
        }
    }
}

impl FromStr for ServerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nginx" => Ok(ServerType::Nginx),
            "apache" | "htaccess" => Ok(ServerType::Apache),
            "node" | "express" | "js" => Ok(ServerType::Node),
            other => Err(format!("unknown server type '{}'", other)),
        }
    }
}

/// Context fields handed to the fix generator along with the issue names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixContext {
    #[serde(default)]
    pub current_title: Option<String>,
    #[serde(default)]
    pub current_description: Option<String>,
    #[serde(default)]
    pub target_keyword: Option<String>,
    #[serde(default)]
    pub page_excerpt: Option<String>,
    #[serde(default)]
    pub server_type: ServerType,
}

/// A single named file inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFile {
    pub name: String,
    pub contents: String,
}

/// Aggregated fixes across categories, built per download request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixBundle {
    pub source_url: String,
    pub server_type: ServerType,
    pub generated_at: DateTime<Utc>,
    pub files: Vec<BundleFile>,
}

impl FixBundle {
    pub fn file(&self, name: &str) -> Option<&BundleFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

//=========================================================================================
// Overall Health and Priorities
//=========================================================================================

/// Band of the overall score: below 40, 60 and 80 respectively, else excellent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Critical,
    NeedsWork,
    Good,
    Excellent,
}

impl HealthStatus {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=39 => HealthStatus::Critical,
            40..=59 => HealthStatus::NeedsWork,
            60..=79 => HealthStatus::Good,
            _ => HealthStatus::Excellent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Critical => "critical",
            HealthStatus::NeedsWork => "needs_work",
            HealthStatus::Good => "good",
            HealthStatus::Excellent => "excellent",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallHealth {
    pub score: u8,
    pub status: HealthStatus,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Low,
    Medium,
}

/// One entry of the priority list; `rank` starts at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityItem {
    pub rank: usize,
    pub category: Category,
    pub title: String,
    pub impact: Severity,
    pub effort: Effort,
    pub description: String,
    pub action: String,
    pub expected_improvement: String,
}

/// Score-driven recommendations. Built without the generation service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPlan {
    /// Weakest categories first.
    pub priorities: Vec<PriorityItem>,
    /// One line per scored category, e.g. `SEO: 45/100 - Critical attention needed`.
    pub breakdown: Vec<String>,
    pub action_items: Vec<String>,
}

//=========================================================================================
// Analysis Runs
//=========================================================================================

/// A pipeline stage, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", content = "category", rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Extract,
    Score(Category),
    Fix(Category),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Fetch => f.write_str("fetch"),
            Stage::Extract => f.write_str("extract"),
            Stage::Score(c) => write!(f, "score({})", c),
            Stage::Fix(c) => write!(f, "fix({})", c),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub reason: String,
}

/// Position of a run in the linear analysis state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Start,
    Fetched,
    Extracted,
    Scored { category: Category },
    Fixed { category: Category },
    Done,
    Failed { stage: Stage, reason: String },
}

/// The result of one analysis call, partial results included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub id: Uuid,
    pub requested_url: String,
    pub final_url: Option<String>,
    pub state: RunState,
    pub history: Vec<RunState>,
    pub seo: Option<ScoreResult>,
    pub speed: Option<ScoreResult>,
    pub content: Option<ScoreResult>,
    #[serde(default)]
    pub fixes: Vec<CategoryFixes>,
    #[serde(default)]
    pub failures: Vec<StageFailure>,
    #[serde(default)]
    pub health: Option<OverallHealth>,
    #[serde(default)]
    pub plan: Option<ActionPlan>,
    pub created_at: DateTime<Utc>,
}

/// Fixes for one category, order-correlated with that category's issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryFixes {
    pub category: Category,
    pub fixes: Vec<Fix>,
}

impl AnalysisRun {
    pub fn new(requested_url: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            requested_url: requested_url.to_string(),
            final_url: None,
            state: RunState::Start,
            history: vec![RunState::Start],
            seo: None,
            speed: None,
            content: None,
            fixes: Vec::new(),
            failures: Vec::new(),
            health: None,
            plan: None,
            created_at: Utc::now(),
        }
    }

    pub fn score(&self, category: Category) -> Option<&ScoreResult> {
        match category {
            Category::Seo => self.seo.as_ref(),
            Category::Speed => self.speed.as_ref(),
            Category::Content => self.content.as_ref(),
        }
    }

    /// Scores present so far, in category order.
    pub fn scores(&self) -> Vec<&ScoreResult> {
        Category::ALL
            .iter()
            .filter_map(|category| self.score(*category))
            .collect()
    }

    pub fn set_score(&mut self, result: ScoreResult) {
        match result.category {
            Category::Seo => self.seo = Some(result),
            Category::Speed => self.speed = Some(result),
            Category::Content => self.content = Some(result),
        }
    }

    pub fn fixes_for(&self, category: Category) -> Option<&[Fix]> {
        self.fixes
            .iter()
            .find(|f| f.category == category)
            .map(|f| f.fixes.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("SEO".parse::<Category>(), Ok(Category::Seo));
        assert_eq!(" speed ".parse::<Category>(), Ok(Category::Speed));
        assert!("ux".parse::<Category>().is_err());
    }

    #[test]
    fn server_type_accepts_aliases() {
        assert_eq!("htaccess".parse::<ServerType>(), Ok(ServerType::Apache));
        assert_eq!("express".parse::<ServerType>(), Ok(ServerType::Node));
        assert_eq!(ServerType::default(), ServerType::Nginx);
    }

    #[test]
    fn run_state_serializes_with_tag() {
        let state = RunState::Failed {
            stage: Stage::Score(Category::Speed),
            reason: "missing timing".to_string(),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["stage"]["stage"], "score");
        assert_eq!(json["stage"]["category"], "speed");
    }

    #[test]
    fn sentinel_fix_is_marked_unavailable() {
        let fix = Fix::unavailable(Category::Seo, "missing h1", "timed out");
        assert!(!fix.available);
        assert_eq!(fix.issue.name, "missing h1");
        assert!(fix.instructions.contains("timed out"));
    }

    #[test]
    fn health_status_bands_switch_at_40_60_80() {
        assert_eq!(HealthStatus::from_score(0), HealthStatus::Critical);
        assert_eq!(HealthStatus::from_score(39), HealthStatus::Critical);
        assert_eq!(HealthStatus::from_score(40), HealthStatus::NeedsWork);
        assert_eq!(HealthStatus::from_score(59), HealthStatus::NeedsWork);
        assert_eq!(HealthStatus::from_score(60), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(79), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(80), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(100), HealthStatus::Excellent);
        assert_eq!(
            serde_json::to_value(HealthStatus::NeedsWork).unwrap(),
            "needs_work"
        );
    }
}
