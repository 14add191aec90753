//! crates/site_audit_core/src/fixes.rs
//!
//! Turns issue names into concrete fixes by prompting a `CompletionService`
//! and coercing its JSON reply into `Fix` values. The returned list always has
//! one entry per requested issue, in request order.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{Category, Fix, FixContext, IssueRef, ServerType};
use crate::ports::{CompletionService, GenerationError};

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Longest page excerpt included in a prompt, in characters.
const EXCERPT_CHARS: usize = 1_000;

const SYSTEM_PROMPT: &str = "You are an expert web developer and SEO engineer. \
You receive a list of problems detected on a live web page. For every problem, write \
the complete, production-ready fix: exact instructions, the code or configuration to \
paste, and the expected impact. Never give placeholders or vague advice. \
Return ONLY this JSON, with no markdown and no prose: \
{\"fixes\": [{\"issue\": \"<problem name exactly as given>\", \"instructions\": \"...\", \
\"fixed_code\": \"...\", \"impact\": \"...\"}]}";

//=========================================================================================
// Fix Kinds
//=========================================================================================

/// The family of remediation an issue needs; selects the prompt guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixKind {
    MetaTags,
    StructuredData,
    AltText,
    InternalLinks,
    SpeedConfig,
    Content,
}

/// Checked in order; more specific aliases come first.
const ALIASES: &[(&str, FixKind)] = &[
    ("meta_tags", FixKind::MetaTags),
    ("meta", FixKind::MetaTags),
    ("title", FixKind::MetaTags),
    ("description", FixKind::MetaTags),
    ("canonical", FixKind::MetaTags),
    ("viewport", FixKind::MetaTags),
    ("schema", FixKind::StructuredData),
    ("structured_data", FixKind::StructuredData),
    ("json_ld", FixKind::StructuredData),
    ("alt_tags", FixKind::AltText),
    ("alt_text", FixKind::AltText),
    ("alt", FixKind::AltText),
    ("internal_links", FixKind::InternalLinks),
    ("linking", FixKind::InternalLinks),
    ("speed", FixKind::SpeedConfig),
    ("performance", FixKind::SpeedConfig),
    ("caching", FixKind::SpeedConfig),
    ("compression", FixKind::SpeedConfig),
    ("lazy", FixKind::SpeedConfig),
    ("load", FixKind::SpeedConfig),
    ("page_size", FixKind::SpeedConfig),
    ("scripts", FixKind::SpeedConfig),
    ("stylesheets", FixKind::SpeedConfig),
    ("images", FixKind::AltText),
    ("content", FixKind::Content),
    ("headings", FixKind::Content),
    ("word_count", FixKind::Content),
];

impl FixKind {
    /// Routes an issue name or fix-type tag. Matching is on the normalized
    /// name (lower-case, `-` and spaces become `_`), first as a whole and
    /// then by `_`-delimited segment. Anything unrecognized is content.
    pub fn route(name: &str) -> FixKind {
        let normalized = normalize(name);
        if let Some((_, kind)) = ALIASES.iter().find(|(alias, _)| *alias == normalized) {
            return *kind;
        }
        let padded = format!("_{}_", normalized);
        ALIASES
            .iter()
            .find(|(alias, _)| padded.contains(&format!("_{}_", alias)))
            .map(|(_, kind)| *kind)
            .unwrap_or(FixKind::Content)
    }

    fn guidance(&self, context: &FixContext) -> String {
        match self {
            FixKind::MetaTags => "Write the complete <title> and <meta> tags for <head>. \
Titles 50-60 characters with the primary keyword near the start; descriptions \
150-160 characters with a clear call to action."
                .to_string(),
            FixKind::StructuredData => "Write a complete <script type=\"application/ld+json\"> \
block with Organization, WebSite and WebPage schemas using the real URL."
                .to_string(),
            FixKind::AltText => "Give descriptive alt text for every affected image and the \
corrected <img> tags."
                .to_string(),
            FixKind::InternalLinks => "Propose internal links with descriptive anchor text and \
the HTML to insert."
                .to_string(),
            FixKind::SpeedConfig => format!(
                "Write the complete {} configuration or code that resolves it.",
                match context.server_type {
                    ServerType::Nginx => "nginx server block",
                    ServerType::Apache => "Apache .htaccess",
                    ServerType::Node => "Node.js (Express middleware)",
                }
            ),
            FixKind::Content => "Write ready-to-paste HTML content specific to this page: \
expanded copy for thin content, a corrected heading outline for heading problems, or \
rewritten paragraphs for readability."
                .to_string(),
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace(['-', ' '], "_")
}

//=========================================================================================
// The Generator
//=========================================================================================

/// Generates fixes in batches against a `CompletionService`.
#[derive(Clone)]
pub struct FixGenerator {
    service: Arc<dyn CompletionService>,
    batch_size: usize,
    timeout: Duration,
}

impl FixGenerator {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns exactly one `Fix` per entry of `issues`, in the same order.
    ///
    /// Unresolved entries become `Fix::unavailable`. An error is returned only
    /// when every batch failed.
    pub async fn generate(
        &self,
        url: &str,
        category: Category,
        issues: &[String],
        context: &FixContext,
    ) -> Result<Vec<Fix>, GenerationError> {
        if issues.is_empty() {
            return Ok(Vec::new());
        }

        let batches: Vec<&[String]> = issues.chunks(self.batch_size).collect();
        debug!(
            "Generating {} {} fixes for {} in {} batch(es)",
            issues.len(),
            category,
            url,
            batches.len()
        );

        let replies = join_all(
            batches
                .iter()
                .map(|batch| self.run_batch(url, category, batch, context)),
        )
        .await;

        if let Some(err) = replies.iter().find_map(|r| r.as_ref().err()) {
            if replies.iter().all(Result::is_err) {
                warn!("All fix batches failed for {} ({}): {}", url, category, err);
                return Err(err.clone());
            }
        }

        let mut fixes = Vec::with_capacity(issues.len());
        for (batch, reply) in batches.iter().zip(replies) {
            match reply {
                Ok(resolved) => {
                    for (name, raw) in batch.iter().zip(resolved) {
                        fixes.push(match raw {
                            Some(raw) => raw.into_fix(category, name),
                            None => Fix::unavailable(category, name, "no usable entry in the reply"),
                        });
                    }
                }
                Err(err) => {
                    warn!("Fix batch failed for {} ({}): {}", url, category, err);
                    let reason = err.to_string();
                    fixes.extend(
                        batch
                            .iter()
                            .map(|name| Fix::unavailable(category, name, &reason)),
                    );
                }
            }
        }
        Ok(fixes)
    }

    async fn run_batch(
        &self,
        url: &str,
        category: Category,
        batch: &[String],
        context: &FixContext,
    ) -> Result<Vec<Option<RawFix>>, GenerationError> {
        let prompt = build_prompt(url, category, batch, context);
        let reply = tokio::time::timeout(self.timeout, self.service.complete(SYSTEM_PROMPT, &prompt))
            .await
            .map_err(|_| GenerationError::Timeout(self.timeout))??;
        let entries = parse_reply(&reply)?;
        Ok(match_entries(batch, entries))
    }
}

//=========================================================================================
// Prompting
//=========================================================================================

fn build_prompt(url: &str, category: Category, issues: &[String], context: &FixContext) -> String {
    let mut prompt = format!("Website URL: {}\nCategory: {}\n", url, category);
    prompt.push_str(&format!(
        "Current title: {}\n",
        context.current_title.as_deref().unwrap_or("Not found")
    ));
    prompt.push_str(&format!(
        "Current meta description: {}\n",
        context.current_description.as_deref().unwrap_or("Not found")
    ));
    prompt.push_str(&format!(
        "Primary keyword: {}\n",
        context.target_keyword.as_deref().unwrap_or("Not specified")
    ));
    prompt.push_str(&format!("Server: {}\n", context.server_type.as_str()));
    if let Some(excerpt) = context.page_excerpt.as_deref() {
        let excerpt: String = excerpt.chars().take(EXCERPT_CHARS).collect();
        prompt.push_str(&format!("Page content preview: {}\n", excerpt));
    }

    prompt.push_str("\nProblems to fix:\n");
    for name in issues {
        prompt.push_str(&format!(
            "- issue: {}\n  guidance: {}\n",
            name,
            FixKind::route(name).guidance(context)
        ));
    }
    prompt.push_str("\nReturn one entry per problem, in the same order.");
    prompt
}

//=========================================================================================
// Reply Parsing
//=========================================================================================

#[derive(Debug, Deserialize)]
struct RawFix {
    #[serde(default, alias = "issue_name", alias = "name")]
    issue: Option<String>,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default, alias = "code", alias = "after")]
    fixed_code: Option<String>,
    #[serde(default, alias = "estimated_impact")]
    impact: Option<String>,
}

impl RawFix {
    fn is_usable(&self) -> bool {
        self.instructions
            .as_deref()
            .is_some_and(|i| !i.trim().is_empty())
    }

    fn names(&self, issue: &str) -> bool {
        self.issue
            .as_deref()
            .is_some_and(|n| n.trim().eq_ignore_ascii_case(issue.trim()))
    }

    fn into_fix(self, category: Category, name: &str) -> Fix {
        Fix {
            issue: IssueRef {
                category,
                name: name.to_string(),
            },
            instructions: self.instructions.unwrap_or_default(),
            fixed_code: self.fixed_code.unwrap_or_default(),
            impact: self.impact.unwrap_or_else(|| "unknown".to_string()),
            available: true,
        }
    }
}

/// Finds the first fix list in `text`: an object with a `fixes` array, or an
/// array of objects. Bracketed prose and other JSON before it are skipped.
pub fn extract_fix_entries(text: &str) -> Option<Vec<Value>> {
    let bytes = text.as_bytes();
    for (start, &b) in bytes.iter().enumerate() {
        if b != b'{' && b != b'[' {
            continue;
        }
        let Some(end) = balanced_end(&bytes[start..]) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(&text[start..start + end]) else {
            continue;
        };
        if let Some(entries) = fix_entries(value) {
            return Some(entries);
        }
    }
    None
}

fn fix_entries(value: Value) -> Option<Vec<Value>> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut object) => match object.remove("fixes") {
            Some(Value::Array(entries)) => return Some(entries),
            _ => return None,
        },
        _ => return None,
    };
    (!entries.is_empty() && entries.iter().all(Value::is_object)).then_some(entries)
}

/// Length of the bracketed span at the start of `bytes`, honouring strings.
fn balanced_end(bytes: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_reply(reply: &str) -> Result<Vec<Option<RawFix>>, GenerationError> {
    let entries = extract_fix_entries(reply)
        .ok_or_else(|| GenerationError::Unparsable("no fix list found in the reply".to_string()))?;
    Ok(entries
        .into_iter()
        .map(|entry| serde_json::from_value::<RawFix>(entry).ok())
        .collect())
}

/// Pairs each issue with an entry: by name first, then by position when the
/// positional entry doesn't name some other issue.
fn match_entries(issues: &[String], entries: Vec<Option<RawFix>>) -> Vec<Option<RawFix>> {
    let mut pool: Vec<Option<RawFix>> = entries
        .into_iter()
        .map(|e| e.filter(RawFix::is_usable))
        .collect();
    let mut matched: Vec<Option<RawFix>> = issues.iter().map(|_| None).collect();

    for (slot, issue) in matched.iter_mut().zip(issues) {
        if let Some(found) = pool
            .iter_mut()
            .find(|e| matches!(e, Some(raw) if raw.names(issue)))
        {
            *slot = found.take();
        }
    }

    for (index, slot) in matched.iter_mut().enumerate() {
        if slot.is_some() {
            continue;
        }
        let Some(candidate) = pool.get_mut(index) else {
            continue;
        };
        let claims_other = candidate.as_ref().is_some_and(|e| {
            e.issue.is_some() && issues.iter().any(|other| e.names(other))
        });
        if !claims_other {
            *slot = candidate.take();
        }
    }
    matched
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Reply = Box<dyn Fn(&str) -> Result<String, GenerationError> + Send + Sync>;

    /// A fake service that answers with a closure over the prompt.
    struct FakeService {
        reply: Reply,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl FakeService {
        fn new(reply: impl Fn(&str) -> Result<String, GenerationError> + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                reply: Box::new(reply),
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionService for FakeService {
        async fn complete(&self, _system: &str, prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(prompt.to_string());
            (self.reply)(prompt)
        }
    }

    fn issues_in(prompt: &str) -> Vec<String> {
        prompt
            .lines()
            .filter_map(|l| l.strip_prefix("- issue: "))
            .map(str::to_string)
            .collect()
    }

    /// Answers every issue in the prompt, wrapped in prose like a chat model.
    fn echo(prompt: &str) -> Result<String, GenerationError> {
        let fixes: Vec<Value> = issues_in(prompt)
            .into_iter()
            .map(|name| {
                serde_json::json!({
                    "issue": name,
                    "instructions": format!("Resolve {}", name),
                    "fixed_code": "<title>Fixed</title>",
                    "impact": "+5 SEO points",
                })
            })
            .collect();
        Ok(format!(
            "Sure! Here are your fixes:\n```json\n{}\n```",
            serde_json::json!({ "fixes": fixes })
        ))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn routing_uses_aliases_and_falls_back_to_content() {
        assert_eq!(FixKind::route("meta-tags"), FixKind::MetaTags);
        assert_eq!(FixKind::route("Structured Data"), FixKind::StructuredData);
        assert_eq!(FixKind::route("title too long"), FixKind::MetaTags);
        assert_eq!(FixKind::route("images missing alt text"), FixKind::AltText);
        assert_eq!(FixKind::route("images without lazy loading"), FixKind::SpeedConfig);
        assert_eq!(FixKind::route("browser caching disabled"), FixKind::SpeedConfig);
        assert_eq!(FixKind::route("no internal links"), FixKind::InternalLinks);
        assert_eq!(FixKind::route("thin content"), FixKind::Content);
        assert_eq!(FixKind::route("something new"), FixKind::Content);
    }

    #[test]
    fn finds_fix_list_inside_prose() {
        let entries = extract_fix_entries("Here you go: {\"fixes\": [{\"a\": \"}{\"}]} trailing [1]").unwrap();
        assert_eq!(entries[0]["a"], "}{");
        assert_eq!(
            extract_fix_entries("[{\"issue\": \"x\"}]").unwrap(),
            vec![serde_json::json!({"issue": "x"})]
        );
        assert!(extract_fix_entries("no json here { broken").is_none());
    }

    #[test]
    fn skips_json_that_is_not_a_fix_list() {
        let reply = r#"Following best practice [1] and {"note": "see below"}, here are the fixes: {"fixes":[{"issue":"title too long","instructions":"Shorten it"}]}"#;
        let entries = extract_fix_entries(reply).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["instructions"], "Shorten it");
        assert!(extract_fix_entries("Only [1, 2] and {\"a\": 1} here").is_none());
    }

    #[tokio::test]
    async fn bracketed_prose_before_the_reply_is_ignored() {
        let service = FakeService::new(|_: &str| {
            Ok(r#"Following best practice [1], here are the fixes: {"fixes":[{"issue":"title too long","instructions":"Shorten the title to 60 characters","fixed_code":"<title>Short</title>"}]}"#.to_string())
        });
        let fixes = FixGenerator::new(service)
            .generate("https://example.com", Category::Seo, &names(&["title too long"]), &FixContext::default())
            .await
            .unwrap();

        assert_eq!(fixes.len(), 1);
        assert!(fixes[0].available);
        assert_eq!(fixes[0].instructions, "Shorten the title to 60 characters");
        assert_eq!(fixes[0].fixed_code, "<title>Short</title>");
    }

    #[tokio::test]
    async fn empty_issue_list_makes_no_call() {
        let service = FakeService::new(echo);
        let generator = FixGenerator::new(service.clone());
        let fixes = generator
            .generate("https://example.com", Category::Seo, &[], &FixContext::default())
            .await
            .unwrap();
        assert!(fixes.is_empty());
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn fixes_follow_issue_order() {
        let service = FakeService::new(echo);
        let generator = FixGenerator::new(service.clone());
        let issues = names(&["title too long", "missing meta description"]);
        let fixes = generator
            .generate("https://example.com", Category::Seo, &issues, &FixContext::default())
            .await
            .unwrap();

        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].issue.name, "title too long");
        assert_eq!(fixes[1].issue.name, "missing meta description");
        assert!(fixes.iter().all(|f| f.available && f.issue.category == Category::Seo));
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn length_invariant_holds_across_batches() {
        for n in 0..12 {
            let service = FakeService::new(echo);
            let generator = FixGenerator::new(service.clone()).with_batch_size(3);
            let issues: Vec<String> = (0..n).map(|i| format!("issue {}", i)).collect();
            let fixes = generator
                .generate("https://example.com", Category::Content, &issues, &FixContext::default())
                .await
                .unwrap();
            assert_eq!(fixes.len(), n);
            for (fix, name) in fixes.iter().zip(&issues) {
                assert_eq!(&fix.issue.name, name);
            }
            assert_eq!(service.calls(), n.div_ceil(3));
        }
    }

    #[tokio::test]
    async fn failed_batch_becomes_sentinels() {
        let service = FakeService::new(|prompt: &str| {
            if prompt.contains("- issue: b") {
                Err(GenerationError::Unreachable("connection reset".into()))
            } else {
                echo(prompt)
            }
        });
        let generator = FixGenerator::new(service).with_batch_size(1);
        let fixes = generator
            .generate("https://example.com", Category::Seo, &names(&["a", "b", "c"]), &FixContext::default())
            .await
            .unwrap();

        assert_eq!(fixes.len(), 3);
        assert!(fixes[0].available);
        assert!(!fixes[1].available);
        assert!(fixes[1].instructions.contains("connection reset"));
        assert!(fixes[2].available);
    }

    #[tokio::test]
    async fn missing_entries_are_sentinels_and_positions_fill_gaps() {
        let service = FakeService::new(|_: &str| {
            Ok(r#"[
                {"instructions": "positional fix for first"},
                {"issue": "third", "instructions": "named fix"}
            ]"#
            .to_string())
        });
        let generator = FixGenerator::new(service);
        let fixes = generator
            .generate(
                "https://example.com",
                Category::Content,
                &names(&["first", "second", "THIRD"]),
                &FixContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(fixes[0].instructions, "positional fix for first");
        assert!(!fixes[1].available);
        assert_eq!(fixes[2].instructions, "named fix");
        assert_eq!(fixes[2].issue.name, "THIRD");
    }

    #[tokio::test]
    async fn entries_without_instructions_are_unresolved() {
        let service = FakeService::new(|_: &str| {
            Ok(r#"{"fixes": [{"issue": "a", "fixed_code": "x"}]}"#.to_string())
        });
        let fixes = FixGenerator::new(service)
            .generate("https://example.com", Category::Seo, &names(&["a"]), &FixContext::default())
            .await
            .unwrap();
        assert_eq!(fixes.len(), 1);
        assert!(!fixes[0].available);
    }

    #[tokio::test]
    async fn whole_request_unparsable_is_an_error() {
        let service = FakeService::new(|_: &str| Ok("I cannot help with that.".to_string()));
        let result = FixGenerator::new(service)
            .generate("https://example.com", Category::Seo, &names(&["a", "b"]), &FixContext::default())
            .await;
        assert!(matches!(result, Err(GenerationError::Unparsable(_))));
    }

    struct SlowService;

    #[async_trait]
    impl CompletionService for SlowService {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("[]".to_string())
        }
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let generator = FixGenerator::new(Arc::new(SlowService)).with_timeout(Duration::from_millis(20));
        let result = generator
            .generate("https://example.com", Category::Speed, &names(&["slow page load"]), &FixContext::default())
            .await;
        assert_eq!(
            result,
            Err(GenerationError::Timeout(Duration::from_millis(20)))
        );
        let message = GenerationError::Timeout(Duration::from_millis(20)).to_string();
        assert!(message.ends_with("after 20ms"), "{message}");
    }

    #[tokio::test]
    async fn prompt_carries_context_and_guidance() {
        let service = FakeService::new(echo);
        let context = FixContext {
            current_title: Some("Old title".into()),
            target_keyword: Some("widgets".into()),
            server_type: ServerType::Apache,
            ..FixContext::default()
        };
        FixGenerator::new(service.clone())
            .generate("https://example.com", Category::Speed, &names(&["compression disabled"]), &context)
            .await
            .unwrap();

        let prompts = service.prompts.lock().unwrap();
        assert!(prompts[0].contains("Current title: Old title"));
        assert!(prompts[0].contains("Primary keyword: widgets"));
        assert!(prompts[0].contains(".htaccess"));
    }
}
