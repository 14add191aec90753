//! crates/site_audit_core/src/pipeline.rs
//!
//! The orchestrator. Drives one analysis through the linear state machine
//! `Start -> Fetched -> Extracted -> Scored(seo|speed|content) -> Fixed(..) -> Done`,
//! recording a `Failed` marker (with everything gathered so far) when a
//! stage fails. Once scoring is over the run also gets its overall health
//! and priority plan.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::{
    ActionPlan, AnalysisRun, Category, CategoryFixes, Document, FetchedPage, Fix, FixBundle,
    FixContext, OverallHealth, PageTiming, RunState, ScoreResult, ServerType, Stage, StageFailure,
};
use crate::extract::extract;
use crate::fetch::normalize_url;
use crate::fixes::FixGenerator;
use crate::packager::{self, PackagingError};
use crate::plan;
use crate::ports::{FetchError, GenerationError, PageFetcher};
use crate::scoring::{self, ScoreError};

/// Per-call knobs for a full run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Also generate fixes for every scored category.
    pub generate_fixes: bool,
    pub server_type: ServerType,
    pub target_keyword: Option<String>,
}

/// Holds the two external collaborators. Cheap to clone.
#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<dyn PageFetcher>,
    fixes: FixGenerator,
}

impl Pipeline {
    pub fn new(fetcher: Arc<dyn PageFetcher>, fixes: FixGenerator) -> Self {
        Self { fetcher, fixes }
    }

    //=====================================================================================
    // Individual stages
    //=====================================================================================

    /// Normalizes `url` and retrieves it.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let normalized = normalize_url(url)?;
        self.fetcher.fetch_page(normalized.as_str()).await
    }

    pub fn extract(&self, page: &FetchedPage) -> Document {
        extract(&page.final_url, &page.html)
    }

    pub fn score(
        &self,
        category: Category,
        document: &Document,
        timing: Option<&PageTiming>,
    ) -> Result<ScoreResult, ScoreError> {
        scoring::score(category, document, timing)
    }

    pub async fn generate_fixes(
        &self,
        url: &str,
        category: Category,
        issues: &[String],
        context: &FixContext,
    ) -> Result<Vec<Fix>, GenerationError> {
        self.fixes.generate(url, category, issues, context).await
    }

    pub fn package(
        &self,
        source_url: &str,
        server_type: ServerType,
        seo: &[Fix],
        speed: &[Fix],
        content: &[Fix],
        generated_at: DateTime<Utc>,
    ) -> Result<FixBundle, PackagingError> {
        packager::build(source_url, server_type, seo, speed, content, generated_at)
    }

    /// Overall health and priority plan; `None` when nothing was scored.
    pub fn assess(&self, scores: &[&ScoreResult]) -> Option<(OverallHealth, ActionPlan)> {
        plan::assess(scores)
    }

    //=====================================================================================
    // Full runs
    //=====================================================================================

    /// Fetches `url` and runs every later stage.
    pub async fn run(&self, url: &str, options: &RunOptions) -> AnalysisRun {
        let mut run = AnalysisRun::new(url);
        info!(run_id = %run.id, url, "Starting analysis");

        let page = match self.fetch(url).await {
            Ok(page) => page,
            Err(err) => {
                fail(&mut run, Stage::Fetch, err.to_string());
                finish(&mut run);
                return run;
            }
        };
        run.final_url = Some(page.final_url.clone());
        advance(&mut run, RunState::Fetched);

        let document = self.extract(&page);
        advance(&mut run, RunState::Extracted);

        self.analyze(&mut run, &document, Some(&page.timing), options)
            .await;
        run
    }

    /// Runs the pipeline over HTML the caller already has. There is no
    /// timing data, so the speed stage fails while the others proceed.
    pub async fn run_html(&self, url: &str, html: &str, options: &RunOptions) -> AnalysisRun {
        let mut run = AnalysisRun::new(url);
        info!(run_id = %run.id, url, "Starting analysis of supplied HTML");

        let final_url = match normalize_url(url) {
            Ok(normalized) => normalized.to_string(),
            Err(err) => {
                fail(&mut run, Stage::Fetch, err.to_string());
                finish(&mut run);
                return run;
            }
        };
        run.final_url = Some(final_url.clone());
        advance(&mut run, RunState::Fetched);

        let document = extract(&final_url, html);
        advance(&mut run, RunState::Extracted);

        self.analyze(&mut run, &document, None, options).await;
        run
    }

    async fn analyze(
        &self,
        run: &mut AnalysisRun,
        document: &Document,
        timing: Option<&PageTiming>,
        options: &RunOptions,
    ) {
        for category in Category::ALL {
            match self.score(category, document, timing) {
                Ok(result) => {
                    info!(
                        run_id = %run.id,
                        %category,
                        score = result.score,
                        issues = result.issues.len(),
                        "Scored category"
                    );
                    run.set_score(result);
                    advance(run, RunState::Scored { category });
                }
                Err(err) => fail(run, Stage::Score(category), err.to_string()),
            }
        }

        let assessment = self.assess(&run.scores());
        if let Some((health, action_plan)) = assessment {
            info!(
                run_id = %run.id,
                score = health.score,
                status = %health.status,
                priorities = action_plan.priorities.len(),
                "Assessed overall health"
            );
            run.health = Some(health);
            run.plan = Some(action_plan);
        }

        if options.generate_fixes {
            let context = fix_context(document, options);
            for category in Category::ALL {
                let Some(issues) = run.score(category).map(ScoreResult::issue_names) else {
                    continue;
                };
                match self
                    .generate_fixes(&document.url, category, &issues, &context)
                    .await
                {
                    Ok(fixes) => {
                        run.fixes.push(CategoryFixes { category, fixes });
                        advance(run, RunState::Fixed { category });
                    }
                    Err(err) => fail(run, Stage::Fix(category), err.to_string()),
                }
            }
        }

        finish(run);
    }
}

/// Context for fix prompts, taken from the extracted page.
pub fn fix_context(document: &Document, options: &RunOptions) -> FixContext {
    let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
    FixContext {
        current_title: non_empty(&document.title),
        current_description: non_empty(&document.meta_description),
        target_keyword: options.target_keyword.clone(),
        page_excerpt: non_empty(&document.excerpt),
        server_type: options.server_type,
    }
}

fn advance(run: &mut AnalysisRun, state: RunState) {
    info!(run_id = %run.id, state = ?state, "Run transition");
    run.history.push(state.clone());
    run.state = state;
}

fn fail(run: &mut AnalysisRun, stage: Stage, reason: String) {
    warn!(run_id = %run.id, %stage, reason = %reason, "Stage failed");
    run.failures.push(StageFailure { stage, reason });
}

/// Moves the run to its terminal state: the first failure, if any, else `Done`.
fn finish(run: &mut AnalysisRun) {
    let terminal = match run.failures.first() {
        Some(first) => RunState::Failed {
            stage: first.stage,
            reason: first.reason.clone(),
        },
        None => RunState::Done,
    };
    advance(run, terminal);
}
