//! Speed rules. These combine what was measured during the fetch with
//! resource counts from the static HTML.

use super::{evaluate, Finding, Rule};
use crate::domain::{Category, Document, Metric, MetricValue, PageTiming, ScoreResult, Severity};

pub const SLOW_PAGE_LOAD: &str = "slow page load";
pub const LARGE_PAGE_SIZE: &str = "large page size";
pub const COMPRESSION_DISABLED: &str = "compression disabled";
pub const CACHING_DISABLED: &str = "browser caching disabled";
pub const RENDER_BLOCKING_SCRIPTS: &str = "render-blocking scripts";
pub const TOO_MANY_SCRIPTS: &str = "too many scripts";
pub const TOO_MANY_STYLESHEETS: &str = "too many stylesheets";
pub const IMAGES_NOT_LAZY: &str = "images without lazy loading";

pub const SLOW_LOAD_MS: u64 = 3_000;
pub const LARGE_PAGE_BYTES: u64 = 500 * 1024;
pub const MAX_SCRIPTS: usize = 10;
pub const MAX_STYLESHEETS: usize = 5;
pub const LAZY_LOADING_IMAGE_THRESHOLD: usize = 5;

pub(crate) struct SpeedInput<'a> {
    document: &'a Document,
    timing: &'a PageTiming,
}

fn rules<'a>() -> [Rule<SpeedInput<'a>>; 8] {
    [
        Rule { weight: 25, check: load_time },
        Rule { weight: 15, check: page_size },
        Rule { weight: 15, check: compression },
        Rule { weight: 10, check: caching },
        Rule { weight: 10, check: render_blocking },
        Rule { weight: 10, check: script_count },
        Rule { weight: 5, check: stylesheet_count },
        Rule { weight: 10, check: lazy_images },
    ]
}

pub fn score_speed(document: &Document, timing: &PageTiming) -> ScoreResult {
    let metrics = vec![
        Metric::new("load_time_ms", MetricValue::Count(timing.load_time_ms)),
        Metric::new("page_size_bytes", MetricValue::Count(timing.page_size_bytes)),
        Metric::new("transfer_bytes", MetricValue::Count(timing.transfer_bytes)),
        Metric::new("script_count", MetricValue::Count(document.scripts.len() as u64)),
        Metric::new(
            "inline_script_count",
            MetricValue::Count(document.inline_script_count as u64),
        ),
        Metric::new("stylesheet_count", MetricValue::Count(document.stylesheets.len() as u64)),
        Metric::new("image_count", MetricValue::Count(document.images.len() as u64)),
        Metric::new("compressed", MetricValue::Flag(timing.content_encoding.is_some())),
        Metric::new("cacheable", MetricValue::Flag(is_cacheable(timing))),
    ];
    evaluate(Category::Speed, &SpeedInput { document, timing }, &rules(), metrics)
}

fn is_cacheable(timing: &PageTiming) -> bool {
    timing.cache_control.as_deref().is_some_and(|cc| {
        let cc = cc.to_ascii_lowercase();
        !cc.contains("no-store") && !cc.contains("no-cache")
    })
}

fn load_time(input: &SpeedInput<'_>) -> Option<Finding> {
    let ms = input.timing.load_time_ms;
    (ms > SLOW_LOAD_MS).then(|| {
        Finding::new(
            SLOW_PAGE_LOAD,
            Severity::High,
            format!("The page took {:.2}s to load (target under 3s).", ms as f64 / 1000.0),
        )
        .with_value(format!("{}ms", ms))
    })
}

fn page_size(input: &SpeedInput<'_>) -> Option<Finding> {
    let bytes = input.timing.page_size_bytes;
    (bytes > LARGE_PAGE_BYTES).then(|| {
        Finding::new(
            LARGE_PAGE_SIZE,
            Severity::Medium,
            format!("The HTML document is {} KB (target under 500 KB).", bytes / 1024),
        )
        .with_value(format!("{} bytes", bytes))
    })
}

fn compression(input: &SpeedInput<'_>) -> Option<Finding> {
    input.timing.content_encoding.is_none().then(|| {
        Finding::new(
            COMPRESSION_DISABLED,
            Severity::Medium,
            "The server did not compress the HTML response.",
        )
    })
}

fn caching(input: &SpeedInput<'_>) -> Option<Finding> {
    if is_cacheable(input.timing) {
        return None;
    }
    let finding = Finding::new(
        CACHING_DISABLED,
        Severity::Medium,
        "The response has no usable Cache-Control policy.",
    );
    Some(match &input.timing.cache_control {
        Some(cc) => finding.with_value(cc.clone()),
        None => finding,
    })
}

fn render_blocking(input: &SpeedInput<'_>) -> Option<Finding> {
    let blocking: Vec<&str> = input
        .document
        .scripts
        .iter()
        .filter(|s| s.in_head && !s.deferred)
        .map(|s| s.src.as_str())
        .collect();
    if blocking.is_empty() {
        return None;
    }
    Some(
        Finding::new(
            RENDER_BLOCKING_SCRIPTS,
            Severity::Medium,
            format!("{} scripts in <head> block rendering.", blocking.len()),
        )
        .with_value(blocking.join(", ")),
    )
}

fn script_count(input: &SpeedInput<'_>) -> Option<Finding> {
    let count = input.document.scripts.len();
    (count > MAX_SCRIPTS).then(|| {
        Finding::new(
            TOO_MANY_SCRIPTS,
            Severity::Medium,
            format!("The page loads {} external scripts (max {}).", count, MAX_SCRIPTS),
        )
        .with_value(count.to_string())
    })
}

fn stylesheet_count(input: &SpeedInput<'_>) -> Option<Finding> {
    let count = input.document.stylesheets.len();
    (count > MAX_STYLESHEETS).then(|| {
        Finding::new(
            TOO_MANY_STYLESHEETS,
            Severity::Low,
            format!("The page loads {} stylesheets (max {}).", count, MAX_STYLESHEETS),
        )
        .with_value(count.to_string())
    })
}

fn lazy_images(input: &SpeedInput<'_>) -> Option<Finding> {
    let images = &input.document.images;
    let any_lazy = images.iter().any(|i| i.lazy);
    (images.len() > LAZY_LOADING_IMAGE_THRESHOLD && !any_lazy).then(|| {
        Finding::new(
            IMAGES_NOT_LAZY,
            Severity::Low,
            format!("None of the {} images use loading=\"lazy\".", images.len()),
        )
    })
}
