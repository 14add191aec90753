//! crates/site_audit_core/src/extract.rs
//!
//! Turns raw HTML into a [`Document`].
//!
//! Extraction never fails: html5ever repairs malformed markup, and anything that
//! cannot be found is left empty or zero. Missing pieces are logged at debug
//! level only.

use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, error};
use url::Url;

use crate::domain::{Document, Heading, Image, Link, ScriptRef};

/// Elements whose text is never rendered.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Link schemes that point nowhere on the web.
const NON_NAVIGABLE_PREFIXES: [&str; 5] = ["#", "mailto:", "tel:", "javascript:", "data:"];

const EXCERPT_CHARS: usize = 500;

/// Parses `html` fetched from `url` into a [`Document`].
pub fn extract(url: &str, html: &str) -> Document {
    let page = Html::parse_document(html);
    let base = Url::parse(url).ok();

    let title = select_all(&page, "title")
        .first()
        .map(|el| normalize_text(&el.text().collect::<String>()))
        .unwrap_or_default();
    if title.is_empty() {
        debug!(url, "No <title> found while extracting");
    }

    let meta_description = meta_content(&page, "description").unwrap_or_default();
    let has_viewport_meta = meta_content(&page, "viewport").is_some();

    let mut canonical_url = None;
    let mut stylesheets = Vec::new();
    for link in select_all(&page, "link[rel]") {
        let rel = link.value().attr("rel").unwrap_or_default();
        let href = link.value().attr("href").unwrap_or_default().trim();
        if has_rel(rel, "canonical") && canonical_url.is_none() && !href.is_empty() {
            canonical_url = Some(href.to_string());
        }
        if has_rel(rel, "stylesheet") {
            stylesheets.push(href.to_string());
        }
    }

    let mut has_structured_data = false;
    let mut scripts = Vec::new();
    let mut inline_script_count = 0;
    for script in select_all(&page, "script") {
        let element = script.value();
        let is_json_ld = element
            .attr("type")
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"));
        if is_json_ld {
            has_structured_data = true;
            continue;
        }
        match element.attr("src") {
            Some(src) => scripts.push(ScriptRef {
                src: src.trim().to_string(),
                deferred: element.attr("async").is_some() || element.attr("defer").is_some(),
                in_head: has_ancestor(script, "head"),
            }),
            None => inline_script_count += 1,
        }
    }
    let inline_style_count = select_all(&page, "style").len();

    let headings = select_all(&page, "h1, h2, h3, h4, h5, h6")
        .into_iter()
        .filter_map(|h| {
            let level = h.value().name().strip_prefix('h')?.parse::<u8>().ok()?;
            Some(Heading {
                level,
                text: normalize_text(&h.text().collect::<String>()),
            })
        })
        .collect();

    let links = select_all(&page, "a[href]")
        .into_iter()
        .filter_map(|a| classify_link(a.value().attr("href")?, base.as_ref()))
        .collect();

    let images = select_all(&page, "img")
        .into_iter()
        .map(|img| {
            let element = img.value();
            Image {
                src: element
                    .attr("src")
                    .or_else(|| element.attr("data-src"))
                    .unwrap_or_default()
                    .trim()
                    .to_string(),
                has_alt: element.attr("alt").is_some_and(|alt| !alt.trim().is_empty()),
                lazy: element
                    .attr("loading")
                    .is_some_and(|l| l.trim().eq_ignore_ascii_case("lazy")),
            }
        })
        .collect();

    let mut chunks = Vec::new();
    match select_all(&page, "body").first() {
        Some(body) => collect_visible_text(*body, &mut chunks),
        None => debug!(url, "No <body> found while extracting"),
    }
    let words: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
    let word_count = words.len();
    let visible_text = words.join(" ");
    let text_length = visible_text.len();
    let excerpt: String = visible_text.chars().take(EXCERPT_CHARS).collect();

    let mut paragraph_count = 0;
    let mut paragraph_words = 0;
    for paragraph in select_all(&page, "p") {
        let mut text = Vec::new();
        collect_visible_text(paragraph, &mut text);
        let count: usize = text.iter().map(|t| t.split_whitespace().count()).sum();
        if count > 0 {
            paragraph_count += 1;
            paragraph_words += count;
        }
    }

    Document {
        url: url.to_string(),
        title,
        meta_description,
        canonical_url,
        has_viewport_meta,
        has_structured_data,
        headings,
        links,
        images,
        scripts,
        stylesheets,
        inline_script_count,
        inline_style_count,
        word_count,
        paragraph_count,
        paragraph_words,
        text_length,
        html_length: html.len(),
        excerpt,
    }
}

/// Pushes every rendered text node under `element`, skipping hidden subtrees.
fn collect_visible_text<'a>(element: ElementRef<'a>, chunks: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => chunks.push(&**text),
            Node::Element(el) if !HIDDEN_ELEMENTS.contains(&el.name()) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_visible_text(child_element, chunks);
                }
            }
            _ => {}
        }
    }
}

fn select_all<'a>(page: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => page.select(&selector).collect(),
        Err(e) => {
            error!("Failed to parse CSS selector '{}': {:?}", css, e);
            Vec::new()
        }
    }
}

/// Content of the first `<meta name=...>` whose name matches case-insensitively.
fn meta_content(page: &Html, name: &str) -> Option<String> {
    select_all(page, "meta[name]").into_iter().find_map(|meta| {
        let element = meta.value();
        let matches = element
            .attr("name")
            .is_some_and(|n| n.trim().eq_ignore_ascii_case(name));
        matches.then(|| element.attr("content").unwrap_or_default().trim().to_string())
    })
}

fn has_rel(rel: &str, wanted: &str) -> bool {
    rel.split_whitespace().any(|r| r.eq_ignore_ascii_case(wanted))
}

fn has_ancestor(element: ElementRef<'_>, name: &str) -> bool {
    element
        .ancestors()
        .any(|node| node.value().as_element().is_some_and(|e| e.name() == name))
}

fn classify_link(href: &str, base: Option<&Url>) -> Option<Link> {
    let href = href.trim();
    if href.is_empty()
        || NON_NAVIGABLE_PREFIXES
            .iter()
            .any(|p| href.get(..p.len()).is_some_and(|h| h.eq_ignore_ascii_case(p)))
    {
        return None;
    }

    let internal = match base {
        Some(base) => {
            let resolved = base.join(href).ok()?;
            if !matches!(resolved.scheme(), "http" | "https") {
                return None;
            }
            same_site(resolved.host_str(), base.host_str())
        }
        None => !href.contains("://"),
    };

    Some(Link {
        href: href.to_string(),
        internal,
    })
}

fn same_site(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            let strip = |h: &str| h.trim_start_matches("www.").to_ascii_lowercase();
            strip(a) == strip(b)
        }
        _ => false,
    }
}

/// Collapses runs of whitespace and trims.
fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
