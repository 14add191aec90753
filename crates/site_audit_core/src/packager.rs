//! crates/site_audit_core/src/packager.rs
//!
//! Collects the fixes of all three categories into a downloadable bundle of
//! plain-text artifacts and serializes it as a ZIP archive.
//!
//! Output depends only on the inputs: the generation timestamp is the one
//! value that varies between two otherwise identical bundles.

use std::io::{Cursor, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::domain::{BundleFile, Category, Fix, FixBundle, ServerType};

pub const README: &str = "README";
pub const SEO_FILE: &str = "seo-fixes.html";
pub const CONTENT_FILE: &str = "content-fixes.html";
pub const SUMMARY_FILE: &str = "summary.json";

const HTML_SEPARATOR: &str = "\n<!-- ==================== -->\n";

#[derive(Debug, thiserror::Error)]
pub enum PackagingError {
    #[error("A {found} fix for '{issue}' was placed in the {expected} list")]
    CategoryMismatch {
        expected: Category,
        found: Category,
        issue: String,
    },
    #[error("Could not write the archive: {0}")]
    Archive(String),
}

impl From<zip::result::ZipError> for PackagingError {
    fn from(err: zip::result::ZipError) -> Self {
        PackagingError::Archive(err.to_string())
    }
}

impl From<std::io::Error> for PackagingError {
    fn from(err: std::io::Error) -> Self {
        PackagingError::Archive(err.to_string())
    }
}

/// Name of the speed artifact for a deployment target.
pub fn speed_file_name(server_type: ServerType) -> &'static str {
    match server_type {
        ServerType::Nginx | ServerType::Apache => "speed-fixes.conf",
        ServerType::Node => "speed-fixes.js",
    }
}

#[derive(Serialize)]
struct Counts {
    seo: usize,
    speed: usize,
    content: usize,
}

#[derive(Serialize)]
struct Summary<'a> {
    source_url: &'a str,
    server_type: ServerType,
    generated_at: String,
    counts: Counts,
    total: usize,
    unavailable: usize,
}

/// Builds the bundle. Every fix must belong to the list it is passed in.
pub fn build(
    source_url: &str,
    server_type: ServerType,
    seo: &[Fix],
    speed: &[Fix],
    content: &[Fix],
    generated_at: DateTime<Utc>,
) -> Result<FixBundle, PackagingError> {
    check_category(Category::Seo, seo)?;
    check_category(Category::Speed, speed)?;
    check_category(Category::Content, content)?;

    let speed_name = speed_file_name(server_type);
    let timestamp = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);

    let summary = Summary {
        source_url,
        server_type,
        generated_at: timestamp.clone(),
        counts: Counts {
            seo: seo.len(),
            speed: speed.len(),
            content: content.len(),
        },
        total: seo.len() + speed.len() + content.len(),
        unavailable: [seo, speed, content]
            .iter()
            .flat_map(|list| list.iter())
            .filter(|f| !f.available)
            .count(),
    };
    let summary_json = serde_json::to_string_pretty(&summary)
        .map_err(|e| PackagingError::Archive(e.to_string()))?;

    let readme = render_readme(source_url, server_type, speed_name, &summary, &timestamp);

    let files = vec![
        BundleFile {
            name: README.to_string(),
            contents: readme,
        },
        BundleFile {
            name: SEO_FILE.to_string(),
            contents: render_html("SEO", source_url, seo),
        },
        BundleFile {
            name: speed_name.to_string(),
            contents: render_speed(source_url, server_type, speed),
        },
        BundleFile {
            name: CONTENT_FILE.to_string(),
            contents: render_html("Content", source_url, content),
        },
        BundleFile {
            name: SUMMARY_FILE.to_string(),
            contents: summary_json,
        },
    ];

    Ok(FixBundle {
        source_url: source_url.to_string(),
        server_type,
        generated_at,
        files,
    })
}

/// Serializes the bundle as a ZIP archive with fixed entry timestamps.
pub fn to_zip(bundle: &FixBundle) -> Result<Vec<u8>, PackagingError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for file in &bundle.files {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default());
        writer.start_file(file.name.as_str(), options)?;
        writer.write_all(file.contents.as_bytes())?;
    }
    Ok(writer.finish()?.into_inner())
}

fn check_category(expected: Category, fixes: &[Fix]) -> Result<(), PackagingError> {
    match fixes.iter().find(|f| f.issue.category != expected) {
        Some(fix) => Err(PackagingError::CategoryMismatch {
            expected,
            found: fix.issue.category,
            issue: fix.issue.name.clone(),
        }),
        None => Ok(()),
    }
}

//=========================================================================================
// Rendering
//=========================================================================================

fn render_readme(
    source_url: &str,
    server_type: ServerType,
    speed_name: &str,
    summary: &Summary<'_>,
    timestamp: &str,
) -> String {
    let mut out = String::new();
    out.push_str("Site audit fix bundle\n");
    out.push_str("=====================\n\n");
    out.push_str(&format!("Source URL:   {}\n", source_url));
    out.push_str(&format!("Server type:  {}\n", server_type.as_str()));
    out.push_str(&format!("Generated at: {}\n\n", timestamp));
    out.push_str("Files\n-----\n");
    out.push_str(&format!(
        "{:<20} {} SEO fix(es), paste into the page <head> or body as directed\n",
        SEO_FILE, summary.counts.seo
    ));
    out.push_str(&format!(
        "{:<20} {} speed fix(es) for {}\n",
        speed_name,
        summary.counts.speed,
        server_type.as_str()
    ));
    out.push_str(&format!(
        "{:<20} {} content fix(es)\n",
        CONTENT_FILE, summary.counts.content
    ));
    out.push_str(&format!("{:<20} machine-readable counts\n", SUMMARY_FILE));
    if summary.unavailable > 0 {
        out.push_str(&format!(
            "\n{} fix(es) could not be generated and are marked unavailable.\n",
            summary.unavailable
        ));
    }
    out
}

fn render_html(label: &str, source_url: &str, fixes: &[Fix]) -> String {
    let mut out = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<title>{label} fixes for {url}</title>\n</head>\n<body>\n<h1>{label} fixes</h1>\n\
<p>Source: {url}</p>\n",
        label = label,
        url = escape_html(source_url)
    );
    if fixes.is_empty() {
        out.push_str("<p>No issues to fix.</p>\n");
    }
    let sections: Vec<String> = fixes
        .iter()
        .enumerate()
        .map(|(i, fix)| {
            let mut section = format!(
                "<section>\n<h2>{}. {}</h2>\n<p>Impact: {}</p>\n<pre>{}</pre>\n",
                i + 1,
                escape_html(&fix.issue.name),
                escape_html(&fix.impact),
                escape_html(&fix.instructions)
            );
            if !fix.fixed_code.is_empty() {
                section.push_str(&format!(
                    "<pre><code>{}</code></pre>\n",
                    escape_html(&fix.fixed_code)
                ));
            }
            section.push_str("</section>");
            section
        })
        .collect();
    out.push_str(&sections.join(HTML_SEPARATOR));
    out.push_str("\n</body>\n</html>\n");
    out
}

fn render_speed(source_url: &str, server_type: ServerType, fixes: &[Fix]) -> String {
    let comment = match server_type {
        ServerType::Nginx | ServerType::Apache => "#",
        ServerType::Node => "//",
    };
    let target = match server_type {
        ServerType::Nginx => "nginx server block",
        ServerType::Apache => ".htaccess directives",
        ServerType::Node => "Node.js / Express",
    };

    let mut out = format!(
        "{c} Speed fixes for {url}\n{c} Target: {target}\n",
        c = comment,
        url = one_line(source_url),
        target = target
    );
    if fixes.is_empty() {
        out.push_str(&format!("{} No issues to fix.\n", comment));
    }
    for (i, fix) in fixes.iter().enumerate() {
        out.push_str(&format!(
            "\n{c} ==================== {n}. {name} ====================\n",
            c = comment,
            n = i + 1,
            name = one_line(&fix.issue.name)
        ));
        out.push_str(&format!("{} Impact: {}\n", comment, one_line(&fix.impact)));
        for line in fix.instructions.trim_end().split(is_line_break) {
            out.push_str(&format!("{} {}\n", comment, line));
        }
        if !fix.fixed_code.is_empty() {
            out.push_str(&fix.fixed_code);
            if !fix.fixed_code.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    out
}

/// Line terminators of nginx, Apache and JavaScript alike.
fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Collapses all whitespace, line breaks included, so text stays inside a
/// single comment line.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
