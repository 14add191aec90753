//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document of the site audit API, for client generation
//! and API review without starting the server.
//!
//! Usage: `openapi [PATH]`. PATH defaults to `openapi.json`; `-` prints to stdout.

use std::path::Path;

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_PATH: &str = "openapi.json";

fn render() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

fn write_to(target: &str, document: &str) -> std::io::Result<()> {
    if target == "-" {
        println!("{}", document);
        return Ok(());
    }
    if let Some(parent) = Path::new(target).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(target, document)?;
    eprintln!("OpenAPI document written to {}", target);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let target = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PATH.to_string());
    write_to(&target, &render()?)?;
    Ok(())
}
