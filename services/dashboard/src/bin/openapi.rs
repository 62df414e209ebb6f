//! services/dashboard/src/bin/openapi.rs
//!
//! Dumps the surface API's OpenAPI document. Writes `openapi.json` by
//! default, the path given as the first argument otherwise, or stdout when
//! that argument is `-`.

use dashboard_lib::web::rest::ApiDoc;
use std::io::Write;
use utoipa::OpenApi;

const DEFAULT_PATH: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api = ApiDoc::openapi();
    let document = api.to_pretty_json()?;
    let target = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_PATH.to_string());

    if target == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(document.as_bytes())?;
        writeln!(stdout)?;
    } else {
        std::fs::write(&target, document)?;
        eprintln!("Wrote {} ({} paths)", target, api.paths.paths.len());
    }
    Ok(())
}
