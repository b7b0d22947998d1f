//! Write the billing API's OpenAPI document as JSON
//!
//! ```text
//! export_openapi                      # stdout
//! export_openapi --output api.json    # file
//! ```

use anyhow::Context;
use simple_billing::gateway::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let json = ApiDoc::openapi()
        .to_pretty_json()
        .context("Failed to serialize OpenAPI document")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [flag, path] if flag == "--output" || flag == "-o" => {
            std::fs::write(path, &json).with_context(|| format!("Failed to write {}", path))?;
            eprintln!("OpenAPI document written to {}", path);
        }
        [] => println!("{}", json),
        _ => anyhow::bail!("usage: export_openapi [--output <file>]"),
    }
    Ok(())
}
