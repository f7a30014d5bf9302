//! Write the OpenAPI specification to `anpbridge-web/docs/openapi.json`

use anpbridge_web::openapi::ApiDoc;
use std::fs;
use std::path::Path;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let docs_dir = Path::new("anpbridge-web/docs");
    fs::create_dir_all(docs_dir)?;

    let openapi = ApiDoc::openapi();

    let json_path = docs_dir.join("openapi.json");
    fs::write(&json_path, openapi.to_pretty_json()?)?;
    println!("Generated: {}", json_path.display());

    Ok(())
}
