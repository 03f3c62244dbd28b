// Usage: cargo run --bin export-openapi > openapi.json
//
// Generates the OpenAPI document without booting the database, embedding
// client, or HTTP listener. Grounded in control-plane's export-openapi
// binary, which does the same against its own ApiDoc.

use gateway_api::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() {
    println!("{}", ApiDoc::openapi().to_pretty_json().expect("openapi document always serializes"));
}
