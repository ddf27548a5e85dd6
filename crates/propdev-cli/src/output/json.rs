use serde_json::Value;

/// Pretty-print the full appraisal envelope as JSON. This is the default
/// format and the one other tools should parse.
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("JSON serialization error: {}", e),
    }
}
