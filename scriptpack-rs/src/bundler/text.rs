//! Text helpers applied to module sources before parsing.

/// Strips a leading UTF-8 byte order mark.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{FEFF}').unwrap_or(text)
}

/// Turns a JSON document into a module whose default export is the parsed
/// value. The document is embedded as a string literal and parsed at runtime,
/// so keys like `__proto__` keep their JSON meaning.
pub fn transform_json_source(source: &str) -> String {
    format!("export default JSON.parse({});\n", json_literal(source))
}

/// CommonJS counterpart of [`transform_json_source`] for documents reached
/// through `require()`.
pub fn transform_json_source_commonjs(source: &str) -> String {
    format!("module.exports = JSON.parse({});\n", json_literal(source))
}

// A JSON string literal is also a valid JS string literal.
fn json_literal(source: &str) -> String {
    serde_json::Value::String(source.to_string()).to_string()
}

/// Returns the first line of `source` when it is a `#!` interpreter line.
pub fn shebang(source: &str) -> Option<&str> {
    let first_line = strip_bom(source).lines().next()?;
    first_line.starts_with("#!").then_some(first_line)
}
