// src/utils/html.rs

/// Strips unsafe markup from text that will be rendered to students.
///
/// Whitelist-based: harmless tags like <b> and <p> survive, <script> and
/// <iframe> are removed together with their content, event-handler
/// attributes are dropped.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// `clean_html` over an optional field.
pub fn clean_opt(input: Option<String>) -> Option<String> {
    input.map(|s| clean_html(&s))
}
