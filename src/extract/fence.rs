use regex::Regex;

/// Returns the body of the first fenced code block, or the trimmed input
///
/// With a language the fence may carry that tag or none at all; without one
/// any single-word tag is accepted.
pub fn strip_code_fence(content: &str, language: Option<&str>) -> String {
    let tag = match language {
        Some(lang) => regex::escape(lang),
        None => r"\w+".to_string(),
    };
    let pattern = format!(r"(?s)```(?:{})?[ \t]*\r?\n(.*?)```", tag);

    match Regex::new(&pattern) {
        Ok(re) => match re.captures(content).and_then(|c| c.get(1)) {
            Some(body) => body.as_str().trim().to_string(),
            None => content.trim().to_string(),
        },
        Err(_) => content.trim().to_string(),
    }
}

/// Drops a leading ```` ```lang ```` line and a trailing ```` ``` ````
///
/// Either edge may be missing, which happens when a fenced response is cut
/// off and the rest arrives in a continuation.
pub fn strip_fence_edges(content: &str) -> String {
    let mut text = content.trim();
    if let Some(rest) = text.strip_prefix("```") {
        let (tag, body) = rest.split_once('\n').unwrap_or((rest, ""));
        if tag
            .trim()
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '+'))
        {
            text = body;
        }
    }
    if let Some(body) = text.trim_end().strip_suffix("```") {
        text = body;
    }
    text.trim().to_string()
}
