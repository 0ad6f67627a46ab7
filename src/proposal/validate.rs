use std::sync::LazyLock;

use regex::Regex;

static ROOT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<html[\s>]").expect("root marker pattern is valid"));

/// True when `text` carries a top-level `<html` root marker (any case).
pub(crate) fn is_full_document(text: &str) -> bool {
    ROOT_MARKER.is_match(text.trim())
}

/// Strip one surrounding Markdown code fence (```html ... ```), if present.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // The opening fence line may carry a language tag.
    match body.split_once('\n') {
        Some((tag, inner))
            if !tag.trim().contains(char::is_whitespace) && !tag.trim().starts_with('<') =>
        {
            inner.trim()
        }
        Some(_) => body.trim(),
        None => strip_inline_tag(body.trim()),
    }
}

/// Single-line fence: a language tag directly followed by markup.
fn strip_inline_tag(body: &str) -> &str {
    let tag_len = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '+'))
        .unwrap_or(body.len());
    let rest = &body[tag_len..];
    if tag_len > 0 && rest.trim_start().starts_with('<') {
        rest.trim()
    } else {
        body
    }
}

pub(crate) fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Minimal valid document whose body shows `raw` verbatim as plain text.
pub(crate) fn wrap_as_document(raw: &str, title: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n  <meta charset=\"UTF-8\">\n  <title>{}</title>\n</head>\n\
         <body>\n<pre>{}</pre>\n</body>\n\
         </html>",
        escape_html(title),
        escape_html(raw)
    )
}

/// First `max` characters of `s` (char based, never splits a code point).
pub(crate) fn preview_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Base document used when a session (or a request) has no prior content.
pub(crate) fn starter_document(name: &str) -> String {
    let title = escape_html(name);
    [
        "<!DOCTYPE html>",
        "<html lang=\"en\">",
        "<head>",
        "  <meta charset=\"UTF-8\">",
        "  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">",
        &format!("  <title>{title}</title>"),
        "  <style>",
        "    body { margin: 0; min-height: 100vh; display: flex; align-items: center;",
        "           justify-content: center; font-family: system-ui, sans-serif;",
        "           background: #0b0f1b; color: #f5f7ff; }",
        "    .card { max-width: 640px; padding: 1.5rem; border-radius: 0.8rem;",
        "            border: 1px solid rgba(148, 163, 184, 0.3); background: #141a2e; }",
        "    h1 { margin: 0 0 0.6rem; font-size: 1.5rem; }",
        "    p { margin: 0.2rem 0; color: #cbd5f5; }",
        "  </style>",
        "</head>",
        "<body>",
        "  <div class=\"card\">",
        &format!("    <h1>{title}</h1>"),
        "    <p>Describe a change and review the proposal before applying it.</p>",
        "  </div>",
        "</body>",
        "</html>",
    ]
    .join("\n")
}
