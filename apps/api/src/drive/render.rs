//! HTML rendering of an entry for upload as a Google Doc.

use crate::models::entry::EntryRow;

/// Renders the entry as a standalone HTML page. Every user-supplied value is escaped.
pub fn render_entry_html(entry: &EntryRow) -> String {
    let entry_type = escape_html(&entry.type_label());
    let title = escape_html(&entry.title);
    let created = entry.created_at.format("%Y-%m-%d %H:%M:%S");

    let mut html = format!(
        "<html>\n<head><title>[{entry_type}] {title}</title></head>\n<body>\n<h1>{title}</h1>\n\
         <p><strong>Type:</strong> {entry_type} &nbsp; <strong>Date:</strong> {created}</p>\n"
    );

    if !entry.url.is_empty() {
        let url = escape_html(&entry.url);
        html.push_str(&format!(
            "<p><strong>URL:</strong> <a href=\"{url}\">{url}</a></p>\n"
        ));
    }

    for line in entry.content.lines().filter(|l| !l.trim().is_empty()) {
        html.push_str(&format!("<p>{}</p>\n", escape_html(line)));
    }

    html.push_str("</body></html>");
    html
}

/// Escapes the five HTML-significant characters, quotes included so the
/// result is safe inside attribute values.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
