//! Standalone HTML document wrapping exported report content

use chrono::{DateTime, Local};
use std::fmt::{self, Write};

/// Write the export template around `content`, which is inserted verbatim.
pub fn write<W: Write>(writer: &mut W, title: &str, generated: &str, content: &str) -> fmt::Result {
    let title = escape(title);
    let generated = escape(generated);

    write!(writer, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>
        body {{ font-family: system-ui, sans-serif; margin: 20px; }}
        img {{ max-width: 100%; height: auto; }}
        .image-card {{ margin: 20px 0; padding: 15px; border: 1px solid #ddd; border-radius: 8px; }}
    </style>
</head>
<body>
    <h1>{title}</h1>
    <p>Generated on: {generated}</p>
    <hr>
{content}
</body>
</html>
"#)
}

pub fn render(title: &str, generated: &str, content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 1024);
    // Writing into a String cannot fail
    let _ = write(&mut out, title, generated, content);
    out
}

/// Local wall-clock time the way a browser's `toLocaleString` shows it
pub fn format_generated(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
