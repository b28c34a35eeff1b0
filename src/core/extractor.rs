//! Recover a JSON document from free-form model output.
//!
//! Models wrap JSON in markdown fences or in prose more often than not. The
//! extractor never fails; when nothing JSON-shaped is found it returns the
//! trimmed input and lets validation reject it.

/// Extract JSON text from a raw completion.
///
/// Priority:
/// 1. the interior of a fenced ```json block (or a bare fence holding JSON)
/// 2. the first balanced `{...}` or `[...]` region
/// 3. the trimmed input
pub fn extract(raw: &str) -> String {
    if let Some(fenced) = fenced_block(raw) {
        return fenced.to_string();
    }

    if let Some(block) = balanced_block(raw) {
        return block.to_string();
    }

    raw.trim().to_string()
}

/// Interior of the first fenced code block holding JSON
fn fenced_block(text: &str) -> Option<&str> {
    if let Some(start) = text.find("```json") {
        let start = start + "```json".len();
        if let Some(end) = closing_fence(&text[start..]) {
            return Some(text[start..start + end].trim());
        }
    }

    // Bare ``` fence, only if it opens a line and looks like JSON
    if let Some(start) = line_fence(text) {
        let rest = &text[start + 3..];
        // Skip an info string such as ```JSON or ```javascript
        let body_start = rest.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &rest[body_start..];
        if let Some(end) = closing_fence(body) {
            let content = body[..end].trim();
            if content.starts_with('{') || content.starts_with('[') {
                return Some(content);
            }
        }
    }

    None
}

/// Offset of the first ``` that opens a line, ignoring indentation
fn line_fence(text: &str) -> Option<usize> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        if line[indent..].starts_with("```") {
            return Some(offset + indent);
        }
        offset += line.len();
    }
    None
}

/// Offset of the fence closing a block body.
///
/// Backticks may appear inside JSON strings, so a fence opening a line wins;
/// otherwise the last fence in the body closes it.
fn closing_fence(body: &str) -> Option<usize> {
    line_fence(body).or_else(|| body.rfind("```"))
}

/// First `{...}` or `[...]` region where bracket depth returns to zero.
///
/// String literals and escapes are honoured, so braces inside JSON strings
/// do not confuse the scan.
fn balanced_block(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let bytes = s.as_bytes();

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if escape_next {
            escape_next = false;
            continue;
        }

        if in_string {
            match b {
                b'\\' => escape_next = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..=i]);
                }
            }
            _ => {}
        }
    }

    None
}
