//! Splits an HTML fragment into its top-level nodes so each one can be
//! inserted and tracked (and later removed) individually.
//!
//! This is a fragment scanner, not a full parser: it understands elements
//! with nesting, void and self-closing elements, raw-text elements whose
//! content is opaque (`<script>`, `<style>`, ...), comments, markup
//! declarations and text runs. Structurally broken markup (an unclosed
//! element, a stray closing tag, an unterminated comment) is an error that
//! the caller reports as an injection failure.

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose content is raw text up to the matching closing tag.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

struct Tag {
    name: String,
    closing: bool,
    self_closing: bool,
    /// Byte index just past the `>`.
    end: usize,
}

/// Splits `fragment` into top-level node strings: elements (with their full
/// subtree), comments, and non-whitespace text runs, in source order.
/// Whitespace-only text between nodes is dropped, so a blank fragment yields
/// zero nodes.
pub fn split_top_level(fragment: &str) -> Result<Vec<String>, String> {
    let bytes = fragment.as_bytes();
    let mut nodes = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        if is_markup_start(bytes, pos) {
            if bytes[pos..].starts_with(b"<!--") {
                let end = find_from(bytes, b"-->", pos + 4)
                    .ok_or_else(|| "unterminated comment".to_string())?;
                nodes.push(fragment[pos..end + 3].to_string());
                pos = end + 3;
            } else if bytes[pos + 1] == b'!' {
                // Markup declaration (doctype etc.) is skipped, not a node.
                let gt = find_from(bytes, b">", pos)
                    .ok_or_else(|| "unterminated markup declaration".to_string())?;
                pos = gt + 1;
            } else if bytes[pos + 1] == b'/' {
                let tag = scan_tag(bytes, pos)?;
                return Err(format!("unexpected closing tag </{}>", tag.name));
            } else {
                let end = scan_element(bytes, pos)?;
                nodes.push(fragment[pos..end].to_string());
                pos = end;
            }
        } else {
            let start = pos;
            pos += 1;
            while pos < bytes.len() && !is_markup_start(bytes, pos) {
                pos += 1;
            }
            let text = fragment[start..pos].trim();
            if !text.is_empty() {
                nodes.push(text.to_string());
            }
        }
    }

    Ok(nodes)
}

/// A `<` only opens markup when followed by a tag name, `/` or `!`;
/// otherwise it is literal text (`a < b`).
fn is_markup_start(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'<'
        && i + 1 < bytes.len()
        && (bytes[i + 1].is_ascii_alphabetic() || bytes[i + 1] == b'/' || bytes[i + 1] == b'!')
}

fn find_from(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| from + i)
}

/// Case-insensitive search for `</name` starting at `from`. The name must be
/// complete: the next byte has to end the tag name (`>`, `/` or whitespace),
/// so `</script` does not match inside `</scripty>`.
fn find_closing_tag(bytes: &[u8], name: &str, from: usize) -> Option<usize> {
    let mut needle = Vec::with_capacity(name.len() + 2);
    needle.extend_from_slice(b"</");
    needle.extend_from_slice(name.as_bytes());
    if from > bytes.len() || needle.len() > bytes.len() {
        return None;
    }

    let mut at = from;
    while let Some(i) = bytes[at..]
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(&needle))
    {
        let start = at + i;
        match bytes.get(start + needle.len()) {
            Some(b'>') | Some(b'/') => return Some(start),
            Some(b) if b.is_ascii_whitespace() => return Some(start),
            Some(_) => at = start + 1,
            None => return None,
        }
    }
    None
}

/// Scans a single tag starting at `<`, honoring quoted attribute values.
fn scan_tag(bytes: &[u8], start: usize) -> Result<Tag, String> {
    let mut i = start + 1;
    let mut closing = false;
    if i < bytes.len() && bytes[i] == b'/' {
        closing = true;
        i += 1;
    }

    let name_start = i;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
        i += 1;
    }
    if i == name_start {
        return Err("malformed tag".to_string());
    }
    let name = std::str::from_utf8(&bytes[name_start..i])
        .map_err(|_| "malformed tag name".to_string())?
        .to_ascii_lowercase();

    let mut quote: Option<u8> = None;
    let mut prev = 0u8;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'>' => {
                    return Ok(Tag {
                        name,
                        closing,
                        self_closing: prev == b'/',
                        end: i + 1,
                    });
                }
                _ => {
                    if !b.is_ascii_whitespace() {
                        prev = b;
                    }
                }
            },
        }
        i += 1;
    }
    Err(format!("unterminated <{}> tag", name))
}

/// Scans a full element (open tag through matching close) starting at `<`.
/// Returns the byte index just past the closing tag.
fn scan_element(bytes: &[u8], start: usize) -> Result<usize, String> {
    let open = scan_tag(bytes, start)?;
    let mut pos = open.end;

    if open.self_closing || VOID_ELEMENTS.contains(&open.name.as_str()) {
        return Ok(pos);
    }
    if RAW_TEXT_ELEMENTS.contains(&open.name.as_str()) {
        return skip_raw_text(bytes, &open.name, pos);
    }

    // Open-element stack; every closing tag must match the innermost open
    // element by name.
    let mut stack = vec![open.name];
    while pos < bytes.len() {
        if !is_markup_start(bytes, pos) {
            pos += 1;
            continue;
        }
        if bytes[pos..].starts_with(b"<!--") {
            let end = find_from(bytes, b"-->", pos + 4)
                .ok_or_else(|| "unterminated comment".to_string())?;
            pos = end + 3;
        } else if bytes[pos + 1] == b'!' {
            let gt = find_from(bytes, b">", pos)
                .ok_or_else(|| "unterminated markup declaration".to_string())?;
            pos = gt + 1;
        } else {
            let tag = scan_tag(bytes, pos)?;
            pos = tag.end;
            if tag.closing {
                let expected = stack.pop().expect("stack holds the open element");
                if tag.name != expected {
                    return Err(format!(
                        "mismatched closing tag </{}>, expected </{}>",
                        tag.name, expected
                    ));
                }
                if stack.is_empty() {
                    return Ok(pos);
                }
            } else if tag.self_closing || VOID_ELEMENTS.contains(&tag.name.as_str()) {
                // No nesting change.
            } else if RAW_TEXT_ELEMENTS.contains(&tag.name.as_str()) {
                pos = skip_raw_text(bytes, &tag.name, pos)?;
            } else {
                stack.push(tag.name);
            }
        }
    }
    Err(format!(
        "unclosed <{}> element",
        stack.last().expect("stack holds the open element")
    ))
}

/// Skips the opaque content of a raw-text element and its closing tag.
fn skip_raw_text(bytes: &[u8], name: &str, from: usize) -> Result<usize, String> {
    let close = find_closing_tag(bytes, name, from)
        .ok_or_else(|| format!("unclosed <{}> element", name))?;
    let gt = find_from(bytes, b">", close)
        .ok_or_else(|| format!("unterminated </{}> tag", name))?;
    Ok(gt + 1)
}
