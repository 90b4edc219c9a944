//! Low-level text scanning shared by the expression parser, the template
//! resolver and the declaration parser.
//!
//! All positions are byte offsets. The scanner only ever stops on ASCII
//! characters, so slicing at the returned offsets is always on a char boundary.

use crate::value::Format;

/// A `$[w[.p]]{name}` reference found in some text.
#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub name: String,
    pub format: Format,
    /// offset just past the closing brace
    pub end: usize,
}

pub fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic()
}

pub fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Length of the identifier starting at `start`, 0 if there is none.
pub fn ident_len(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    match bytes.get(start) {
        Some(c) if is_ident_start(*c) => {
            1 + bytes[start + 1..].iter().take_while(|c| is_ident_char(**c)).count()
        }
        _ => 0,
    }
}

fn digits_at(bytes: &[u8], start: usize) -> usize {
    bytes.get(start..).map_or(0, |rest| rest.iter().take_while(|c| c.is_ascii_digit()).count())
}

/// Reads a variable reference starting at `idx`, which must point at `$`.
pub fn var_ref_at(text: &str, idx: usize) -> Option<VarRef> {
    let bytes = text.as_bytes();
    if bytes.get(idx) != Some(&b'$') {
        return None;
    }
    let mut i = idx + 1;
    let mut format = Format::default();
    let n = digits_at(bytes, i);
    if n > 0 {
        format.width = text[i..i + n].parse().ok();
        i += n;
        if bytes.get(i) == Some(&b'.') {
            let p = digits_at(bytes, i + 1);
            if p == 0 {
                return None;
            }
            format.precision = text[i + 1..i + 1 + p].parse().ok();
            i += 1 + p;
        }
    }
    if bytes.get(i) != Some(&b'{') {
        return None;
    }
    i += 1;
    let len = ident_len(text, i);
    if len == 0 || bytes.get(i + len) != Some(&b'}') {
        return None;
    }
    Some(VarRef { name: text[i..i + len].to_owned(), format, end: i + len + 1 })
}

/// Finds the next occurrence of `target` at or after `start`.
///
/// Backslash escapes are skipped, and so are whole variable references.
/// A quote character is found wherever it appears unescaped (so the closing
/// quote of a string can be located); any other character is only found
/// outside quoted text.
pub fn scan_for(text: &str, target: u8, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = start;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b'\\' => {
                i += 2;
                continue;
            }
            b'$' => {
                if let Some(r) = var_ref_at(text, i) {
                    i = r.end;
                    continue;
                }
            }
            b'"' | b'\'' => {
                if c == target {
                    return Some(i);
                }
                quote = match quote {
                    None => Some(c),
                    Some(q) if q == c => None,
                    other => other,
                };
            }
            _ if c == target && quote.is_none() => return Some(i),
            _ => {}
        }
        i += 1;
    }
    None
}

/// True if the text holds at least one well-formed, unescaped reference.
pub fn contains_reference(text: &str) -> bool {
    next_reference(text, 0).is_some()
}

/// Offset and contents of the next unescaped reference at or after `start`.
pub fn next_reference(text: &str, start: usize) -> Option<(usize, VarRef)> {
    let bytes = text.as_bytes();
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' => match var_ref_at(text, i) {
                Some(r) => return Some((i, r)),
                None => i += 1,
            },
            _ => i += 1,
        }
    }
    None
}

pub fn has_unescaped_quote(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return true,
            _ => i += 1,
        }
    }
    false
}

/// Resolves backslash escapes: `\n`, `\t` and `\r` become control
/// characters, any other escaped character stands for itself.
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

pub fn skip_blanks(text: &str, start: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = start;
    while i < bytes.len() && (bytes[i] == b' ' || bytes[i] == b'\t') {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_with_format() {
        let r = var_ref_at("x$8.2{abc_1}y", 1).expect("reference");
        assert_eq!(r.name, "abc_1");
        assert_eq!(r.format, Format::new(Some(8), Some(2)));
        assert_eq!(r.end, 12);
        assert!(var_ref_at("${1abc}", 0).is_none());
        assert!(var_ref_at("$5.{a}", 0).is_none());
    }

    #[test]
    fn scanning_respects_quotes_and_escapes() {
        let text = r#"a == "x ? y" \? b ? c"#;
        assert_eq!(scan_for(text, b'?', 0), Some(18));
        assert_eq!(scan_for(r#""ab\"c" rest"#, b'"', 1), Some(6));
        assert_eq!(scan_for("${a} ? b", b'?', 0), Some(5));
    }

    #[test]
    fn unescaping() {
        assert_eq!(unescape(r"a\tb\\c\q"), "a\tb\\cq");
    }
}
