//! Identifier escaping and unescaping.
//! Spec: <https://drafts.csswg.org/cssom/#serialize-an-identifier>
//! Spec: <https://www.w3.org/TR/css-syntax-3/#consume-escaped-code-point>

use core::fmt::Write as _;

/// Serialize `ident` so it can be embedded in a selector as a class, id or
/// attribute value, mirroring `CSS.escape()`.
///
/// Spec: <https://drafts.csswg.org/cssom/#serialize-an-identifier>
pub fn escape_identifier(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    let chars: Vec<char> = ident.chars().collect();
    let first = chars.first().copied();
    for (index, &character) in chars.iter().enumerate() {
        let code = u32::from(character);
        if code == 0 {
            out.push('\u{FFFD}');
        } else if (0x1..=0x1F).contains(&code)
            || code == 0x7F
            || (index == 0 && character.is_ascii_digit())
            || (index == 1 && character.is_ascii_digit() && first == Some('-'))
        {
            push_code_point_escape(&mut out, code);
        } else if index == 0 && character == '-' && chars.len() == 1 {
            out.push_str("\\-");
        } else if code >= 0x80
            || character == '-'
            || character == '_'
            || character.is_ascii_alphanumeric()
        {
            out.push(character);
        } else {
            out.push('\\');
            out.push(character);
        }
    }
    out
}

/// Escape as code point: backslash, lowercase hex, trailing space.
fn push_code_point_escape(out: &mut String, code: u32) {
    // Writing into a String cannot fail.
    if write!(out, "\\{code:x} ").is_err() {
        out.push('\u{FFFD}');
    }
}

/// Consume the escape that follows a backslash at `chars[*index]`.
/// On return `*index` points past the escape.
///
/// Spec: <https://www.w3.org/TR/css-syntax-3/#consume-escaped-code-point>
pub(crate) fn consume_escape(chars: &[char], index: &mut usize) -> char {
    let Some(&first) = chars.get(*index) else {
        return '\u{FFFD}';
    };
    if !first.is_ascii_hexdigit() {
        *index = index.saturating_add(1);
        return first;
    }
    let mut value = 0u32;
    let mut digits = 0usize;
    while digits < 6 {
        let Some(digit) = chars.get(*index).and_then(|character| character.to_digit(16)) else {
            break;
        };
        value = value.saturating_mul(16).saturating_add(digit);
        digits = digits.saturating_add(1);
        *index = index.saturating_add(1);
    }
    if chars
        .get(*index)
        .is_some_and(|character| character.is_ascii_whitespace())
    {
        *index = index.saturating_add(1);
    }
    if value == 0 {
        return '\u{FFFD}';
    }
    char::from_u32(value).unwrap_or('\u{FFFD}')
}
