//! Decoding of string literal pieces.

use super::error::{ParseError, ParseErrorKind};
use cirrus_ast::TextSpan;
use cirrus_lexer::{Token, TokenKind};

/// Decoded text of a string token, plus any escape errors.
///
/// Piece tokens are decoded leniently: a missing closing quote (already
/// reported by the lexer) is tolerated.
pub(crate) fn decode_piece(token: &Token) -> (String, Vec<ParseError>) {
    match token.kind {
        TokenKind::MultilineString => (decode_multiline(&token.text), Vec::new()),
        _ => decode_escaped(token),
    }
}

/// `'''` strings are verbatim. A line break directly after the opening
/// delimiter is dropped.
fn decode_multiline(text: &str) -> String {
    let body = &text[3..];
    let body = body.strip_suffix("'''").unwrap_or(body);
    body.strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .or_else(|| body.strip_prefix('\r'))
        .unwrap_or(body)
        .to_string()
}

fn decode_escaped(token: &Token) -> (String, Vec<ParseError>) {
    let text = token.text.as_str();
    // Opening delimiter: `'` for complete and left pieces, `}` otherwise.
    let body = &text[1..];
    let base = token.span.start + 1;

    let mut out = String::with_capacity(body.len());
    let mut errors = Vec::new();
    let mut chars = body.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\'' => break,
            '$' if matches!(chars.peek(), Some((_, '{'))) => break,
            '\\' => {
                let Some((next_idx, next)) = chars.next() else {
                    // Trailing backslash of an unterminated string.
                    out.push('\\');
                    break;
                };
                match next {
                    '\\' => out.push('\\'),
                    '\'' => out.push('\''),
                    'n' => out.push('\n'),
                    'r' => out.push('\r'),
                    't' => out.push('\t'),
                    '$' => out.push('$'),
                    'u' => match decode_unicode(&body[next_idx + 1..]) {
                        Some((ch, consumed)) => {
                            out.push(ch);
                            for _ in 0..consumed {
                                chars.next();
                            }
                        }
                        None => {
                            errors.push(invalid_escape(base, idx, next_idx + 1, "\\u"));
                        }
                    },
                    other => {
                        let end = next_idx + other.len_utf8();
                        errors.push(invalid_escape(base, idx, end, &body[idx..end]));
                    }
                }
            }
            _ => out.push(ch),
        }
    }
    (out, errors)
}

/// Parse `{XXXX}` after `\u`; returns the character and the number of
/// characters consumed.
fn decode_unicode(rest: &str) -> Option<(char, usize)> {
    let inner = rest.strip_prefix('{')?;
    let close = inner.find('}')?;
    let digits = &inner[..close];
    if digits.is_empty() || digits.len() > 6 {
        return None;
    }
    let value = u32::from_str_radix(digits, 16).ok()?;
    let ch = char::from_u32(value)?;
    Some((ch, digits.len() + 2))
}

fn invalid_escape(base: u32, start: usize, end: usize, sequence: &str) -> ParseError {
    ParseError::new(
        ParseErrorKind::InvalidEscape,
        TextSpan::new(base + start as u32, base + end as u32),
        format!(
            "the escape sequence '{sequence}' is not recognized; valid escapes are \\\\ \\' \\n \\r \\t \\$ and \\u{{...}}"
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_lexer::lex;

    fn decode(source: &str) -> (Vec<String>, usize) {
        let result = lex(source);
        let mut pieces = Vec::new();
        let mut errors = 0;
        for token in result.tokens.iter().filter(|t| t.kind.is_string()) {
            let (text, errs) = decode_piece(token);
            pieces.push(text);
            errors += errs.len();
        }
        (pieces, errors)
    }

    #[test]
    fn test_simple_escapes() {
        let (pieces, errors) = decode(r"'a\'b\\c\nd\$e'");
        assert_eq!(pieces, vec!["a'b\\c\nd$e"]);
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_interpolation_pieces() {
        let (pieces, _) = decode("'pre${x}mid${y}post'");
        assert_eq!(pieces, vec!["pre", "mid", "post"]);
    }

    #[test]
    fn test_unicode_escape() {
        let (pieces, errors) = decode(r"'\u{1F600}x'");
        assert_eq!(pieces, vec!["\u{1F600}x"]);
        assert_eq!(errors, 0);
    }

    #[test]
    fn test_invalid_escape_reports_span() {
        let result = lex(r"'a\qb'");
        let (text, errors) = decode_piece(&result.tokens[0]);
        assert_eq!(text, "ab");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].span, TextSpan::new(2, 4));
    }

    #[test]
    fn test_unterminated_is_lenient() {
        let (pieces, _) = decode("'open");
        assert_eq!(pieces, vec!["open"]);
    }

    #[test]
    fn test_multiline_drops_first_line_break() {
        let (pieces, _) = decode("'''\r\nfirst\nsecond'''");
        assert_eq!(pieces, vec!["first\nsecond"]);
        let (pieces, _) = decode("'''inline ${x}'''");
        assert_eq!(pieces, vec!["inline ${x}"]);
    }
}
