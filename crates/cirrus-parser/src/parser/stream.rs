//! Token stream wrapper for the recursive descent parser.

use cirrus_ast::{TextSpan, TokenId};
use cirrus_lexer::{Token, TokenKind};

/// Token stream with lookahead and rewind.
///
/// The underlying slice always ends with an `EndOfFile` token; the stream
/// never advances past it, so `peek` is total.
pub struct TokenStream<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> TokenStream<'t> {
    /// # Panics
    /// Panics if `tokens` does not end with `EndOfFile`.
    pub fn new(tokens: &'t [Token]) -> Self {
        assert!(
            matches!(tokens.last(), Some(t) if t.kind == TokenKind::EndOfFile),
            "BUG: token stream must end with EndOfFile"
        );
        Self { tokens, pos: 0 }
    }

    pub fn peek(&self) -> &'t Token {
        &self.tokens[self.pos]
    }

    pub fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    /// Look `n` tokens ahead, clamped to the end-of-file token.
    pub fn peek_nth(&self, n: usize) -> &'t Token {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// True if the current token is the contextual keyword `keyword`.
    pub fn check_keyword(&self, keyword: &str) -> bool {
        self.peek().is_keyword(keyword)
    }

    /// Consume the current token. At end of file this returns the
    /// end-of-file token without moving.
    pub fn advance(&mut self) -> TokenId {
        let id = TokenId(self.pos as u32);
        if !self.at_end() {
            self.pos += 1;
        }
        id
    }

    pub fn at_end(&self) -> bool {
        self.tokens[self.pos].kind == TokenKind::EndOfFile
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn rewind(&mut self, pos: usize) {
        debug_assert!(pos <= self.pos, "rewind must move backwards");
        self.pos = pos;
    }

    pub fn current_span(&self) -> TextSpan {
        self.tokens[self.pos].span
    }

    /// End offset of the last consumed token, or 0 at the start.
    pub fn previous_end(&self) -> u32 {
        match self.pos.checked_sub(1) {
            Some(prev) => self.tokens[prev].span.end,
            None => 0,
        }
    }

    /// Kind of the last consumed token.
    pub fn previous_kind(&self) -> Option<TokenKind> {
        self.pos.checked_sub(1).map(|prev| self.tokens[prev].kind)
    }

    pub fn token(&self, id: TokenId) -> &'t Token {
        &self.tokens[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cirrus_lexer::lex;

    #[test]
    fn test_advance_stops_at_eof() {
        let tokens = lex("a").tokens;
        let mut stream = TokenStream::new(&tokens);
        assert_eq!(stream.advance(), TokenId(0));
        assert!(stream.at_end());
        assert_eq!(stream.advance(), TokenId(1));
        assert_eq!(stream.advance(), TokenId(1));
        assert_eq!(stream.peek_nth(10).kind, TokenKind::EndOfFile);
    }

    #[test]
    fn test_rewind_and_previous_end() {
        let tokens = lex("var x").tokens;
        let mut stream = TokenStream::new(&tokens);
        assert_eq!(stream.previous_end(), 0);
        stream.advance();
        stream.advance();
        assert_eq!(stream.previous_end(), 5);
        stream.rewind(1);
        assert!(stream.check_keyword("x"));
    }
}
