use diagnostics::{Span, SyntaxError};
use ql_lexer::{Keyword, Token, TokenKind};

/// A simple lookahead cursor over a pre-lexed token vector. The lexer
/// itself is lazy (spec.md §4.1); the parser re-materializes the token
/// stream once up front because the Pratt-style precedence climbing below
/// frequently needs more than one token of lookahead (e.g. distinguishing
/// `expr[i]` from `expr[is T]`).
pub struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Cursor<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Cursor { tokens, pos: 0 }
    }

    pub fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    pub fn peek_at(&self, ahead: usize) -> &TokenKind {
        let idx = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    pub fn span(&self) -> Span {
        self.tokens[self.pos.min(self.tokens.len() - 1)].span
    }

    pub fn prev_span(&self) -> Span {
        let idx = self.pos.saturating_sub(1).min(self.tokens.len() - 1);
        self.tokens[idx].span
    }

    pub fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    pub fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if *k == kw)
    }

    pub fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.is_keyword(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn expect_keyword(&mut self, kw: Keyword) -> Result<Span, SyntaxError> {
        if self.is_keyword(kw) {
            Ok(self.bump().span)
        } else {
            Err(SyntaxError::parse(
                self.span(),
                format!("expected keyword `{kw:?}`, found {:?}", self.peek()),
            ))
        }
    }

    pub fn is_kind(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    pub fn eat_kind(&mut self, kind: &TokenKind) -> bool {
        if self.is_kind(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub fn expect_kind(&mut self, kind: TokenKind) -> Result<Span, SyntaxError> {
        if self.is_kind(&kind) {
            Ok(self.bump().span)
        } else {
            Err(SyntaxError::parse(
                self.span(),
                format!("expected {kind:?}, found {:?}", self.peek()),
            ))
        }
    }

    pub fn expect_ident(&mut self) -> Result<(String, Span), SyntaxError> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                let span = self.bump().span;
                Ok((name, span))
            }
            other => Err(SyntaxError::parse(self.span(), format!("expected identifier, found {other:?}"))),
        }
    }

    /// Like [`Self::expect_ident`], but also accepts unreserved keywords as
    /// identifier text (`keyword.rs`: "unreserved keywords can appear as an
    /// identifier where the grammar isn't ambiguous — the parser decides").
    pub fn expect_word(&mut self) -> Result<(String, Span), SyntaxError> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                let span = self.bump().span;
                Ok((name, span))
            }
            TokenKind::Keyword(kw) if !kw.is_reserved() => {
                let span = self.bump().span;
                Ok((kw.as_str().to_string(), span))
            }
            other => Err(SyntaxError::parse(self.span(), format!("expected identifier, found {other:?}"))),
        }
    }
}
