//! Phase L (spec.md §4.1): turns source text into a sequence of tokens.
//!
//! Kept as a hand-rolled scanner rather than a grammar-generator rule set:
//! the dollar-quoting and raw/byte string forms need dynamic tag matching
//! and escape-mode switches that read most naturally as a small state
//! machine over the source bytes, the way most hand-written compiler
//! lexers (and `rustc`'s own) are built.

mod keyword;
mod token;

pub use keyword::Keyword;
pub use token::{NumberKind, Token, TokenKind};

use diagnostics::{Span, SyntaxError};

pub struct Lexer<'a> {
    src: &'a str,
    chars: Vec<(u32, char)>,
    pos: usize,
    eof_offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        let chars: Vec<(u32, char)> = src.char_indices().map(|(i, c)| (i as u32, c)).collect();
        let eof_offset = src.len() as u32;
        Lexer {
            src,
            chars,
            pos: 0,
            eof_offset,
        }
    }

    /// Tokenizes the whole input eagerly. The lexer still only looks one
    /// token ahead internally; this just drives it to exhaustion, which is
    /// what every caller in this workspace wants (the parser re-wraps the
    /// vector as its own lazy cursor).
    pub fn tokenize(src: &'a str) -> Result<Vec<Token>, SyntaxError> {
        let mut lexer = Lexer::new(src);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token()?;
            let is_eof = tok.is_eof();
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> char {
        self.chars.get(self.pos).map(|&(_, c)| c).unwrap_or('\0')
    }

    fn peek_at(&self, ahead: usize) -> char {
        self.chars.get(self.pos + ahead).map(|&(_, c)| c).unwrap_or('\0')
    }

    fn offset(&self) -> u32 {
        self.chars.get(self.pos).map(|&(o, _)| o).unwrap_or(self.eof_offset)
    }

    fn bump(&mut self) -> char {
        let c = self.peek();
        if c != '\0' {
            self.pos += 1;
        }
        c
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                ' ' | '\t' | '\r' | '\n' => {
                    self.bump();
                }
                '#' => {
                    while !self.at_eof() && self.peek() != '\n' {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        self.skip_trivia();
        let start = self.offset();

        if self.at_eof() {
            return Ok(Token::new(TokenKind::Eof, Span::new(start, start)));
        }

        let c = self.peek();

        if c.is_ascii_digit() {
            return self.lex_number(start);
        }

        if c == '`' {
            return self.lex_backtick_ident(start);
        }

        if c == '\'' || c == '"' {
            let s = self.lex_quoted(start, false)?;
            return Ok(Token::new(TokenKind::Str(s), Span::new(start, self.offset())));
        }

        if c == '$' {
            return self.lex_dollar(start);
        }

        if is_ident_start(c) {
            return self.lex_ident_like(start);
        }

        self.lex_operator(start)
    }

    fn lex_ident_like(&mut self, start: u32) -> Result<Token, SyntaxError> {
        // `r'...'`/`r"..."` raw strings, `b'...'`/`rb'...'`/`br'...'` byte
        // strings are lexed here because they share the identifier-start
        // character class with ordinary identifiers; we only commit to the
        // string interpretation once we see the quote follow immediately.
        let c0 = self.peek();
        if (c0 == 'r' || c0 == 'R') && matches!(self.peek_at(1), '\'' | '"') {
            self.bump();
            let s = self.lex_quoted(start, true)?;
            return Ok(Token::new(TokenKind::Str(s), Span::new(start, self.offset())));
        }
        if (c0 == 'b' || c0 == 'B') && matches!(self.peek_at(1), '\'' | '"') {
            self.bump();
            let bytes = self.lex_byte_quoted(start, false)?;
            return Ok(Token::new(TokenKind::Bytes(bytes), Span::new(start, self.offset())));
        }
        if (c0 == 'r' || c0 == 'R') && matches!(self.peek_at(1), 'b' | 'B') && matches!(self.peek_at(2), '\'' | '"') {
            self.bump();
            self.bump();
            let bytes = self.lex_byte_quoted(start, true)?;
            return Ok(Token::new(TokenKind::Bytes(bytes), Span::new(start, self.offset())));
        }
        if (c0 == 'b' || c0 == 'B') && matches!(self.peek_at(1), 'r' | 'R') && matches!(self.peek_at(2), '\'' | '"') {
            self.bump();
            self.bump();
            let bytes = self.lex_byte_quoted(start, true)?;
            return Ok(Token::new(TokenKind::Bytes(bytes), Span::new(start, self.offset())));
        }

        let mut text = String::new();
        while is_ident_continue(self.peek()) {
            text.push(self.bump());
        }
        let span = Span::new(start, self.offset());
        if let Some(kw) = Keyword::lookup(&text) {
            Ok(Token::new(TokenKind::Keyword(kw), span))
        } else {
            Ok(Token::new(TokenKind::Ident(text), span))
        }
    }

    /// Backtick-quoted identifier: "any character except `@` prefix and
    /// `::` substring; doubled backtick encodes a literal backtick"
    /// (spec.md §3.1).
    fn lex_backtick_ident(&mut self, start: u32) -> Result<Token, SyntaxError> {
        self.bump(); // opening `
        let mut text = String::new();
        loop {
            if self.at_eof() {
                return Err(SyntaxError::lexical(
                    Span::new(start, self.offset()),
                    "unterminated backtick-quoted identifier",
                ));
            }
            let c = self.bump();
            if c == '`' {
                if self.peek() == '`' {
                    self.bump();
                    text.push('`');
                    continue;
                }
                break;
            }
            text.push(c);
        }
        if text.starts_with('@') {
            return Err(SyntaxError::lexical(
                Span::new(start, self.offset()),
                "backtick-quoted identifiers may not start with `@`",
            ));
        }
        if text.contains("::") {
            return Err(SyntaxError::lexical(
                Span::new(start, self.offset()),
                "backtick-quoted identifiers may not contain `::`",
            ));
        }
        if text.is_empty() {
            return Err(SyntaxError::lexical(
                Span::new(start, self.offset()),
                "empty backtick-quoted identifier",
            ));
        }
        Ok(Token::new(TokenKind::Ident(text), Span::new(start, self.offset())))
    }

    fn lex_number(&mut self, start: u32) -> Result<Token, SyntaxError> {
        let mut text = String::new();
        let mut is_float = false;

        while self.peek().is_ascii_digit() {
            text.push(self.bump());
        }

        if self.peek() == '.' && self.peek_at(1).is_ascii_digit() {
            is_float = true;
            text.push(self.bump());
            while self.peek().is_ascii_digit() {
                text.push(self.bump());
            }
        }

        if matches!(self.peek(), 'e' | 'E') {
            let save = self.pos;
            let mut exp = String::new();
            exp.push(self.bump());
            if matches!(self.peek(), '+' | '-') {
                exp.push(self.bump());
            }
            if self.peek().is_ascii_digit() {
                while self.peek().is_ascii_digit() {
                    exp.push(self.bump());
                }
                text.push_str(&exp);
                is_float = true;
            } else {
                // not actually an exponent; back out (e.g. `1.e_something` won't occur
                // in practice, but this keeps the scanner honest).
                self.pos = save;
            }
        }

        let has_n_suffix = self.peek() == 'n';
        if has_n_suffix {
            self.bump();
        }

        if is_ident_continue(self.peek()) {
            return Err(SyntaxError::lexical(
                Span::new(start, self.offset()),
                "invalid character following numeric literal",
            ));
        }

        let kind = match (is_float, has_n_suffix) {
            (false, false) => NumberKind::Int64,
            (true, false) => NumberKind::Float64,
            (false, true) => NumberKind::BigInt,
            (true, true) => NumberKind::Decimal,
        };

        Ok(Token::new(
            TokenKind::Number { text, kind },
            Span::new(start, self.offset()),
        ))
    }

    /// `$tag$…$tag$` dollar-quoted strings, or `$name` parameter
    /// references (spec.md §3.1, §6.2).
    fn lex_dollar(&mut self, start: u32) -> Result<Token, SyntaxError> {
        self.bump(); // leading $

        // Try to read a dollar-quote tag: `[A-Za-z_][A-Za-z0-9_]*` or empty,
        // followed by another `$`.
        let tag_start = self.pos;
        let mut tag = String::new();
        if is_ident_start(self.peek()) {
            while is_ident_continue(self.peek()) {
                tag.push(self.bump());
            }
        }
        if self.peek() == '$' {
            self.bump();
            return self.lex_dollar_body(start, &tag);
        }
        // Not a dollar-quote opener after all: rewind and treat as `$name`.
        self.pos = tag_start;

        let mut name = String::new();
        while is_ident_continue(self.peek()) {
            name.push(self.bump());
        }
        if name.is_empty() {
            return Err(SyntaxError::lexical(
                Span::new(start, self.offset()),
                "expected a parameter name after `$`",
            ));
        }
        Ok(Token::new(TokenKind::Parameter(name), Span::new(start, self.offset())))
    }

    fn lex_dollar_body(&mut self, start: u32, tag: &str) -> Result<Token, SyntaxError> {
        let closer: Vec<char> = format!("${tag}$").chars().collect();
        let mut content = String::new();
        loop {
            if self.at_eof() {
                return Err(SyntaxError::lexical(
                    Span::new(start, self.offset()),
                    "unterminated dollar-quoted string",
                ));
            }
            if self.peek() == '$' {
                let mut matches_closer = true;
                for (i, &cc) in closer.iter().enumerate() {
                    if self.peek_at(i) != cc {
                        matches_closer = false;
                        break;
                    }
                }
                if matches_closer {
                    for _ in 0..closer.len() {
                        self.bump();
                    }
                    return Ok(Token::new(TokenKind::Str(content), Span::new(start, self.offset())));
                }
            }
            content.push(self.bump());
        }
    }

    /// Regular and raw quoted strings. `raw` disables escape processing
    /// entirely (spec.md §4.1: "Raw strings… disable escape processing").
    fn lex_quoted(&mut self, start: u32, raw: bool) -> Result<String, SyntaxError> {
        let quote = self.bump();
        debug_assert!(quote == '\'' || quote == '"');
        let mut out = String::new();
        loop {
            if self.at_eof() {
                return Err(SyntaxError::lexical(
                    Span::new(start, self.offset()),
                    "unterminated string literal",
                ));
            }
            let c = self.peek();
            if c == quote {
                self.bump();
                return Ok(out);
            }
            if c == '\\' && !raw {
                self.bump();
                self.lex_escape(start, &mut out)?;
                continue;
            }
            out.push(self.bump());
        }
    }

    fn lex_byte_quoted(&mut self, start: u32, raw: bool) -> Result<Vec<u8>, SyntaxError> {
        let quote = self.bump();
        debug_assert!(quote == '\'' || quote == '"');
        let mut out: Vec<u8> = Vec::new();
        loop {
            if self.at_eof() {
                return Err(SyntaxError::lexical(
                    Span::new(start, self.offset()),
                    "unterminated byte-string literal",
                ));
            }
            let c = self.peek();
            if c == quote {
                self.bump();
                return Ok(out);
            }
            if c == '\\' && !raw {
                self.bump();
                let mut s = String::new();
                self.lex_escape(start, &mut s)?;
                if !s.is_ascii() {
                    return Err(SyntaxError::lexical(
                        Span::new(start, self.offset()),
                        "byte-string literals admit only ASCII",
                    ));
                }
                out.extend_from_slice(s.as_bytes());
                continue;
            }
            if !c.is_ascii() {
                return Err(SyntaxError::lexical(
                    Span::new(start, self.offset()),
                    "byte-string literals admit only ASCII plus escapes",
                ));
            }
            out.push(self.bump() as u8);
        }
    }

    /// Escape sequences: `\\ \' \" \b \f \n \r \t \xHH \uHHHH \UHHHHHHHH`,
    /// and `\<newline>` which folds the backslash and following whitespace
    /// (spec.md §4.1).
    fn lex_escape(&mut self, start: u32, out: &mut String) -> Result<(), SyntaxError> {
        let c = self.bump();
        match c {
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'x' => {
                let v = self.read_hex_digits(start, 2)?;
                out.push(char_from_u32(start, v)?);
            }
            'u' => {
                let v = self.read_hex_digits(start, 4)?;
                out.push(char_from_u32(start, v)?);
            }
            'U' => {
                let v = self.read_hex_digits(start, 8)?;
                out.push(char_from_u32(start, v)?);
            }
            '\n' => {
                while matches!(self.peek(), ' ' | '\t') {
                    self.bump();
                }
            }
            '\r' => {
                if self.peek() == '\n' {
                    self.bump();
                }
                while matches!(self.peek(), ' ' | '\t') {
                    self.bump();
                }
            }
            other => {
                return Err(SyntaxError::lexical(
                    Span::new(start, self.offset()),
                    format!("invalid escape sequence `\\{other}`"),
                ))
            }
        }
        Ok(())
    }

    fn read_hex_digits(&mut self, start: u32, n: usize) -> Result<u32, SyntaxError> {
        let mut v: u32 = 0;
        for _ in 0..n {
            let c = self.peek();
            let digit = c.to_digit(16).ok_or_else(|| {
                SyntaxError::lexical(Span::new(start, self.offset()), "invalid hex digit in escape sequence")
            })?;
            v = v * 16 + digit;
            self.bump();
        }
        Ok(v)
    }

    fn lex_operator(&mut self, start: u32) -> Result<Token, SyntaxError> {
        let c = self.bump();
        let kind = match c {
            '+' => {
                if self.peek() == '+' {
                    self.bump();
                    TokenKind::PlusPlus
                } else if self.peek() == '=' {
                    self.bump();
                    TokenKind::PlusEq
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.peek() == '>' {
                    self.bump();
                    TokenKind::Arrow
                } else if self.peek() == '=' {
                    self.bump();
                    TokenKind::MinusEq
                } else {
                    TokenKind::Minus
                }
            }
            '*' => TokenKind::Star,
            '/' => {
                if self.peek() == '/' {
                    self.bump();
                    TokenKind::DoubleSlash
                } else {
                    TokenKind::Slash
                }
            }
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '?' => {
                if self.peek() == '?' {
                    self.bump();
                    TokenKind::QuestionQuestion
                } else if self.peek() == '=' {
                    self.bump();
                    TokenKind::QEq
                } else if self.peek() == '!' && self.peek_at(1) == '=' {
                    self.bump();
                    self.bump();
                    TokenKind::QNotEq
                } else {
                    TokenKind::Question
                }
            }
            '=' => TokenKind::Eq,
            '!' => {
                if self.peek() == '=' {
                    self.bump();
                    TokenKind::NotEq
                } else {
                    return Err(SyntaxError::lexical(Span::new(start, self.offset()), "unexpected character `!`"));
                }
            }
            '<' => {
                if self.peek() == '=' {
                    self.bump();
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek() == '=' {
                    self.bump();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            ':' => {
                if self.peek() == '=' {
                    self.bump();
                    TokenKind::ColonEq
                } else if self.peek() == ':' {
                    self.bump();
                    TokenKind::DoubleColon
                } else {
                    TokenKind::Colon
                }
            }
            ',' => TokenKind::Comma,
            '.' => {
                if self.peek() == '<' {
                    self.bump();
                    TokenKind::DotLt
                } else {
                    TokenKind::Dot
                }
            }
            '@' => TokenKind::At,
            ';' => TokenKind::Semicolon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            other => {
                return Err(SyntaxError::lexical(
                    Span::new(start, self.offset()),
                    format!("unexpected character `{other}`"),
                ))
            }
        };
        Ok(Token::new(kind, Span::new(start, self.offset())))
    }
}

fn char_from_u32(start: u32, v: u32) -> Result<char, SyntaxError> {
    char::from_u32(v).ok_or_else(|| SyntaxError::lexical(Span::new(start, start), "invalid unicode escape"))
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(
            kinds("SeLeCt"),
            vec![TokenKind::Keyword(Keyword::Select), TokenKind::Eof]
        );
    }

    #[test]
    fn identifiers_are_case_sensitive() {
        match &kinds("Foo")[0] {
            TokenKind::Ident(s) => assert_eq!(s, "Foo"),
            other => panic!("expected ident, got {other:?}"),
        }
    }

    #[test]
    fn integer_vs_float_vs_bigint_vs_decimal() {
        assert_eq!(
            kinds("1 1.5 1n 1.5n"),
            vec![
                TokenKind::Number { text: "1".into(), kind: NumberKind::Int64 },
                TokenKind::Number { text: "1.5".into(), kind: NumberKind::Float64 },
                TokenKind::Number { text: "1".into(), kind: NumberKind::BigInt },
                TokenKind::Number { text: "1.5".into(), kind: NumberKind::Decimal },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_escape_sequences() {
        match &kinds(r#"'a\nb\x41B'"#)[0] {
            TokenKind::Str(s) => assert_eq!(s, "a\nbAB"),
            other => panic!("expected str, got {other:?}"),
        }
    }

    #[test]
    fn raw_string_ignores_escapes() {
        match &kinds(r"r'a\nb'")[0] {
            TokenKind::Str(s) => assert_eq!(s, r"a\nb"),
            other => panic!("expected str, got {other:?}"),
        }
    }

    #[test]
    fn dollar_quoted_string_with_tag() {
        match &kinds("$tag$hello $$ world$tag$")[0] {
            TokenKind::Str(s) => assert_eq!(s, "hello $$ world"),
            other => panic!("expected str, got {other:?}"),
        }
    }

    #[test]
    fn dollar_quoted_string_empty_tag() {
        match &kinds("$$a'b\"c$$")[0] {
            TokenKind::Str(s) => assert_eq!(s, "a'b\"c"),
            other => panic!("expected str, got {other:?}"),
        }
    }

    #[test]
    fn parameter_reference() {
        assert_eq!(kinds("$name"), vec![TokenKind::Parameter("name".into()), TokenKind::Eof]);
    }

    #[test]
    fn backtick_identifier_with_doubled_backtick() {
        match &kinds("`a``b`")[0] {
            TokenKind::Ident(s) => assert_eq!(s, "a`b"),
            other => panic!("expected ident, got {other:?}"),
        }
    }

    #[test]
    fn backtick_identifier_rejects_double_colon() {
        assert!(Lexer::tokenize("`a::b`").is_err());
    }

    #[test]
    fn unterminated_string_is_lexical_error() {
        let err = Lexer::tokenize("'abc").unwrap_err();
        assert_eq!(err.kind, diagnostics::SyntaxErrorKind::LexicalError);
    }

    #[test]
    fn line_comment_is_discarded() {
        assert_eq!(kinds("1 # comment\n2"), {
            let mut v = vec![
                TokenKind::Number { text: "1".into(), kind: NumberKind::Int64 },
                TokenKind::Number { text: "2".into(), kind: NumberKind::Int64 },
            ];
            v.push(TokenKind::Eof);
            v
        });
    }

    #[test]
    fn byte_literal() {
        match &kinds(r"b'abc'")[0] {
            TokenKind::Bytes(b) => assert_eq!(b, b"abc"),
            other => panic!("expected bytes, got {other:?}"),
        }
    }

    #[test]
    fn backlink_operator() {
        assert_eq!(kinds(".<"), vec![TokenKind::DotLt, TokenKind::Eof]);
    }
}
