use std::fmt;

use crate::{
    options::Options,
    token::{Span, Spanned, Token, TokenKind},
};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

/// Lexes the provided string, producing the tokens into the provided buffer.
///
/// Any error is fatal: the buffer contents are unspecified after a failure.
pub fn lex(src: &str, tokens: &mut Vec<Token>, options: &Options) -> Result<(), Spanned<Error>> {
    Lexer::new(src, tokens, options).lex()
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str, options: &Options) -> Result<Vec<Token>, Spanned<Error>> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens, options)?;
    Ok(tokens)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// No token matches the remaining input. Carries up to 20 characters of
    /// the offending source.
    NoToken { near: Box<str> },
    UnterminatedString,
    UnterminatedComment,
    UnterminatedRegex,
    /// A backslash as the last input character.
    TrailingEscape,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoToken { near } => write!(f, "no token at start of {near:?}"),
            Error::UnterminatedString => write!(f, "unterminated string literal"),
            Error::UnterminatedComment => write!(f, "unterminated block comment"),
            Error::UnterminatedRegex => write!(f, "unterminated regular expression literal"),
            Error::TrailingEscape => write!(f, "escape at end of input"),
        }
    }
}

/// A bracket-stack marker. Disambiguates a `}` that closes a substitution
/// (returning the lexer to literal mode) from one that closes a block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Brace {
    Block,
    Subst,
}

/// The quasi-aware JavaScript lexer.
///
/// Context sensitive on three axes: literal-vs-code mode (backticks and
/// substitution delimiters switch between them), the brace stack, and the
/// previous significant token (for the regex-vs-division ambiguity).
struct Lexer<'src, 'tok, 'opt> {
    src: &'src str,
    iter: std::str::Chars<'src>,
    cursor: usize,
    current_lo: usize,
    tokens: &'tok mut Vec<Token>,
    options: &'opt Options,
    in_literal: bool,
    braces: Vec<Brace>,
    last: Option<Token>,
}

impl Lexer<'_, '_, '_> {
    /// Scans the source string until the input is exhausted.
    fn lex(mut self) -> Result<(), Spanned<Error>> {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            let next = if self.in_literal {
                self.scan_literal()?
            } else {
                self.scan_code()?
            };
            let is_eof = matches!(next, TokenKind::Eof);
            self.produce(next);
            if is_eof {
                break;
            }
        }
        Ok(())
    }

    fn scan_code(&mut self) -> Result<TokenKind, Spanned<Error>> {
        use TokenKind::*;
        Ok(match self.mark_advance() {
            '\0' => Eof,
            '`' => {
                self.in_literal = true;
                QuasiOpen
            }
            '{' => {
                self.braces.push(Brace::Block);
                Punctuator
            }
            '}' => match self.braces.pop() {
                Some(Brace::Subst) => {
                    self.in_literal = true;
                    SubstClose
                }
                // A block close, or a stray `}` that passes through verbatim.
                _ => Punctuator,
            },
            '/' => match self.peek() {
                '/' => self.line_comment(),
                '*' => self.block_comment()?,
                _ if self.at_regex_position() => self.regex()?,
                '=' => self.advance_with(Punctuator),
                _ => Punctuator,
            },
            quote @ ('\'' | '"') => self.string(quote)?,
            '.' if self.peek().is_ascii_digit() => self.number_fraction(),
            c if c.is_ascii_digit() => self.number(c),
            c if is_ident_start(c) => self.identifier(),
            c if is_space(c) => self.whitespace(),
            '(' | ')' | '[' | ']' | ';' | ',' | '?' | ':' | '~' | '.' => Punctuator,
            '+' => match self.peek() {
                '+' | '=' => self.advance_with(Punctuator),
                _ => Punctuator,
            },
            '-' => match self.peek() {
                '-' | '=' => self.advance_with(Punctuator),
                _ => Punctuator,
            },
            '*' | '%' | '^' => match self.peek() {
                '=' => self.advance_with(Punctuator),
                _ => Punctuator,
            },
            '&' => match self.peek() {
                '&' | '=' => self.advance_with(Punctuator),
                _ => Punctuator,
            },
            '|' => match self.peek() {
                '|' | '=' => self.advance_with(Punctuator),
                _ => Punctuator,
            },
            '=' | '!' => {
                if self.peek() == '=' {
                    self.advance();
                    if self.peek() == '=' {
                        self.advance();
                    }
                }
                Punctuator
            }
            '<' => match self.peek() {
                '<' => {
                    self.advance();
                    if self.peek() == '=' {
                        self.advance();
                    }
                    Punctuator
                }
                '=' => self.advance_with(Punctuator),
                _ => Punctuator,
            },
            '>' => match self.peek() {
                '>' => {
                    self.advance();
                    match self.peek() {
                        '>' => {
                            self.advance();
                            if self.peek() == '=' {
                                self.advance();
                            }
                        }
                        '=' => {
                            self.advance();
                        }
                        _ => {}
                    }
                    Punctuator
                }
                '=' => self.advance_with(Punctuator),
                _ => Punctuator,
            },
            _ => return Err(self.no_token()),
        })
    }

    /// Scans one token inside a literal portion: the closing backtick, a
    /// substitution opener (`${` or an abbreviated `$name`), or a chunk of
    /// literal text with escape sequences left intact.
    fn scan_literal(&mut self) -> Result<TokenKind, Spanned<Error>> {
        match self.mark_advance() {
            '\0' => Ok(TokenKind::Eof),
            '`' => {
                self.in_literal = false;
                Ok(TokenKind::QuasiClose)
            }
            '$' if self.peek() == '{' => {
                self.advance();
                self.in_literal = false;
                self.braces.push(Brace::Subst);
                Ok(TokenKind::SubstOpen)
            }
            '$' if (self.options.abbrev_ident_start)(self.peek()) => {
                self.advance();
                while (self.options.abbrev_ident_continue)(self.peek()) {
                    self.advance();
                }
                Ok(TokenKind::AbbrevSubst)
            }
            first => self.literal_chunk(first),
        }
    }

    fn literal_chunk(&mut self, first: char) -> Result<TokenKind, Spanned<Error>> {
        if first == '\\' {
            self.escaped_char()?;
        }
        loop {
            match self.peek() {
                '\0' | '`' => break,
                '$' => {
                    let next = self.peek2();
                    if next == '{' || (self.options.abbrev_ident_start)(next) {
                        break;
                    }
                    self.advance();
                }
                '\\' => {
                    self.advance();
                    self.escaped_char()?;
                }
                _ => {
                    self.advance();
                }
            }
        }
        Ok(TokenKind::LiteralChunk)
    }

    /// Consumes the single character following a backslash, unparsed.
    fn escaped_char(&mut self) -> Result<(), Spanned<Error>> {
        match self.advance() {
            '\0' => Err(self.span().wrap(Error::TrailingEscape)),
            _ => Ok(()),
        }
    }

    /// Whether a `/` here would start a regex literal. Structural token
    /// kinds are resolved directly; everything else defers to the
    /// operator-position predicate.
    fn at_regex_position(&self) -> bool {
        let Some(last) = self.last else {
            return true;
        };
        match last.kind {
            // A regex literal or a closed quasi-literal ends an operand.
            TokenKind::Regex | TokenKind::QuasiClose => false,
            // A substitution opens in expression position.
            TokenKind::SubstOpen => true,
            TokenKind::Punctuator => {
                let text = last.text(self.src);
                if text == "/" || text == "/=" {
                    true
                } else {
                    (self.options.regex_preceder)(text)
                }
            }
            _ => (self.options.regex_preceder)(last.text(self.src)),
        }
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, Spanned<Error>> {
        loop {
            match self.advance() {
                '\0' | '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
                    return Err(self.span().wrap(Error::UnterminatedString));
                }
                '\\' => match self.advance() {
                    '\0' => return Err(self.span().wrap(Error::UnterminatedString)),
                    // An escaped CRLF is a single line continuation.
                    '\r' => {
                        if self.peek() == '\n' {
                            self.advance();
                        }
                    }
                    _ => {}
                },
                c if c == quote => return Ok(TokenKind::String),
                _ => {}
            }
        }
    }

    fn identifier(&mut self) -> TokenKind {
        while is_ident_continue(self.peek()) {
            self.advance();
        }
        TokenKind::Identifier
    }

    fn number(&mut self, first: char) -> TokenKind {
        if first == '0' && matches!(self.peek(), 'x' | 'X') && self.peek2().is_ascii_hexdigit() {
            self.advance();
            while self.peek().is_ascii_hexdigit() {
                self.advance();
            }
            return TokenKind::Number;
        }
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        self.exponent();
        TokenKind::Number
    }

    /// A number starting with `.`, e.g. `.333`. The caller has checked that
    /// a digit follows.
    fn number_fraction(&mut self) -> TokenKind {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        self.exponent();
        TokenKind::Number
    }

    /// Consumes a trailing exponent, but only when at least one digit
    /// follows it; `1e` is a number followed by an identifier.
    fn exponent(&mut self) {
        if !matches!(self.peek(), 'e' | 'E') {
            return;
        }
        let mut ahead = self.iter.clone();
        ahead.next();
        let mut next = ahead.next();
        let has_sign = matches!(next, Some('+' | '-'));
        if has_sign {
            next = ahead.next();
        }
        if !next.is_some_and(|c| c.is_ascii_digit()) {
            return;
        }
        self.advance();
        if has_sign {
            self.advance();
        }
        while self.peek().is_ascii_digit() {
            self.advance();
        }
    }

    fn whitespace(&mut self) -> TokenKind {
        while is_space(self.peek()) {
            self.advance();
        }
        TokenKind::Whitespace
    }

    fn line_comment(&mut self) -> TokenKind {
        assert_eq!(self.advance(), '/');
        while !matches!(self.peek(), '\0' | '\n' | '\r' | '\u{2028}' | '\u{2029}') {
            self.advance();
        }
        TokenKind::LineComment
    }

    /// A block comment ends at the first `*/`; there is no nesting.
    fn block_comment(&mut self) -> Result<TokenKind, Spanned<Error>> {
        assert_eq!(self.advance(), '*');
        loop {
            match self.advance() {
                '\0' => return Err(self.span().wrap(Error::UnterminatedComment)),
                '*' => {
                    while self.peek() == '*' {
                        self.advance();
                    }
                    if self.peek() == '/' {
                        self.advance();
                        return Ok(TokenKind::BlockComment);
                    }
                }
                _ => {}
            }
        }
    }

    /// A regex literal. The leading `/` is consumed and the caller has
    /// checked that the next character is neither `/` nor `*`.
    fn regex(&mut self) -> Result<TokenKind, Spanned<Error>> {
        loop {
            match self.advance() {
                '\0' | '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
                    return Err(self.span().wrap(Error::UnterminatedRegex));
                }
                '/' => break,
                '\\' => self.regex_escape()?,
                '[' => self.regex_charset()?,
                _ => {}
            }
        }
        while matches!(self.peek(), 'g' | 'i' | 'm') {
            self.advance();
        }
        Ok(TokenKind::Regex)
    }

    fn regex_escape(&mut self) -> Result<(), Spanned<Error>> {
        match self.advance() {
            '\0' | '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
                Err(self.span().wrap(Error::UnterminatedRegex))
            }
            _ => Ok(()),
        }
    }

    /// A `[...]` character class; a `/` inside one does not end the regex.
    fn regex_charset(&mut self) -> Result<(), Spanned<Error>> {
        loop {
            match self.advance() {
                '\0' | '\n' | '\r' | '\u{2028}' | '\u{2029}' => {
                    return Err(self.span().wrap(Error::UnterminatedRegex));
                }
                ']' => return Ok(()),
                '\\' => self.regex_escape()?,
                _ => {}
            }
        }
    }

    fn no_token(&self) -> Spanned<Error> {
        let near: String = self.src[self.current_lo..].chars().take(20).collect();
        self.span().wrap(Error::NoToken {
            near: near.into_boxed_str(),
        })
    }
}

impl Lexer<'_, '_, '_> {
    fn new<'src, 'tok, 'opt>(
        src: &'src str,
        tokens: &'tok mut Vec<Token>,
        options: &'opt Options,
    ) -> Lexer<'src, 'tok, 'opt> {
        Lexer {
            src,
            iter: src.chars(),
            cursor: 0,
            current_lo: 0,
            tokens,
            options,
            in_literal: false,
            braces: Vec::with_capacity(8),
            last: None,
        }
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> char {
        self.current_lo = self.cursor;
        self.advance()
    }

    /// Returns the next character and advances the iterator.
    fn advance(&mut self) -> char {
        self.iter
            .next()
            .inspect(|c| self.cursor += c.len_utf8())
            .unwrap_or('\0')
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next character without advancing the iterator.
    fn peek(&self) -> char {
        self.iter.clone().next().unwrap_or('\0')
    }

    /// Returns the character after the next one, without advancing.
    fn peek2(&self) -> char {
        self.iter.clone().nth(1).unwrap_or('\0')
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Produces a token using the marked bounds, tracking the last
    /// significant (non-trivia) token.
    fn produce(&mut self, kind: TokenKind) {
        let token = Token::new(kind, self.span());
        if !token.kind.is_trivia() && !token.is_eof() {
            self.last = Some(token);
        }
        self.tokens.push(token);
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn is_space(c: char) -> bool {
    c.is_whitespace() || c == '\u{feff}'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex_ok(input: &str) -> Vec<Token> {
        lex_in_new(input, &Options::default()).expect("lexes without errors")
    }

    fn lex_err(input: &str) -> Spanned<Error> {
        lex_in_new(input, &Options::default()).expect_err("must fail to lex")
    }

    #[test]
    fn tests_with_span() {
        use TokenKind::*;
        let cases = cases!(match .. {
            "" => [(Eof, 0..0)],
            "a/b" => [
                (Identifier, 0..1),
                (Punctuator, 1..2),
                (Identifier, 2..3),
                (Eof, 3..3),
            ],
            "a/b/c" => [
                (Identifier, 0..1),
                (Punctuator, 1..2),
                (Identifier, 2..3),
                (Punctuator, 3..4),
                (Identifier, 4..5),
                (Eof, 5..5),
            ],
            "1, /`/" => [
                (Number, 0..1),
                (Punctuator, 1..2),
                (Whitespace, 2..3),
                (Regex, 3..6),
                (Eof, 6..6),
            ],
            "1, /[`]/" => [
                (Number, 0..1),
                (Punctuator, 1..2),
                (Whitespace, 2..3),
                (Regex, 3..8),
                (Eof, 8..8),
            ],
            "n /= /`/i" => [
                (Identifier, 0..1),
                (Whitespace, 1..2),
                (Punctuator, 2..4),
                (Whitespace, 4..5),
                (Regex, 5..9),
                (Eof, 9..9),
            ],
            "return /x/" => [
                (Identifier, 0..6),
                (Whitespace, 6..7),
                (Regex, 7..10),
                (Eof, 10..10),
            ],
            "/a\\/b/" => [(Regex, 0..6), (Eof, 6..6)],
            "'`'" => [(String, 0..3), (Eof, 3..3)],
            "\"\\`\"" => [(String, 0..4), (Eof, 4..4)],
            "\"a\\\"b\"" => [(String, 0..6), (Eof, 6..6)],
            "1 1.5 .5 0x1f 1e6 1e-6 1e x" => [
                (Number, 0..1),
                (Whitespace, 1..2),
                (Number, 2..5),
                (Whitespace, 5..6),
                (Number, 6..8),
                (Whitespace, 8..9),
                (Number, 9..13),
                (Whitespace, 13..14),
                (Number, 14..17),
                (Whitespace, 17..18),
                (Number, 18..22),
                (Whitespace, 22..23),
                (Number, 23..24),
                (Identifier, 24..25),
                (Whitespace, 25..26),
                (Identifier, 26..27),
                (Eof, 27..27),
            ],
            "0xg" => [(Number, 0..1), (Identifier, 1..3), (Eof, 3..3)],
            "a//b\nc" => [
                (Identifier, 0..1),
                (LineComment, 1..4),
                (Whitespace, 4..5),
                (Identifier, 5..6),
                (Eof, 6..6),
            ],
            "/*a*b**/c" => [(BlockComment, 0..8), (Identifier, 8..9), (Eof, 9..9)],
            "a >>>= b" => [
                (Identifier, 0..1),
                (Whitespace, 1..2),
                (Punctuator, 2..6),
                (Whitespace, 6..7),
                (Identifier, 7..8),
                (Eof, 8..8),
            ],
            "a === b !== c" => [
                (Identifier, 0..1),
                (Whitespace, 1..2),
                (Punctuator, 2..5),
                (Whitespace, 5..6),
                (Identifier, 6..7),
                (Whitespace, 7..8),
                (Punctuator, 8..11),
                (Whitespace, 11..12),
                (Identifier, 12..13),
                (Eof, 13..13),
            ],
            "f({a: 1})" => [
                (Identifier, 0..1),
                (Punctuator, 1..2),
                (Punctuator, 2..3),
                (Identifier, 3..4),
                (Punctuator, 4..5),
                (Whitespace, 5..6),
                (Number, 6..7),
                (Punctuator, 7..8),
                (Punctuator, 8..9),
                (Eof, 9..9),
            ],
            "foo`a${x}b`" => [
                (Identifier, 0..3),
                (QuasiOpen, 3..4),
                (LiteralChunk, 4..5),
                (SubstOpen, 5..7),
                (Identifier, 7..8),
                (SubstClose, 8..9),
                (LiteralChunk, 9..10),
                (QuasiClose, 10..11),
                (Eof, 11..11),
            ],
            "`a$x b`" => [
                (QuasiOpen, 0..1),
                (LiteralChunk, 1..2),
                (AbbrevSubst, 2..4),
                (LiteralChunk, 4..6),
                (QuasiClose, 6..7),
                (Eof, 7..7),
            ],
            "`${x}${y}`" => [
                (QuasiOpen, 0..1),
                (SubstOpen, 1..3),
                (Identifier, 3..4),
                (SubstClose, 4..5),
                (SubstOpen, 5..7),
                (Identifier, 7..8),
                (SubstClose, 8..9),
                (QuasiClose, 9..10),
                (Eof, 10..10),
            ],
            "`a${f({x: 1})}b`" => [
                (QuasiOpen, 0..1),
                (LiteralChunk, 1..2),
                (SubstOpen, 2..4),
                (Identifier, 4..5),
                (Punctuator, 5..6),
                (Punctuator, 6..7),
                (Identifier, 7..8),
                (Punctuator, 8..9),
                (Whitespace, 9..10),
                (Number, 10..11),
                (Punctuator, 11..12),
                (Punctuator, 12..13),
                (SubstClose, 13..14),
                (LiteralChunk, 14..15),
                (QuasiClose, 15..16),
                (Eof, 16..16),
            ],
            // An escaped backtick or `$` stays inside the chunk.
            "`a\\`b\\$c`" => [
                (QuasiOpen, 0..1),
                (LiteralChunk, 1..8),
                (QuasiClose, 8..9),
                (Eof, 9..9),
            ],
            // A `$` not followed by `{` or an identifier start is plain text.
            "`a$ b`" => [
                (QuasiOpen, 0..1),
                (LiteralChunk, 1..5),
                (QuasiClose, 5..6),
                (Eof, 6..6),
            ],
            // A substitution in expression position may hold a regex.
            "`${/`/}`" => [
                (QuasiOpen, 0..1),
                (SubstOpen, 1..3),
                (Regex, 3..6),
                (SubstClose, 6..7),
                (QuasiClose, 7..8),
                (Eof, 8..8),
            ],
            // After a closed quasi-literal, `/` divides.
            "`a`/b" => [
                (QuasiOpen, 0..1),
                (LiteralChunk, 1..2),
                (QuasiClose, 2..3),
                (Punctuator, 3..4),
                (Identifier, 4..5),
                (Eof, 5..5),
            ],
            // A stray top-level `}` passes through verbatim.
            "}" => [(Punctuator, 0..1), (Eof, 1..1)],
        });

        for (input, tokens) in cases {
            let lexed = lex_ok(input);
            assert_eq!(lexed, tokens.as_slice(), "lexing {input:?}");
        }
    }

    #[test]
    fn errors() {
        assert_eq!(
            lex_err("\"abc"),
            Span::new_of_bounds(0..4).wrap(Error::UnterminatedString)
        );
        assert_eq!(
            lex_err("\"a\nb\""),
            Span::new_of_bounds(0..3).wrap(Error::UnterminatedString)
        );
        assert_eq!(
            lex_err("/*x"),
            Span::new_of_bounds(0..3).wrap(Error::UnterminatedComment)
        );
        assert_eq!(
            lex_err("return /x"),
            Span::new_of_bounds(7..9).wrap(Error::UnterminatedRegex)
        );
        assert_eq!(
            lex_err("`a\\"),
            Span::new_of_bounds(1..3).wrap(Error::TrailingEscape)
        );
        assert_eq!(
            lex_err("#"),
            Span::new_of_bounds(0..1).wrap(Error::NoToken { near: "#".into() })
        );
    }

    #[test]
    fn string_line_continuation() {
        use TokenKind::*;
        let lexed = lex_ok("\"a\\\r\nb\"");
        let kinds: Vec<_> = lexed.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, [String, Eof]);
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:expr, $range:expr)),* $(,)?]),* $(,)?
        }) => {{
            &[$((
                $str,
                vec![
                    $(Token::new($kind, Span::new_of_bounds($range.start..$range.end))),*
                ],
            )),*]
        }};
    }
    use cases;
}
