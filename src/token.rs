use std::{fmt, ops::Range};

#[derive(Copy, Clone)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Token {
    pub kind: TokenKind,
    lo: usize,
    len: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token {
            kind,
            len: span.len,
            lo: span.lo,
        }
    }

    pub fn span(&self) -> Span {
        Span {
            len: self.len,
            lo: self.lo,
        }
    }

    /// Returns the source text this token covers.
    pub fn text<'src>(&self, src: &'src str) -> &'src str {
        self.span().substr(src)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span())
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub len: u32,
    pub lo: usize,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>) -> Span {
        debug_assert!(hi >= lo);
        Self::new_of_length(lo, u32::try_from(hi - lo).unwrap())
    }

    pub fn new_of_length(lo: usize, len: u32) -> Span {
        Span { len, lo }
    }

    /// Shifts the low and high bounds by the provided deltas.
    pub fn offset(self, lo: i64, hi: i64) -> Span {
        let new_lo = i64::try_from(self.lo).unwrap() + lo;
        let new_hi = i64::try_from(self.lo + self.len as usize).unwrap() + hi;
        Span::new_of_bounds(usize::try_from(new_lo).unwrap()..usize::try_from(new_hi).unwrap())
    }

    pub fn substr<'src>(&self, src: &'src str) -> &'src str {
        &src[self.lo..self.lo + self.len as usize]
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, len: {})", self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = lo + self.len as usize;
        write!(f, "{lo}..{hi}")
    }
}

/// A value (usually an error) paired with the source span it refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.inner)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    LineComment,
    BlockComment,
    /// A single- or double-quoted string literal, quotes included.
    String,
    Number,
    Identifier,
    Punctuator,
    /// A regular expression literal, delimiters and flags included.
    Regex,

    /// A backtick entering literal mode.
    QuasiOpen,
    /// A backtick leaving literal mode.
    QuasiClose,
    /// `${` inside a literal portion.
    SubstOpen,
    /// The `}` closing a substitution (as opposed to a block).
    SubstClose,
    /// An abbreviated `$name` substitution inside a literal portion,
    /// `$` included.
    AbbrevSubst,
    /// Raw literal text between delimiters, escape sequences intact.
    LiteralChunk,

    Eof,
}

impl TokenKind {
    /// Whitespace and comments are insignificant to the regex-vs-division
    /// decision and to handler detection.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }
}

/// Keywords after which a `/` starts a regular expression literal rather
/// than a division operator.
pub static REGEX_PRECEDER_KEYWORDS: phf::Set<&'static str> = phf::phf_set! {
    "break",
    "case",
    "continue",
    "delete",
    "do",
    "else",
    "finally",
    "in",
    "instanceof",
    "new",
    "of",
    "return",
    "throw",
    "try",
    "typeof",
    "void",
    "yield",
};

/// The default operator-position predicate: given the text of the previous
/// significant token, decides whether a `/` may begin a regex literal.
///
/// Tokens that end an operand (identifiers outside the keyword table,
/// numbers, strings, `)`, `]`, `++`, `--`) put the lexer in division
/// position; everything it cannot classify conservatively counts as an
/// operator position.
pub fn is_regex_preceder(previous: &str) -> bool {
    let Some(first) = previous.chars().next() else {
        return true;
    };
    if first.is_ascii_alphabetic() || first == '_' || first == '$' {
        return REGEX_PRECEDER_KEYWORDS.contains(previous);
    }
    if first.is_ascii_digit() || first == '"' || first == '\'' {
        return false;
    }
    !matches!(previous, ")" | "]" | "++" | "--")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_preceder_defaults() {
        assert!(is_regex_preceder(""));
        assert!(is_regex_preceder("="));
        assert!(is_regex_preceder(","));
        assert!(is_regex_preceder("("));
        assert!(is_regex_preceder("{"));
        assert!(is_regex_preceder("}"));
        assert!(is_regex_preceder("return"));
        assert!(is_regex_preceder("typeof"));

        assert!(!is_regex_preceder("x"));
        assert!(!is_regex_preceder("foo"));
        assert!(!is_regex_preceder("$jq"));
        assert!(!is_regex_preceder("42"));
        assert!(!is_regex_preceder("\"s\""));
        assert!(!is_regex_preceder("'s'"));
        assert!(!is_regex_preceder(")"));
        assert!(!is_regex_preceder("]"));
        assert!(!is_regex_preceder("++"));
        assert!(!is_regex_preceder("--"));
    }
}
