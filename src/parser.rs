use std::fmt;

use crate::{
    lexer,
    options::Options,
    token::{Span, Spanned, Token, TokenKind},
};

/// Lexes and builds the parse tree for the provided source, producing the
/// tokens into the provided buffer.
pub fn build(
    src: &str,
    tokens: &mut Vec<Token>,
    options: &Options,
) -> Result<CodeNode, Spanned<Error>> {
    lexer::lex(src, tokens, options).map_err(|e| e.span.wrap(Error::Lex(e.inner)))?;
    build_tree(src, tokens, options)
}

/// A convenience function that allocates a new token buffer per call.
pub fn build_in_new(src: &str, options: &Options) -> Result<CodeNode, Spanned<Error>> {
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    build(src, &mut tokens, options)
}

/// A code-level node: ordered tokens with quasi-literals embedded at their
/// original positions. The root of every parse tree, and the contents of
/// every substitution.
#[derive(Debug, Default)]
#[cfg_attr(test, derive(PartialEq))]
pub struct CodeNode {
    pub items: Vec<CodeItem>,
}

#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub enum CodeItem {
    Token(Token),
    Quasi(QuasiNode),
}

/// A quasi-literal: literal chunks strictly alternating with substitutions,
/// beginning and ending with a chunk (possibly empty). So the number of
/// chunks is always the number of substitutions plus one.
#[derive(Debug, Default)]
#[cfg_attr(test, derive(PartialEq))]
pub struct QuasiNode {
    pub parts: Vec<QuasiPart>,
}

#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq))]
pub enum QuasiPart {
    /// Raw literal text, escape sequences intact.
    Chunk(Box<str>),
    Subst(CodeNode),
}

impl QuasiNode {
    fn push_chunk(&mut self, text: &str) {
        // The lexer never emits two adjacent chunks.
        debug_assert!(!matches!(self.parts.last(), Some(QuasiPart::Chunk(_))));
        self.parts.push(QuasiPart::Chunk(text.into()));
    }

    fn push_subst(&mut self, code: CodeNode) {
        if !matches!(self.parts.last(), Some(QuasiPart::Chunk(_))) {
            self.parts.push(QuasiPart::Chunk("".into()));
        }
        self.parts.push(QuasiPart::Subst(code));
    }

    fn finish(&mut self) {
        if !matches!(self.parts.last(), Some(QuasiPart::Chunk(_))) {
            self.parts.push(QuasiPart::Chunk("".into()));
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Lex(lexer::Error),
    UnterminatedQuasi,
    /// A substitution close against an empty or mismatched frame stack.
    UnbalancedSubstitution,
    NestingTooDeep { limit: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Lex(e) => e.fmt(f),
            Error::UnterminatedQuasi => write!(f, "unterminated quasi-literal"),
            Error::UnbalancedSubstitution => {
                write!(f, "substitution closed against mismatched brackets")
            }
            Error::NestingTooDeep { limit } => {
                write!(f, "quasi nesting exceeds depth limit {limit}")
            }
        }
    }
}

enum Frame {
    Code(CodeNode),
    Quasi(QuasiNode),
}

/// Folds the token stream into the alternating code/quasi tree with an
/// explicit frame stack: code frames sit at odd stack heights, quasi frames
/// at even ones. The stack must return to the lone root frame by the end of
/// the input.
fn build_tree(
    src: &str,
    tokens: &[Token],
    options: &Options,
) -> Result<CodeNode, Spanned<Error>> {
    let mut frames = vec![Frame::Code(CodeNode::default())];

    for &token in tokens {
        match token.kind {
            TokenKind::Eof => break,
            TokenKind::QuasiOpen => {
                check_depth(&frames, token, options)?;
                debug_assert!(frames.len() % 2 == 1);
                frames.push(Frame::Quasi(QuasiNode::default()));
            }
            TokenKind::QuasiClose => {
                let Some(Frame::Quasi(mut quasi)) = frames.pop() else {
                    unreachable!("lexer only closes a quasi in literal mode");
                };
                quasi.finish();
                match frames.last_mut() {
                    Some(Frame::Code(code)) => code.items.push(CodeItem::Quasi(quasi)),
                    _ => unreachable!("quasi parent is always a code frame"),
                }
            }
            TokenKind::SubstOpen => {
                check_depth(&frames, token, options)?;
                debug_assert!(frames.len() % 2 == 0);
                frames.push(Frame::Code(CodeNode::default()));
            }
            TokenKind::SubstClose => {
                // The root frame is not a substitution.
                if frames.len() < 3 {
                    return Err(token.span().wrap(Error::UnbalancedSubstitution));
                }
                let Some(Frame::Code(code)) = frames.pop() else {
                    return Err(token.span().wrap(Error::UnbalancedSubstitution));
                };
                match frames.last_mut() {
                    Some(Frame::Quasi(quasi)) => quasi.push_subst(code),
                    _ => return Err(token.span().wrap(Error::UnbalancedSubstitution)),
                }
            }
            TokenKind::LiteralChunk => match frames.last_mut() {
                Some(Frame::Quasi(quasi)) => quasi.push_chunk(token.text(src)),
                _ => unreachable!("chunks only occur in literal mode"),
            },
            TokenKind::AbbrevSubst => {
                // Canonicalize `$name` into a substitution holding the bare
                // identifier, so the generator sees one substitution shape.
                let ident = Token::new(TokenKind::Identifier, token.span().offset(1, 0));
                let code = CodeNode {
                    items: vec![CodeItem::Token(ident)],
                };
                match frames.last_mut() {
                    Some(Frame::Quasi(quasi)) => quasi.push_subst(code),
                    _ => unreachable!("abbreviated substitutions only occur in literal mode"),
                }
            }
            _ => match frames.last_mut() {
                Some(Frame::Code(code)) => code.items.push(CodeItem::Token(token)),
                _ => unreachable!("code tokens only occur in code mode"),
            },
        }
    }

    let root = frames.pop();
    match (root, frames.is_empty()) {
        (Some(Frame::Code(root)), true) => Ok(root),
        _ => {
            let end = Span::new_of_length(src.len(), 0);
            Err(end.wrap(Error::UnterminatedQuasi))
        }
    }
}

fn check_depth(frames: &[Frame], token: Token, options: &Options) -> Result<(), Spanned<Error>> {
    if frames.len() >= options.max_depth {
        return Err(token.span().wrap(Error::NestingTooDeep {
            limit: options.max_depth,
        }));
    }
    Ok(())
}
