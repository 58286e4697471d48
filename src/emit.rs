use crate::{
    descriptor::CallSiteDescriptor,
    lexer,
    options::Options,
    parser::{self, CodeItem, CodeNode, QuasiNode, QuasiPart},
    token::{Spanned, TokenKind},
};

/// Desugars quasi-literal syntax with the default [`Options`].
///
/// Source without quasi-literal syntax is returned unchanged; any lexing or
/// structural error aborts the whole call with no partial output.
pub fn desugar(src: &str) -> Result<String, Spanned<parser::Error>> {
    desugar_with(src, &Options::default())
}

pub fn desugar_with(src: &str, options: &Options) -> Result<String, Spanned<parser::Error>> {
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    let root = parser::build(src, &mut tokens, options)?;
    Ok(Emitter::new(src, options).emit(&root))
}

/// Spliced in front of a quasi-literal that has no handler expression.
const DEFAULT_DISPATCHER: [&str; 3] = ["String", ".", "interp"];

struct Emitter<'src, 'opt> {
    src: &'src str,
    options: &'opt Options,
    declarations: Vec<String>,
    next_call_site: usize,
}

impl<'src, 'opt> Emitter<'src, 'opt> {
    fn new(src: &'src str, options: &'opt Options) -> Emitter<'src, 'opt> {
        Emitter {
            src,
            options,
            declarations: Vec::new(),
            next_call_site: 0,
        }
    }

    fn emit(mut self, root: &CodeNode) -> String {
        let mut out = Vec::with_capacity(root.items.len() + 16);
        self.emit_items(&root.items, &mut out);
        self.splice(&out)
    }

    fn emit_items(&mut self, items: &[CodeItem], out: &mut Vec<String>) {
        for item in items {
            match item {
                CodeItem::Token(token) => out.push(token.text(self.src).to_string()),
                CodeItem::Quasi(quasi) => self.emit_quasi(quasi, out),
            }
        }
    }

    /// Rewrites one quasi-literal into `HANDLER(id, sub_1, ..., sub_n)` and
    /// records its hoisted declaration.
    fn emit_quasi(&mut self, quasi: &QuasiNode, out: &mut Vec<String>) {
        // Substitutions regenerate first, so an inner quasi-literal declares
        // (and numbers) its call site before the enclosing one.
        let mut raw_chunks = Vec::new();
        let mut substitutions = Vec::new();
        for part in &quasi.parts {
            match part {
                QuasiPart::Chunk(chunk) => raw_chunks.push(chunk.as_ref()),
                QuasiPart::Subst(code) => {
                    let mut buf = Vec::new();
                    self.emit_substitution(code, &mut buf);
                    substitutions.push(buf);
                }
            }
        }

        let descriptor = CallSiteDescriptor::from_raw_chunks(raw_chunks);
        let id = format!("$$callSite{}", self.next_call_site);
        self.next_call_site += 1;
        self.declarations.push(descriptor.to_declaration(&id));

        if !ends_with_handler(out) {
            if out.last().is_some_and(|t| t.ends_with(is_word_char)) {
                out.push(" ".to_string());
            }
            push_all(out, &DEFAULT_DISPATCHER);
        }
        out.push("(".to_string());
        out.push(id);
        for substitution in substitutions {
            out.push(",".to_string());
            out.push(" ".to_string());
            out.extend(substitution);
        }
        out.push(")".to_string());
    }

    /// Regenerates a substitution expression, parenthesized to guard
    /// against surrounding-operator precedence interactions. With `slotted`
    /// enabled, a leading `=` marks an assignable hole, which becomes a
    /// getter/setter thunk.
    fn emit_substitution(&mut self, code: &CodeNode, out: &mut Vec<String>) {
        let assignable = self.options.slotted
            && matches!(
                code.items.first(),
                Some(CodeItem::Token(t))
                    if t.kind == TokenKind::Punctuator && t.text(self.src) == "="
            );
        if assignable {
            let expr = &code.items[1..];
            push_all(
                out,
                &[
                    "(", "function", "(", ")", "{", "return", " ", "arguments", ".", "length",
                    "?", "(",
                ],
            );
            self.emit_items(expr, out);
            push_all(out, &[")", "=", "arguments", "[", "0", "]", ":", "("]);
            self.emit_items(expr, out);
            push_all(out, &[")", ";", "}", ")"]);
        } else {
            out.push("(".to_string());
            self.emit_items(&code.items, out);
            out.push(")".to_string());
        }
    }

    /// Joins the output buffer, inserting the hoisted declarations after
    /// the leading directive prologue (after its last `;`), or at the very
    /// front when there is none.
    fn splice(self, out: &[String]) -> String {
        let mut decl_start = 0;
        if !self.declarations.is_empty() {
            for (i, token) in out.iter().enumerate() {
                if !is_prologue_text(token) {
                    break;
                }
                if token == ";" {
                    decl_start = i + 1;
                }
            }
        }

        let out_len: usize = out.iter().map(String::len).sum();
        let decl_len: usize = self.declarations.iter().map(String::len).sum();
        let mut result = String::with_capacity(out_len + decl_len + 1);
        for token in &out[..decl_start] {
            result.push_str(token);
        }
        if decl_start > 0 {
            result.push('\n');
        }
        for declaration in &self.declarations {
            result.push_str(declaration);
        }
        for token in &out[decl_start..] {
            result.push_str(token);
        }
        result
    }
}

fn push_all(out: &mut Vec<String>, tokens: &[&str]) {
    out.extend(tokens.iter().map(|t| (*t).to_string()));
}

/// Whether the last significant output token ends a handler expression. A
/// quasi-literal is tagged by the expression right before it; that is the
/// case exactly when the preceding token is identifier-shaped.
fn ends_with_handler(out: &[String]) -> bool {
    for token in out.iter().rev() {
        if is_trivia_text(token) {
            continue;
        }
        return token.starts_with(|c: char| c.is_ascii_alphabetic() || c == '$' || c == '_');
    }
    false
}

fn is_trivia_text(token: &str) -> bool {
    token.starts_with("//")
        || token.starts_with("/*")
        || token.chars().all(|c| c.is_whitespace() || c == '\u{feff}')
}

/// Prologue members: comments, whitespace, string literals and `;`.
fn is_prologue_text(token: &str) -> bool {
    is_trivia_text(token) || token.starts_with(['"', '\'']) || token == ";"
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
