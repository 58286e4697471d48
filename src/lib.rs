/// The lexer takes the source input, mapping it into a sequence of tokens.
/// It is context sensitive: backticks and substitution delimiters switch it
/// between code and literal mode, and the previous significant token
/// resolves the regex-vs-division ambiguity.
pub mod lexer;

/// The parse-tree builder takes a sequence of tokens, mapping it into the
/// nested tree of code nodes and quasi-literal nodes.
pub mod parser;

/// The code generator walks the tree, rewriting each quasi-literal into a
/// handler call and hoisting its call-site declaration after the directive
/// prologue.
pub mod emit;

pub mod descriptor;
pub mod escape;
pub mod handler;
pub mod options;
pub mod token;

pub mod util {
    pub mod fmt;
}

pub use emit::{desugar, desugar_with};
pub use options::Options;
