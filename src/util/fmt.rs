//! Plain-text rendering of parse trees, used by tests and for debugging.

use std::fmt::{self, Write};

use crate::parser::{CodeItem, CodeNode, QuasiNode, QuasiPart};

const INDENT_WIDTH: usize = 2;

fn sp(w: &mut impl Write, i: usize) -> fmt::Result {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}

pub fn print_code_string(src: &str, node: &CodeNode) -> String {
    let mut buf = String::with_capacity(1024);
    print_code(&mut buf, 0, src, node).unwrap();
    buf
}

pub fn print_code(w: &mut impl Write, i: usize, src: &str, node: &CodeNode) -> fmt::Result {
    for item in &node.items {
        match item {
            CodeItem::Token(token) => {
                sp(w, i)?;
                writeln!(w, "token {:?} ({})", token.text(src), token.span())?;
            }
            CodeItem::Quasi(quasi) => print_quasi(w, i, src, quasi)?,
        }
    }
    Ok(())
}

fn print_quasi(w: &mut impl Write, i: usize, src: &str, quasi: &QuasiNode) -> fmt::Result {
    sp(w, i)?;
    writeln!(w, "quasi")?;
    for part in &quasi.parts {
        match part {
            QuasiPart::Chunk(chunk) => {
                sp(w, i + 1)?;
                writeln!(w, "chunk {chunk:?}")?;
            }
            QuasiPart::Subst(code) => {
                sp(w, i + 1)?;
                writeln!(w, "subst")?;
                print_code(w, i + 2, src, code)?;
            }
        }
    }
    Ok(())
}
