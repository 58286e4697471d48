//! The calling convention every quasi handler honors.
//!
//! A handler receives the call-site descriptor first, then the evaluated
//! substitution values in source order. The engine guarantees descriptor
//! shape, argument order, and identity stability (the same call site yields
//! the identical descriptor across evaluations); handler internals are
//! pluggable and out of scope here, except for the default dispatcher.

use crate::descriptor::CallSiteDescriptor;

/// What a sanitizing handler has already vouched a value safe for.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Js,
    Uri,
    Css,
}

/// A substitution value as seen by a handler: an explicit tagged union, so
/// dispatch happens on the tag rather than on probing for well-known
/// fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubstitutionValue {
    Plain(String),
    /// Already sanitized by an upstream handler; exempt from further
    /// transformation of the given kind.
    PreSanitized { kind: ContentKind, content: String },
}

impl SubstitutionValue {
    pub fn content(&self) -> &str {
        match self {
            SubstitutionValue::Plain(content)
            | SubstitutionValue::PreSanitized { content, .. } => content,
        }
    }

    pub fn is_pre_sanitized(&self) -> bool {
        matches!(self, SubstitutionValue::PreSanitized { .. })
    }
}

pub trait Handler {
    type Output;

    /// Invoked as `handler(descriptor, sub_1, ..., sub_n)` in the emitted
    /// code. `substitutions.len()` is always `site.cooked().len() - 1`.
    fn call(&self, site: &CallSiteDescriptor, substitutions: &[SubstitutionValue])
        -> Self::Output;
}

/// The default dispatcher (`String.interp` in emitted code): cooked chunks
/// concatenated with stringified substitution values, in order.
pub struct Interp;

impl Handler for Interp {
    type Output = String;

    fn call(&self, site: &CallSiteDescriptor, substitutions: &[SubstitutionValue]) -> String {
        debug_assert_eq!(site.cooked().len(), substitutions.len() + 1);
        let mut out = String::new();
        for (i, chunk) in site.cooked().iter().enumerate() {
            if i > 0 {
                out.push_str(substitutions[i - 1].content());
            }
            out.push_str(chunk);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn interp_concatenates_cooked_chunks() {
        let site = CallSiteDescriptor::from_raw_chunks(["foo ", "\\nbar"]);
        let subs = [SubstitutionValue::Plain("X".to_string())];
        assert_eq!(Interp.call(&site, &subs), "foo X\nbar");
    }

    #[test]
    fn interp_without_substitutions() {
        let site = CallSiteDescriptor::from_raw_chunks(["foo"]);
        assert_eq!(Interp.call(&site, &[]), "foo");
    }

    #[test]
    fn pre_sanitized_values_carry_their_tag() {
        let value = SubstitutionValue::PreSanitized {
            kind: ContentKind::Html,
            content: "<b>safe</b>".to_string(),
        };
        assert!(value.is_pre_sanitized());
        assert_eq!(value.content(), "<b>safe</b>");

        let site = CallSiteDescriptor::from_raw_chunks(["<p>", "</p>"]);
        assert_eq!(Interp.call(&site, &[value]), "<p><b>safe</b></p>");
    }
}
