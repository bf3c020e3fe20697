//! Source spans, the stable error taxonomy, and the diagnostic sink shared
//! by every compiler phase.
//!
//! Each phase either produces its output or fails fast with a structured
//! error bearing a source span (spec.md §7). Phases that want to keep
//! going and collect more than one problem (lexing, parsing, catalog
//! validation) accumulate into a [`Diagnostics`] sink instead of
//! returning at the first error.

mod error;
mod span;
mod warning;

pub use error::{
    CardinalityError, CardinalityErrorKind, CompileError, Error, ErrorCode, IceError, LanguageError,
    LanguageErrorCategory, NameError, NameErrorKind, SchemaError, SchemaErrorKind, SyntaxError, SyntaxErrorKind,
    TypeError, TypeErrorKind,
};
pub use span::Span;
pub use warning::{CollectingWarningSink, CompileWarning, NullWarningSink, WarningKind, WarningSink};

/// Accumulates errors and warnings produced by a phase that does not stop
/// at the first problem.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    errors: Vec<Error>,
    warnings: Vec<CompileWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_error(&mut self, error: impl Into<Error>) {
        self.errors.push(error.into());
    }

    pub fn push_warning(&mut self, warning: CompileWarning) {
        self.warnings.push(warning);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn warnings(&self) -> &[CompileWarning] {
        &self.warnings
    }

    /// Drains accumulated errors into a `Result`, keeping `self` for
    /// warnings the caller may still want to inspect.
    pub fn into_result<T>(mut self, ok: T) -> Result<(T, Vec<CompileWarning>), Vec<Error>> {
        if self.errors.is_empty() {
            Ok((ok, std::mem::take(&mut self.warnings)))
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    pub fn append(&mut self, other: &mut Diagnostics) {
        self.errors.append(&mut other.errors);
        self.warnings.append(&mut other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SchemaError, SchemaErrorKind, Span, SyntaxError};

    #[test]
    fn fresh_diagnostics_has_no_errors() {
        let diags = Diagnostics::new();
        assert!(!diags.has_errors());
        assert!(diags.errors().is_empty());
    }

    #[test]
    fn into_result_succeeds_when_no_errors_were_pushed() {
        let mut diags = Diagnostics::new();
        diags.push_warning(CompileWarning::deprecated_syntax(Span::DUMMY, "old syntax"));
        let (value, warnings) = diags.into_result(42).expect("no errors were pushed");
        assert_eq!(value, 42);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn into_result_fails_once_any_error_is_pushed() {
        let mut diags = Diagnostics::new();
        diags.push_error(SyntaxError::parse(Span::DUMMY, "unexpected token"));
        diags.push_error(SchemaError::new(SchemaErrorKind::Duplicate, "duplicate name"));
        assert!(diags.has_errors());
        let errors = diags.into_result(()).expect_err("two errors were pushed");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn append_merges_errors_and_warnings_in_order() {
        let mut first = Diagnostics::new();
        first.push_error(SyntaxError::lexical(Span::DUMMY, "bad byte"));
        let mut second = Diagnostics::new();
        second.push_error(SyntaxError::parse(Span::DUMMY, "bad token"));
        second.push_warning(CompileWarning::deprecated_syntax(Span::DUMMY, "old form"));

        first.append(&mut second);

        assert_eq!(first.errors().len(), 2);
        assert_eq!(first.warnings().len(), 1);
        assert!(second.errors().is_empty(), "append drains the other sink");
        assert!(second.warnings().is_empty());
    }
}
