use crate::Span;

/// Non-fatal diagnostics (spec.md §7): old-scoping divergence, deprecated
/// syntax. Reported through the sink in `CompileOptions`, never buffered
/// past the call that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    /// `warn_old_scoping` (spec.md §6.4): the query's meaning would differ
    /// between legacy and simple scoping.
    OldScopingDivergence,
    DeprecatedSyntax,
}

#[derive(Debug, Clone)]
pub struct CompileWarning {
    pub kind: WarningKind,
    pub span: Option<Span>,
    pub message: String,
}

impl CompileWarning {
    pub fn old_scoping_divergence(span: Span, message: impl Into<String>) -> Self {
        CompileWarning {
            kind: WarningKind::OldScopingDivergence,
            span: Some(span),
            message: message.into(),
        }
    }

    pub fn deprecated_syntax(span: Span, message: impl Into<String>) -> Self {
        CompileWarning {
            kind: WarningKind::DeprecatedSyntax,
            span: Some(span),
            message: message.into(),
        }
    }
}

/// A sink for warnings, called synchronously during compilation
/// (spec.md §6.1's `options`, §7).
pub trait WarningSink {
    fn warn(&mut self, warning: CompileWarning);
}

impl<F: FnMut(CompileWarning)> WarningSink for F {
    fn warn(&mut self, warning: CompileWarning) {
        (self)(warning)
    }
}

/// A sink that drops every warning, for callers that don't care.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWarningSink;

impl WarningSink for NullWarningSink {
    fn warn(&mut self, _warning: CompileWarning) {}
}

/// A sink that keeps every warning around, for tests and `describe`.
#[derive(Debug, Default, Clone)]
pub struct CollectingWarningSink(pub Vec<CompileWarning>);

impl WarningSink for CollectingWarningSink {
    fn warn(&mut self, warning: CompileWarning) {
        self.0.push(warning);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;

    #[test]
    fn null_sink_drops_everything() {
        let mut sink = NullWarningSink;
        sink.warn(CompileWarning::deprecated_syntax(Span::DUMMY, "old form"));
    }

    #[test]
    fn collecting_sink_keeps_warnings_in_order() {
        let mut sink = CollectingWarningSink(Vec::new());
        sink.warn(CompileWarning::old_scoping_divergence(Span::new(0, 3), "first"));
        sink.warn(CompileWarning::deprecated_syntax(Span::new(4, 7), "second"));
        assert_eq!(sink.0.len(), 2);
        assert_eq!(sink.0[0].kind, WarningKind::OldScopingDivergence);
        assert_eq!(sink.0[1].kind, WarningKind::DeprecatedSyntax);
    }

    #[test]
    fn closures_implement_warning_sink() {
        let mut seen = Vec::new();
        let mut sink = |w: CompileWarning| seen.push(w.message);
        sink.warn(CompileWarning::deprecated_syntax(Span::DUMMY, "closures work too"));
        assert_eq!(seen, vec!["closures work too".to_string()]);
    }
}
