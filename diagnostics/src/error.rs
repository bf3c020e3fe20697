use crate::Span;
use std::fmt;

/// A stable 32-bit error code, reported over the wire (spec.md §6.5).
/// Codes are grouped by category in the high byte so a caller can branch
/// on category without a string compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub u32);

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

macro_rules! error_codes {
    ($($name:ident = $value:expr;)*) => {
        #[allow(non_upper_case_globals)]
        pub mod codes {
            use super::ErrorCode;
            $(pub const $name: ErrorCode = ErrorCode($value);)*
        }
    };
}

error_codes! {
    LEXICAL_ERROR = 0x0100_0001;
    PARSE_ERROR = 0x0100_0002;
    SCHEMA_CYCLE = 0x0200_0001;
    SCHEMA_DUPLICATE = 0x0200_0002;
    SCHEMA_INVALID_OVERRIDE = 0x0200_0003;
    SCHEMA_UNRESOLVED_REFERENCE = 0x0200_0004;
    SCHEMA_INVALID_CONSTRAINT = 0x0200_0005;
    NAME_UNRESOLVED = 0x0300_0001;
    NAME_AMBIGUOUS_MODULE = 0x0300_0002;
    TYPE_NO_OVERLOAD = 0x0400_0001;
    TYPE_AMBIGUOUS = 0x0400_0002;
    TYPE_CAST_FAILED = 0x0400_0003;
    TYPE_INTERSECTION_EMPTY = 0x0400_0004;
    TYPE_BAD_SHAPE_ELEMENT = 0x0400_0005;
    TYPE_REQUIRED_NOT_PROVIDED = 0x0400_0006;
    CARDINALITY_EXPECTED_SINGLETON = 0x0500_0001;
    CARDINALITY_UNEXPECTED_EMPTY = 0x0500_0002;
    COMPILE_CANCELLED = 0x0600_0001;
    INTERNAL_ERROR = 0x0700_0001;
}

/// `SyntaxError{kind=LexicalError|ParseError}` (spec.md §4.1, §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    LexicalError,
    ParseError,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub span: Span,
    pub message: String,
}

impl SyntaxError {
    pub fn lexical(span: Span, message: impl Into<String>) -> Self {
        SyntaxError {
            kind: SyntaxErrorKind::LexicalError,
            span,
            message: message.into(),
        }
    }

    pub fn parse(span: Span, message: impl Into<String>) -> Self {
        SyntaxError {
            kind: SyntaxErrorKind::ParseError,
            span,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self.kind {
            SyntaxErrorKind::LexicalError => codes::LEXICAL_ERROR,
            SyntaxErrorKind::ParseError => codes::PARSE_ERROR,
        }
    }
}

/// `SchemaError{kind ∈ {Cycle, Duplicate, InvalidOverride, UnresolvedReference, InvalidConstraint}}`
/// (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    Cycle,
    Duplicate,
    InvalidOverride,
    UnresolvedReference,
    InvalidConstraint,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct SchemaError {
    pub kind: SchemaErrorKind,
    pub span: Option<Span>,
    pub message: String,
}

impl SchemaError {
    pub fn new(kind: SchemaErrorKind, message: impl Into<String>) -> Self {
        SchemaError {
            kind,
            span: None,
            message: message.into(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn code(&self) -> ErrorCode {
        match self.kind {
            SchemaErrorKind::Cycle => codes::SCHEMA_CYCLE,
            SchemaErrorKind::Duplicate => codes::SCHEMA_DUPLICATE,
            SchemaErrorKind::InvalidOverride => codes::SCHEMA_INVALID_OVERRIDE,
            SchemaErrorKind::UnresolvedReference => codes::SCHEMA_UNRESOLVED_REFERENCE,
            SchemaErrorKind::InvalidConstraint => codes::SCHEMA_INVALID_CONSTRAINT,
        }
    }
}

/// `NameError{kind ∈ {Unresolved, AmbiguousModule}}` (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameErrorKind {
    Unresolved,
    AmbiguousModule,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct NameError {
    pub kind: NameErrorKind,
    pub span: Span,
    pub message: String,
}

impl NameError {
    pub fn code(&self) -> ErrorCode {
        match self.kind {
            NameErrorKind::Unresolved => codes::NAME_UNRESOLVED,
            NameErrorKind::AmbiguousModule => codes::NAME_AMBIGUOUS_MODULE,
        }
    }
}

/// `TypeError{kind ∈ {NoOverload, Ambiguous, CastFailed, IntersectionEmpty, BadShapeElement,
/// RequiredNotProvided}}` (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeErrorKind {
    NoOverload,
    Ambiguous,
    CastFailed,
    IntersectionEmpty,
    BadShapeElement,
    RequiredNotProvided,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct TypeError {
    pub kind: TypeErrorKind,
    pub span: Span,
    pub message: String,
}

impl TypeError {
    pub fn new(kind: TypeErrorKind, span: Span, message: impl Into<String>) -> Self {
        TypeError {
            kind,
            span,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self.kind {
            TypeErrorKind::NoOverload => codes::TYPE_NO_OVERLOAD,
            TypeErrorKind::Ambiguous => codes::TYPE_AMBIGUOUS,
            TypeErrorKind::CastFailed => codes::TYPE_CAST_FAILED,
            TypeErrorKind::IntersectionEmpty => codes::TYPE_INTERSECTION_EMPTY,
            TypeErrorKind::BadShapeElement => codes::TYPE_BAD_SHAPE_ELEMENT,
            TypeErrorKind::RequiredNotProvided => codes::TYPE_REQUIRED_NOT_PROVIDED,
        }
    }
}

/// `CardinalityError{kind ∈ {ExpectedSingleton, UnexpectedEmpty}}` (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardinalityErrorKind {
    ExpectedSingleton,
    UnexpectedEmpty,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct CardinalityError {
    pub kind: CardinalityErrorKind,
    pub span: Span,
    pub message: String,
}

impl CardinalityError {
    pub fn new(kind: CardinalityErrorKind, span: Span, message: impl Into<String>) -> Self {
        CardinalityError {
            kind,
            span,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self.kind {
            CardinalityErrorKind::ExpectedSingleton => codes::CARDINALITY_EXPECTED_SINGLETON,
            CardinalityErrorKind::UnexpectedEmpty => codes::CARDINALITY_UNEXPECTED_EMPTY,
        }
    }
}

/// `CompileError{kind=Cancelled}` (spec.md §5) and the internal-consistency
/// failures the SQL generator raises when it hits an invariant violation
/// it never expected to see (spec.md §4.6: `ICE{…}`).
#[derive(Debug, Clone, thiserror::Error)]
#[error("internal compiler error: {message}")]
pub struct IceError {
    pub message: String,
}

impl IceError {
    pub fn new(message: impl Into<String>) -> Self {
        IceError { message: message.into() }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    #[error("compilation cancelled")]
    Cancelled,
}

/// The closed variant set every phase funnels into. `Diagnostics`
/// accumulates these; `compiler::compile` returns the first one
/// encountered by a phase that fails fast.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Name(#[from] NameError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Cardinality(#[from] CardinalityError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Ice(#[from] IceError),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Syntax(e) => e.code(),
            Error::Schema(e) => e.code(),
            Error::Name(e) => e.code(),
            Error::Type(e) => e.code(),
            Error::Cardinality(e) => e.code(),
            Error::Compile(CompileError::Cancelled) => codes::COMPILE_CANCELLED,
            Error::Ice(_) => codes::INTERNAL_ERROR,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Error::Syntax(e) => Some(e.span),
            Error::Schema(e) => e.span,
            Error::Name(e) => Some(e.span),
            Error::Type(e) => Some(e.span),
            Error::Cardinality(e) => Some(e.span),
            Error::Compile(_) | Error::Ice(_) => None,
        }
    }
}

/// The wire-level error taxonomy of spec.md §6.5: a stable code, a
/// message, and optional hints/details, independent of which internal
/// `Error` variant produced it. `interpret_backend_error` (spec.md §6.1)
/// maps a backend error's SQLSTATE + field dictionary into one of these
/// directly, without going through `Error` at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageErrorCategory {
    SyntaxError,
    InvalidReferenceError,
    InvalidTypeError,
    QueryError,
    InvalidValueError,
    NumericOutOfRangeError,
    CardinalityViolationError,
    ConstraintViolationError,
    AccessPolicyError,
    TransactionError,
    InternalServerError,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{category:?}: {message}")]
pub struct LanguageError {
    pub category: LanguageErrorCategory,
    pub code: ErrorCode,
    pub message: String,
    pub hint: Option<String>,
    pub details: Option<String>,
}

impl LanguageError {
    pub fn new(category: LanguageErrorCategory, code: ErrorCode, message: impl Into<String>) -> Self {
        LanguageError {
            category,
            code,
            message: message.into(),
            hint: None,
            details: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&Error> for LanguageError {
    fn from(err: &Error) -> Self {
        let category = match err {
            Error::Syntax(_) => LanguageErrorCategory::SyntaxError,
            Error::Schema(_) | Error::Name(_) => LanguageErrorCategory::InvalidReferenceError,
            Error::Type(_) => LanguageErrorCategory::InvalidTypeError,
            Error::Cardinality(_) => LanguageErrorCategory::CardinalityViolationError,
            Error::Compile(_) => LanguageErrorCategory::QueryError,
            Error::Ice(_) => LanguageErrorCategory::InternalServerError,
        };
        LanguageError::new(category, err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_code_depends_on_its_kind() {
        let lexical = SyntaxError::lexical(Span::DUMMY, "bad byte");
        let parse = SyntaxError::parse(Span::DUMMY, "bad token");
        assert_eq!(lexical.code(), codes::LEXICAL_ERROR);
        assert_eq!(parse.code(), codes::PARSE_ERROR);
        assert_ne!(lexical.code(), parse.code());
    }

    #[test]
    fn schema_error_span_defaults_to_none_until_with_span_is_called() {
        let err = SchemaError::new(SchemaErrorKind::Cycle, "inheritance cycle");
        assert_eq!(err.span, None);
        let spanned = err.with_span(Span::new(3, 9));
        assert_eq!(spanned.span, Some(Span::new(3, 9)));
        assert_eq!(spanned.code(), codes::SCHEMA_CYCLE);
    }

    #[test]
    fn error_span_unwraps_through_every_variant_with_a_span() {
        let e: Error = NameError { kind: NameErrorKind::Unresolved, span: Span::new(1, 4), message: "nope".into() }.into();
        assert_eq!(e.span(), Some(Span::new(1, 4)));
    }

    #[test]
    fn compile_and_ice_errors_carry_no_span() {
        let cancelled: Error = CompileError::Cancelled.into();
        let ice: Error = IceError::new("unreachable lowering branch").into();
        assert_eq!(cancelled.span(), None);
        assert_eq!(ice.span(), None);
        assert_eq!(cancelled.code(), codes::COMPILE_CANCELLED);
        assert_eq!(ice.code(), codes::INTERNAL_ERROR);
    }

    #[test]
    fn language_error_conversion_preserves_the_wire_code_and_renders_a_message() {
        let err: Error = TypeError::new(TypeErrorKind::NoOverload, Span::DUMMY, "no matching overload").into();
        let lang = LanguageError::from(&err);
        assert_eq!(lang.category, LanguageErrorCategory::InvalidTypeError);
        assert_eq!(lang.code, codes::TYPE_NO_OVERLOAD);
        assert!(lang.message.contains("no matching overload"));
    }

    #[test]
    fn error_code_displays_as_fixed_width_hex() {
        assert_eq!(codes::SCHEMA_CYCLE.to_string(), "0x02000001");
    }
}
