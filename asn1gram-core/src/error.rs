use thiserror::Error;

/// Failure of the downstream target model's well-formedness pass.
///
/// Carried as the `#[source]` of [`CompileError::InvalidGrammar`]; kept as its
/// own type so a caller can match on *why* a message was rejected without
/// parsing the outer error's message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("field `{0}` has no outgoing link")]
    DeadEnd(String),

    #[error("`Final` is not reachable from `Initial`")]
    FinalUnreachable,

    #[error("message has no fields")]
    Empty,

    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
}

/// Main error type for the ASN.1-to-grammar compiler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// An ASN.1 tag whose byte encoding exceeds one octet (tag number >= 31).
    #[error("long-form BER tags are not supported (tag number >= 31)")]
    LongTagUnsupported,

    /// Dispatch over the ASN.1 AST fell through to a kind this compiler does
    /// not translate (e.g. `SET`, `REAL`, `ENUMERATED`).
    #[error("unsupported ASN.1 construct: {0}")]
    UnsupportedAsnKind(String),

    /// A `CHOICE` variant has no tag the compiler can use as a branch guard.
    #[error("choice variant `{0}` has no discoverable tag")]
    ChoiceWithoutTag(String),

    /// The downstream target model rejected an emitted message.
    #[error("invalid grammar for `{qualified_id}`: {cause}")]
    InvalidGrammar {
        qualified_id: String,
        #[source]
        cause: GrammarError,
    },
}

/// Result type alias for compiler operations.
pub type CompileResult<T> = Result<T, CompileError>;
