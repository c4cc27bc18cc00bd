//! Error types for the regular expression engine.
//!
//! Compilation and execution have separate error domains: a pattern either
//! compiles to a complete bytecode program or fails with a diagnostic, and
//! a compiled program either runs to completion or aborts on a resource
//! limit. Corrupt bytecode is an invariant violation and panics instead.

use thiserror::Error;

/// Diagnostics produced while compiling a pattern.
///
/// Each variant renders the human-readable message reported to the caller;
/// no partial bytecode is ever exposed alongside an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Construct that is never valid, such as a lone `)` or a quantifier
    /// bracket in strict Unicode mode.
    #[error("syntax error")]
    Syntax,

    /// A quantifier with no atom before it.
    #[error("nothing to repeat")]
    NothingToRepeat,

    /// Class range whose bounds are inverted or whose endpoint is a class.
    #[error("invalid class range")]
    InvalidClassRange,

    /// `{m,n}` with `n < m`.
    #[error("invalid repetition count")]
    InvalidRepetitionCount,

    /// More than 254 capturing groups.
    #[error("too many captures")]
    TooManyCaptures,

    /// A character class expanded to 65535 or more intervals.
    #[error("too many ranges")]
    TooManyRanges,

    /// Quantifier nesting deeper than the 255-entry backtrack stack.
    #[error("too many imbricated quantifiers")]
    TooManyNestedQuantifiers,

    /// A specific punctuator was required but not found.
    #[error("expecting '{0}'")]
    Expecting(char),

    /// `\p`/`\P` not followed by `{`.
    #[error("expecting '{{' after \\p")]
    ExpectingBraceAfterProperty,

    /// Pattern ended in the middle of a construct.
    #[error("unexpected end")]
    UnexpectedEnd,

    /// `(?` followed by an unknown group introducer.
    #[error("invalid group")]
    InvalidGroup,

    /// Malformed `(?<name>` / `\k<name>` identifier.
    #[error("invalid group name")]
    InvalidGroupName,

    /// Two named groups sharing one name.
    #[error("duplicate group name")]
    DuplicateGroupName,

    /// `\k<name>` referring to a name that never appears.
    #[error("group name not defined")]
    GroupNameNotDefined,

    /// `\k` without `<name>` while named groups exist.
    #[error("expecting group name")]
    ExpectingGroupName,

    /// Escape that is invalid in strict Unicode mode.
    #[error("invalid escape sequence in regular expression")]
    InvalidEscape,

    /// `\0` followed by a digit in strict Unicode mode.
    #[error("invalid decimal escape in regular expression")]
    InvalidDecimalEscape,

    /// `\N` beyond the number of capturing groups in strict Unicode mode.
    #[error("back reference out of range in regular expression")]
    BackReferenceOutOfRange,

    /// Pattern bytes are not well-formed UTF-8.
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,

    /// Supplementary-plane literal in a non-Unicode pattern.
    #[error("malformed unicode char")]
    MalformedUnicodeChar,

    /// `\p{Script=...}` with a script the host tables do not know.
    #[error("unknown unicode script")]
    UnknownUnicodeScript,

    /// `\p{General_Category=...}` with an unknown category.
    #[error("unknown unicode general category")]
    UnknownUnicodeGeneralCategory,

    /// `\p{...}` with an unknown property name.
    #[error("unknown unicode property name")]
    UnknownUnicodePropertyName,

    /// `\p{name=value}` with an unknown property value.
    #[error("unknown unicode property value")]
    UnknownUnicodePropertyValue,

    /// Unbalanced `)` left input after the outermost disjunction.
    #[error("extraneous characters at the end")]
    ExtraneousCharacters,

    /// The host stack probe reported imminent overflow during parsing.
    #[error("stack overflow")]
    StackOverflow,

    /// `UNICODE` and `UNICODE_SETS` requested together.
    #[error("invalid regular expression flags")]
    IncompatibleFlags,
}

/// Failures while executing a compiled program.
///
/// Both variants unwind immediately; the capture array contents are
/// indeterminate afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecError {
    /// The backtrack state arena exceeded the host's memory budget.
    #[error("regular expression backtrack memory limit exceeded")]
    MemoryLimit,

    /// The host timeout callback requested cancellation.
    #[error("regular expression execution timed out")]
    Timeout,
}

/// Result type alias for compilation.
pub type Result<T, E = CompileError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_messages() {
        assert_eq!(CompileError::NothingToRepeat.to_string(), "nothing to repeat");
        assert_eq!(CompileError::Expecting('}').to_string(), "expecting '}'");
        assert_eq!(
            CompileError::ExpectingBraceAfterProperty.to_string(),
            "expecting '{' after \\p"
        );
    }

    #[test]
    fn test_exec_error_messages() {
        assert!(ExecError::Timeout.to_string().contains("timed out"));
        assert!(ExecError::MemoryLimit.to_string().contains("memory limit"));
    }
}
