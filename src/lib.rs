//! ECRE - ECMAScript-Compatible Regular Expressions
//!
//! This library implements an ECMAScript regular-expression engine with
//! two tightly coupled halves:
//!
//! - **Compiler**: parses pattern text plus flag bits into a compact,
//!   self-describing bytecode program
//! - **Matcher**: executes that bytecode against an input buffer with
//!   backtracking, capture tracking, lookaround, back-references, and
//!   greedy/lazy quantifiers
//!
//! # Features
//!
//! - **ECMAScript grammar**: including the Annex-B legacy fallbacks
//!   outside strict Unicode mode
//! - **Four input encodings**: Latin-1, UCS-2, UTF-16 (surrogate-aware),
//!   and UTF-8, all behind one monomorphised matcher
//! - **Host capabilities**: timeouts, memory budgets, case folding and
//!   Unicode property tables are injected per call, never global
//! - **Portable bytecode**: header-prefixed, little-endian, with an
//!   in-place byte-swap transformer for cross-endian persistence
//!
//! # Quick Start
//!
//! ```rust
//! use ecre::{compile, DefaultHost, Flags, Input};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let re = compile(b"(?<year>\\d{4})-(?<m>\\d{2})", Flags::empty())?;
//!     let report = re
//!         .exec(Input::from("2024-01-xx"), 0, &mut DefaultHost)?
//!         .expect("match");
//!     assert_eq!(report.named("year").unwrap().end, 4);
//!     Ok(())
//! }
//! ```
//!
//! # Scope
//!
//! Matching is backtracking: execution time is not linear in the input and
//! pathological patterns are expected to be bounded by the host timeout.
//! There is no JIT and no streaming input; the buffer must be fully
//! materialised.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]

pub mod bytecode;
pub mod charclass;
pub mod compiler;
pub mod error;
pub mod exec;
pub mod flags;
pub mod host;
pub mod input;

pub use bytecode::{
    body_len, byte_swap, capture_count, disassemble, flags as bytecode_flags, group_name_index,
    group_names, stack_size, GroupNames, InvalidBytecode, Op,
};
pub use charclass::{is_space, is_word_char, CharRange};
pub use compiler::{parse_escape, Escape, EscapeMode};
pub use error::{CompileError, ExecError, Result};
pub use exec::{exec, run_match, MatchReport, Span};
pub use flags::Flags;
pub use host::{DefaultHost, Host, UnknownProperty};
pub use input::{Encoding, Input};

/// A compiled regular-expression program.
///
/// Owns the bytecode buffer produced by [`compile`]. The buffer is
/// immutable and safe to share across threads; matching itself keeps all
/// state call-local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRegExp {
    bytes: Vec<u8>,
}

impl CompiledRegExp {
    /// Wrap an existing bytecode buffer, e.g. one restored from storage
    /// (after [`byte_swap`] on a foreign-endian host).
    ///
    /// The buffer is trusted: executing a corrupt program panics.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        CompiledRegExp { bytes }
    }

    /// The raw bytecode program.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume into the raw bytecode program.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Flags stored in the program header.
    pub fn flags(&self) -> Flags {
        bytecode::flags(&self.bytes)
    }

    /// Capture count, including the implicit whole-match capture 0.
    pub fn capture_count(&self) -> usize {
        bytecode::capture_count(&self.bytes)
    }

    /// Maximum backtrack-counter depth required at execution time.
    pub fn stack_size(&self) -> usize {
        bytecode::stack_size(&self.bytes)
    }

    /// Group-name table iterator, when the program has named groups.
    pub fn group_names(&self) -> Option<GroupNames<'_>> {
        bytecode::group_names(&self.bytes)
    }

    /// Capture index of a named group.
    pub fn group_name_index(&self, name: &str) -> Option<usize> {
        bytecode::group_name_index(&self.bytes, name)
    }

    /// Human-readable instruction dump.
    pub fn disassemble(&self) -> Result<String, InvalidBytecode> {
        bytecode::disassemble(&self.bytes)
    }

    /// Execute against `input` from `start_index` (in input units).
    pub fn exec<H: Host + ?Sized>(
        &self,
        input: Input<'_>,
        start_index: usize,
        host: &mut H,
    ) -> Result<Option<MatchReport>, ExecError> {
        exec::run_match(&self.bytes, input, start_index, host)
    }

    /// True when the pattern matches anywhere from `start_index`.
    pub fn is_match<H: Host + ?Sized>(
        &self,
        input: Input<'_>,
        start_index: usize,
        host: &mut H,
    ) -> Result<bool, ExecError> {
        let mut captures = vec![None; 2 * self.capture_count()];
        exec::exec(&mut captures, &self.bytes, input, start_index, host)
    }
}

/// Compile a pattern with the default host capabilities.
///
/// `pattern` is a UTF-8 byte sequence (invalid UTF-8 is a compile error).
/// Without host Unicode tables, `\p{...}` properties are rejected; supply
/// a table-bearing host through [`compile_with`] to enable them.
pub fn compile(pattern: &[u8], flags: Flags) -> Result<CompiledRegExp> {
    compile_with(pattern, flags, &DefaultHost)
}

/// Compile a pattern with explicit host capabilities.
pub fn compile_with<H: Host + ?Sized>(
    pattern: &[u8],
    flags: Flags,
    host: &H,
) -> Result<CompiledRegExp> {
    compiler::compile_pattern(pattern, flags, host).map(|bytes| CompiledRegExp { bytes })
}

/// Get version information for this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
