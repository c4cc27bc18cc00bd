//! Pattern flag bits.
//!
//! The bit values are wire-stable: they are written verbatim into the
//! first two bytes of every compiled program and must never be renumbered.

use crate::error::CompileError;
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Compilation flags for a pattern.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u16 {
        /// Case-insensitive matching (`i`).
        const IGNORECASE = 1 << 0;
        /// `^`/`$` also match adjacent to line terminators (`m`).
        const MULTILINE = 1 << 1;
        /// `.` also matches line terminators (`s`).
        const DOTALL = 1 << 2;
        /// Strict Unicode mode (`u`).
        const UNICODE = 1 << 3;
        /// Match only at the requested start index (`y`).
        const STICKY = 1 << 4;
        /// Set by the compiler when the program carries a group-name table.
        /// Not accepted as a compilation input.
        const NAMED_GROUPS = 1 << 5;
        /// Unicode-sets mode (`v`). Mutually exclusive with `UNICODE`.
        const UNICODE_SETS = 1 << 6;
    }
}

impl Flags {
    /// Parse the standard ECMAScript flag letters (`i`, `m`, `s`, `u`,
    /// `y`, `v`).
    ///
    /// Rejects unknown or repeated letters, and the `u`+`v` combination.
    pub fn from_letters(letters: &str) -> Result<Self, CompileError> {
        let mut flags = Flags::empty();
        for ch in letters.chars() {
            let bit = match ch {
                'i' => Flags::IGNORECASE,
                'm' => Flags::MULTILINE,
                's' => Flags::DOTALL,
                'u' => Flags::UNICODE,
                'y' => Flags::STICKY,
                'v' => Flags::UNICODE_SETS,
                _ => return Err(CompileError::IncompatibleFlags),
            };
            if flags.contains(bit) {
                return Err(CompileError::IncompatibleFlags);
            }
            flags |= bit;
        }
        flags.validate()?;
        Ok(flags)
    }

    /// Check the flag-set invariants for compilation input.
    pub fn validate(self) -> Result<(), CompileError> {
        if self.contains(Flags::UNICODE | Flags::UNICODE_SETS) {
            return Err(CompileError::IncompatibleFlags);
        }
        Ok(())
    }

    /// Either Unicode mode bit.
    pub fn any_unicode(self) -> bool {
        self.intersects(Flags::UNICODE | Flags::UNICODE_SETS)
    }
}

impl fmt::Display for Flags {
    /// Render as flag letters, in the conventional `imsuyv` order.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (bit, ch) in [
            (Flags::IGNORECASE, 'i'),
            (Flags::MULTILINE, 'm'),
            (Flags::DOTALL, 's'),
            (Flags::UNICODE, 'u'),
            (Flags::STICKY, 'y'),
            (Flags::UNICODE_SETS, 'v'),
        ] {
            if self.contains(bit) {
                write!(f, "{ch}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(Flags::IGNORECASE.bits(), 1);
        assert_eq!(Flags::MULTILINE.bits(), 2);
        assert_eq!(Flags::DOTALL.bits(), 4);
        assert_eq!(Flags::UNICODE.bits(), 8);
        assert_eq!(Flags::STICKY.bits(), 16);
        assert_eq!(Flags::NAMED_GROUPS.bits(), 32);
        assert_eq!(Flags::UNICODE_SETS.bits(), 64);
    }

    #[test]
    fn test_letters_round_trip() {
        let flags = Flags::from_letters("imy").unwrap();
        assert_eq!(flags, Flags::IGNORECASE | Flags::MULTILINE | Flags::STICKY);
        assert_eq!(flags.to_string(), "imy");
    }

    #[test]
    fn test_unicode_modes_are_exclusive() {
        assert_eq!(
            Flags::from_letters("uv"),
            Err(CompileError::IncompatibleFlags)
        );
        assert!((Flags::UNICODE | Flags::UNICODE_SETS).validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_and_repeated_letters() {
        assert!(Flags::from_letters("g").is_err());
        assert!(Flags::from_letters("ii").is_err());
    }
}
