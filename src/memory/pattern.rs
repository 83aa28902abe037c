//! Hex byte patterns with wildcards, e.g. `"48 8B ?? ?? 89"`

use crate::core::types::InputError;
use std::fmt;

/// One cell of a compiled pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternCell {
    Byte(u8),
    Wildcard,
}

/// A compiled byte pattern.
///
/// Matches a span of exactly the same length where every non-wildcard cell
/// equals the corresponding byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPattern {
    cells: Vec<PatternCell>,
}

impl MemoryPattern {
    /// Compiles whitespace-separated tokens.
    ///
    /// Each token is either two hex digits or a wildcard starting with `?`.
    /// Patterns longer than `max_len` bytes are rejected since they could
    /// never fit in a single scan chunk.
    pub fn compile(text: &str, max_len: usize) -> Result<Self, InputError> {
        let mut cells = Vec::new();
        for token in text.split_whitespace() {
            if token.starts_with('?') {
                if !token.chars().all(|c| c == '?') || token.len() > 2 {
                    return Err(InputError::InvalidPattern(format!(
                        "Invalid wildcard '{}': use ? or ??",
                        token
                    )));
                }
                cells.push(PatternCell::Wildcard);
                continue;
            }

            if token.len() != 2 {
                return Err(InputError::InvalidPattern(format!(
                    "Invalid hex byte '{}': must be 2 digits",
                    token
                )));
            }

            let byte = hex::decode(token)
                .map_err(|_| InputError::InvalidPattern(format!("Invalid hex: {}", token)))?;
            cells.push(PatternCell::Byte(byte[0]));
        }

        if cells.is_empty() {
            return Err(InputError::InvalidPattern("Empty pattern".to_string()));
        }

        if cells.len() > max_len {
            return Err(InputError::too_long("Pattern", cells.len(), max_len));
        }

        Ok(MemoryPattern { cells })
    }

    /// Pattern without wildcards that matches exactly `bytes`
    pub fn exact(bytes: &[u8]) -> Self {
        MemoryPattern {
            cells: bytes.iter().map(|&b| PatternCell::Byte(b)).collect(),
        }
    }

    /// Number of bytes the pattern spans
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[PatternCell] {
        &self.cells
    }

    /// Tests `span` against the pattern; spans of a different length never match
    pub fn matches(&self, span: &[u8]) -> bool {
        if span.len() != self.cells.len() {
            return false;
        }

        self.cells.iter().zip(span).all(|(cell, byte)| match cell {
            PatternCell::Byte(expected) => expected == byte,
            PatternCell::Wildcard => true,
        })
    }
}

impl fmt::Display for MemoryPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cell) in self.cells.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match cell {
                PatternCell::Byte(b) => write!(f, "{:02X}", b)?,
                PatternCell::Wildcard => f.write_str("??")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_and_match() {
        let pattern = MemoryPattern::compile("11 ?? FC", 64).unwrap();
        assert_eq!(pattern.len(), 3);
        assert!(pattern.matches(&[0x11, 0xAB, 0xFC]));
        assert!(!pattern.matches(&[0x11, 0xAB, 0xFD]));
    }

    #[test]
    fn test_single_question_mark_wildcard() {
        let pattern = MemoryPattern::compile("45 ? 25 ?? ff", 64).unwrap();
        assert_eq!(
            pattern.cells(),
            &[
                PatternCell::Byte(0x45),
                PatternCell::Wildcard,
                PatternCell::Byte(0x25),
                PatternCell::Wildcard,
                PatternCell::Byte(0xFF),
            ]
        );
        assert_eq!(pattern.to_string(), "45 ?? 25 ?? FF");
    }

    #[test]
    fn test_exact_pattern() {
        let pattern = MemoryPattern::exact(&[0xDE, 0xAD]);
        assert!(pattern.matches(&[0xDE, 0xAD]));
        assert!(!pattern.matches(&[0xDE, 0xAE]));
        assert_eq!(pattern.to_string(), "DE AD");
    }

    #[test]
    fn test_length_mismatch_never_matches() {
        let pattern = MemoryPattern::compile("11 22", 64).unwrap();
        assert!(!pattern.matches(&[0x11]));
        assert!(!pattern.matches(&[0x11, 0x22, 0x33]));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(
            MemoryPattern::compile("", 64),
            Err(InputError::InvalidPattern(_))
        ));
        assert!(matches!(
            MemoryPattern::compile("   ", 64),
            Err(InputError::InvalidPattern(_))
        ));
        assert!(matches!(
            MemoryPattern::compile("1", 64),
            Err(InputError::InvalidPattern(_))
        ));
        assert!(matches!(
            MemoryPattern::compile("GG", 64),
            Err(InputError::InvalidPattern(_))
        ));
        assert!(matches!(
            MemoryPattern::compile("?x", 64),
            Err(InputError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_pattern_longer_than_chunk_is_rejected() {
        let err = MemoryPattern::compile("00 11 22 33 44", 4).unwrap_err();
        assert_eq!(
            err,
            InputError::TooLong {
                field: "Pattern",
                bytes: 5,
                chunk_size: 4
            }
        );
    }
}
