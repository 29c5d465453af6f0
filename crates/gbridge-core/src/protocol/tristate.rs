//! RF tristate codes for 433 MHz remote-controlled sockets.
//!
//! Wire format (as accepted by the transmitter listening on the sink feed):
//! ```text
//! [address:10][state:2]
//! ```
//! Each symbol is one of `0`, `1` or `F` (floating).  The state suffix is
//! `01` for on and `10` for off.  A complete command is 12 symbols.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::domain::switch::SwitchState;

/// Number of symbols in a device address.
pub const ADDRESS_LEN: usize = 10;

/// Number of symbols in a complete command (address + state suffix).
pub const COMMAND_LEN: usize = ADDRESS_LEN + 2;

/// Errors produced while parsing a tristate code.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TristateError {
    /// The input string was empty.
    #[error("tristate code is empty")]
    Empty,

    /// A symbol outside `{0, 1, F}` was found.
    #[error("invalid tristate symbol '{symbol}' at position {position}")]
    InvalidSymbol { symbol: char, position: usize },

    /// The code has the wrong number of symbols for its role.
    #[error("tristate code has {actual} symbols, expected {expected}")]
    WrongLength { expected: usize, actual: usize },
}

/// A validated string over the tristate alphabet `{0, 1, F}`.
///
/// Lower-case `f` is accepted on input and stored as `F`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TristateCode(String);

impl TristateCode {
    /// Parses a tristate code of any non-zero length.
    ///
    /// # Errors
    ///
    /// Returns [`TristateError::Empty`] for an empty string and
    /// [`TristateError::InvalidSymbol`] for the first symbol outside the
    /// alphabet.
    pub fn parse(input: &str) -> Result<Self, TristateError> {
        if input.is_empty() {
            return Err(TristateError::Empty);
        }

        let mut normalised = String::with_capacity(input.len());
        for (position, symbol) in input.chars().enumerate() {
            match symbol {
                '0' | '1' | 'F' => normalised.push(symbol),
                'f' => normalised.push('F'),
                _ => return Err(TristateError::InvalidSymbol { symbol, position }),
            }
        }

        Ok(Self(normalised))
    }

    /// Parses a device address: a tristate code of exactly [`ADDRESS_LEN`] symbols.
    ///
    /// # Errors
    ///
    /// Same as [`TristateCode::parse`], plus [`TristateError::WrongLength`] if
    /// the address is not exactly 10 symbols long.
    pub fn parse_address(input: &str) -> Result<Self, TristateError> {
        let code = Self::parse(input)?;
        if code.len() != ADDRESS_LEN {
            return Err(TristateError::WrongLength {
                expected: ADDRESS_LEN,
                actual: code.len(),
            });
        }
        Ok(code)
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of symbols in the code.
    pub fn len(&self) -> usize {
        // Every accepted symbol is ASCII, so bytes == symbols.
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TristateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TristateCode {
    type Err = TristateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for TristateCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds the complete command code for `address` switched to `state`.
///
/// # Examples
///
/// ```rust
/// use gbridge_core::{command_code, SwitchState, TristateCode};
///
/// let address = TristateCode::parse_address("FFF0FFFF01").unwrap();
/// assert_eq!(command_code(&address, SwitchState::On).as_str(), "FFF0FFFF0101");
/// assert_eq!(command_code(&address, SwitchState::Off).as_str(), "FFF0FFFF0110");
/// ```
pub fn command_code(address: &TristateCode, state: SwitchState) -> TristateCode {
    let mut code = String::with_capacity(address.len() + 2);
    code.push_str(address.as_str());
    code.push_str(state.tristate_suffix());
    TristateCode(code)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_full_alphabet() {
        let code = TristateCode::parse("01F").unwrap();
        assert_eq!(code.as_str(), "01F");
        assert_eq!(code.len(), 3);
    }

    #[test]
    fn test_parse_normalises_lowercase_f() {
        // Arrange / Act
        let code = TristateCode::parse("fff0ffff01").unwrap();

        // Assert
        assert_eq!(code.as_str(), "FFF0FFFF01");
    }

    #[test]
    fn test_parse_empty_returns_error() {
        assert_eq!(TristateCode::parse(""), Err(TristateError::Empty));
    }

    #[test]
    fn test_parse_reports_first_invalid_symbol_and_position() {
        let result = TristateCode::parse("FF2F");
        assert_eq!(
            result,
            Err(TristateError::InvalidSymbol {
                symbol: '2',
                position: 2
            })
        );
    }

    #[test]
    fn test_parse_address_requires_ten_symbols() {
        let result = TristateCode::parse_address("FFF0FFFF0");
        assert_eq!(
            result,
            Err(TristateError::WrongLength {
                expected: 10,
                actual: 9
            })
        );
    }

    #[test]
    fn test_parse_address_accepts_ten_symbols() {
        let address = TristateCode::parse_address("FFF0FF1F00").unwrap();
        assert_eq!(address.len(), ADDRESS_LEN);
    }

    #[test]
    fn test_command_code_on_appends_01() {
        let address = TristateCode::parse_address("FFF0FFF100").unwrap();
        let code = command_code(&address, SwitchState::On);
        assert_eq!(code.as_str(), "FFF0FFF10001");
        assert_eq!(code.len(), COMMAND_LEN);
    }

    #[test]
    fn test_command_code_off_appends_10() {
        let address = TristateCode::parse_address("FFF0FFF100").unwrap();
        let code = command_code(&address, SwitchState::Off);
        assert_eq!(code.as_str(), "FFF0FFF10010");
    }

    #[test]
    fn test_from_str_matches_parse() {
        let parsed: TristateCode = "F0F1".parse().unwrap();
        assert_eq!(parsed, TristateCode::parse("F0F1").unwrap());
    }

    #[test]
    fn test_display_writes_symbols() {
        let code = TristateCode::parse("F01").unwrap();
        assert_eq!(code.to_string(), "F01");
    }
}
