//! Address expressions of the form `[s=<station>;][x=<function>;]<offset>`.
//!
//! A bare offset addresses the client's default station with the
//! operation's implicit function code; `s=` and `x=` tokens override
//! either. Parsing is case-sensitive and admits no whitespace.

use core::fmt;

/// A parsed address expression. `offset` already holds the wire value:
/// under one-based addressing the caller-visible offset has been
/// decremented during parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointAddress {
    pub station: Option<u8>,
    pub function: Option<u8>,
    pub offset: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressError {
    Empty,
    MissingOffset,
    UnknownToken,
    InvalidStation,
    InvalidFunction,
    InvalidOffset,
    OffsetOutOfRange,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty address expression"),
            Self::MissingOffset => f.write_str("address expression has no offset"),
            Self::UnknownToken => f.write_str("unknown token in address expression"),
            Self::InvalidStation => f.write_str("invalid station number"),
            Self::InvalidFunction => f.write_str("invalid function code override"),
            Self::InvalidOffset => f.write_str("malformed offset"),
            Self::OffsetOutOfRange => f.write_str("offset out of range"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AddressError {}

/// Highest assignable station number; 0 is the broadcast address.
pub const MAX_STATION: u8 = 247;

/// Strict decimal parse: digits only, no sign, no whitespace.
fn parse_decimal<T: core::str::FromStr>(token: &str) -> Option<T> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Parse an address expression.
///
/// With `zero_based` false the offset is decremented by one before it
/// becomes the wire value, so offset 0 is then out of range.
pub fn parse(expr: &str, zero_based: bool) -> Result<PointAddress, AddressError> {
    if expr.is_empty() {
        return Err(AddressError::Empty);
    }

    let mut station = None;
    let mut function = None;

    let mut tokens = expr.split(';');
    let offset_token = tokens.next_back().ok_or(AddressError::Empty)?;
    for token in tokens {
        if let Some(value) = token.strip_prefix("s=") {
            let parsed: u8 = parse_decimal(value).ok_or(AddressError::InvalidStation)?;
            if parsed > MAX_STATION {
                return Err(AddressError::InvalidStation);
            }
            station = Some(parsed);
        } else if let Some(value) = token.strip_prefix("x=") {
            function = Some(parse_decimal(value).ok_or(AddressError::InvalidFunction)?);
        } else {
            return Err(AddressError::UnknownToken);
        }
    }

    if offset_token.is_empty() {
        return Err(AddressError::MissingOffset);
    }
    let mut offset: u32 = parse_decimal(offset_token).ok_or(AddressError::InvalidOffset)?;
    if !zero_based {
        offset = offset.checked_sub(1).ok_or(AddressError::OffsetOutOfRange)?;
    }
    let offset: u16 = offset
        .try_into()
        .map_err(|_| AddressError::OffsetOutOfRange)?;

    Ok(PointAddress {
        station,
        function,
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::{parse, AddressError, PointAddress};

    #[test]
    fn bare_offset_under_both_bases() {
        assert_eq!(
            parse("100", true).unwrap(),
            PointAddress {
                station: None,
                function: None,
                offset: 100
            }
        );
        assert_eq!(parse("100", false).unwrap().offset, 99);
    }

    #[test]
    fn station_and_function_overrides() {
        assert_eq!(
            parse("s=3;x=4;7", true).unwrap(),
            PointAddress {
                station: Some(3),
                function: Some(4),
                offset: 7
            }
        );
        assert_eq!(parse("x=4;7", true).unwrap().station, None);
        assert_eq!(parse("s=3;7", true).unwrap().function, None);
    }

    #[test]
    fn missing_offset_is_an_error() {
        assert_eq!(parse("s=3;", true).unwrap_err(), AddressError::MissingOffset);
        assert_eq!(parse("", true).unwrap_err(), AddressError::Empty);
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert_eq!(parse("q=1;5", true).unwrap_err(), AddressError::UnknownToken);
        // Case-sensitive: `S=` is not a station token.
        assert_eq!(parse("S=1;5", true).unwrap_err(), AddressError::UnknownToken);
        assert_eq!(parse(";100", true).unwrap_err(), AddressError::UnknownToken);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert_eq!(
            parse("s=abc;5", true).unwrap_err(),
            AddressError::InvalidStation
        );
        assert_eq!(
            parse("s= 3;5", true).unwrap_err(),
            AddressError::InvalidStation
        );
        assert_eq!(parse("x=;5", true).unwrap_err(), AddressError::InvalidFunction);
        assert_eq!(parse("abc", true).unwrap_err(), AddressError::InvalidOffset);
        assert_eq!(parse("+100", true).unwrap_err(), AddressError::InvalidOffset);
    }

    #[test]
    fn station_range_is_validated() {
        assert_eq!(parse("s=247;5", true).unwrap().station, Some(247));
        assert_eq!(parse("s=0;5", true).unwrap().station, Some(0));
        assert_eq!(
            parse("s=248;5", true).unwrap_err(),
            AddressError::InvalidStation
        );
    }

    #[test]
    fn offset_bounds() {
        assert_eq!(parse("65535", true).unwrap().offset, 0xFFFF);
        assert_eq!(
            parse("65536", true).unwrap_err(),
            AddressError::OffsetOutOfRange
        );
        // One-based addressing shifts the valid range up by one.
        assert_eq!(parse("65536", false).unwrap().offset, 0xFFFF);
        assert_eq!(parse("1", false).unwrap().offset, 0);
        assert_eq!(parse("0", false).unwrap_err(), AddressError::OffsetOutOfRange);
    }
}
