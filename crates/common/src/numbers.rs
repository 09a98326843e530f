//! Numeric argument parsing
//!
//! IDs and endpoints are accepted either as `0x`-prefixed hex or as plain
//! decimal numbers: `0x1b1c` and `6940` name the same vendor.

use crate::{Error, Result};

/// Parse a `0x`-prefixed hex or decimal number
pub fn parse_number(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let invalid = |reason: &str| Error::InvalidNumber {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    let (digits, radix) = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (trimmed, 10),
    };

    if digits.is_empty() {
        return Err(invalid("no digits"));
    }
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(invalid(if radix == 16 {
            "not a hex number"
        } else {
            "not a number (use 0x for hex)"
        }));
    }

    u64::from_str_radix(digits, radix).map_err(|e| invalid(&e.to_string()))
}

/// Parse a USB vendor or product ID: non-zero and at most 16 bits
pub fn parse_usb_id(input: &str) -> Result<u16> {
    let value = parse_number(input)?;
    if value == 0 {
        return Err(Error::InvalidNumber {
            input: input.to_string(),
            reason: "USB ID is zero".to_string(),
        });
    }
    u16::try_from(value).map_err(|_| Error::InvalidNumber {
        input: input.to_string(),
        reason: "USB ID is greater than 16 bits".to_string(),
    })
}

/// Parse an endpoint address: non-zero and at most 8 bits
pub fn parse_endpoint(input: &str) -> Result<u8> {
    let value = parse_number(input)?;
    if value == 0 {
        return Err(Error::InvalidNumber {
            input: input.to_string(),
            reason: "endpoint 0 is the control endpoint".to_string(),
        });
    }
    u8::try_from(value).map_err(|_| Error::InvalidNumber {
        input: input.to_string(),
        reason: "endpoint address is greater than 8 bits".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_number_forms() {
        assert_eq!(parse_number("0x1b1c").unwrap(), 0x1b1c);
        assert_eq!(parse_number("0X1B1C").unwrap(), 0x1b1c);
        assert_eq!(parse_number("6940").unwrap(), 6940);
        assert_eq!(parse_number(" 42 ").unwrap(), 42);
    }

    #[test]
    fn test_parse_number_rejects_garbage() {
        assert!(parse_number("").is_err());
        assert!(parse_number("0x").is_err());
        assert!(parse_number("1b1c").is_err());
        assert!(parse_number("0xzz").is_err());
        assert!(parse_number("-1").is_err());
    }

    #[test]
    fn test_parse_usb_id_range() {
        assert_eq!(parse_usb_id("0x1b2e").unwrap(), 0x1b2e);
        assert_eq!(parse_usb_id("0xffff").unwrap(), 0xffff);
        assert!(parse_usb_id("0").is_err());
        assert!(parse_usb_id("0x10000").is_err());
    }

    #[test]
    fn test_parse_endpoint_range() {
        assert_eq!(parse_endpoint("0x82").unwrap(), 0x82);
        assert_eq!(parse_endpoint("3").unwrap(), 3);
        assert!(parse_endpoint("0").is_err());
        assert!(parse_endpoint("0x100").is_err());
    }

    proptest! {
        #[test]
        fn prop_hex_and_decimal_agree(id in 1u16..=u16::MAX) {
            prop_assert_eq!(parse_usb_id(&format!("{:#x}", id)).unwrap(), id);
            prop_assert_eq!(parse_usb_id(&id.to_string()).unwrap(), id);
        }
    }
}
