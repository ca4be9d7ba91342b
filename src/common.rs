//! Identifier and text helpers shared across services and handlers.

use crate::errors::ServiceError;
use chrono::Utc;
use rand::RngCore;
use rust_decimal::Decimal;

/// Length of an object identifier in hex characters.
pub const OBJECT_ID_LEN: usize = 24;

/// Generates a new 24-character hex identifier: 4 bytes of big-endian unix seconds
/// followed by 8 random bytes.
pub fn new_object_id() -> String {
    let mut bytes = [0u8; 12];
    let secs = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
    bytes[..4].copy_from_slice(&secs.to_be_bytes());
    rand::thread_rng().fill_bytes(&mut bytes[4..]);
    hex::encode(bytes)
}

/// True when `value` has the shape of an identifier produced by [`new_object_id`].
pub fn is_object_id(value: &str) -> bool {
    value.len() == OBJECT_ID_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Normalizes an identifier to lowercase, rejecting malformed input with `message`.
pub fn parse_object_id(value: &str, message: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if is_object_id(trimmed) {
        Ok(trimmed.to_ascii_lowercase())
    } else {
        Err(ServiceError::ValidationError(message.to_string()))
    }
}

/// Lowercase, dash-separated form of `input` containing only ASCII alphanumerics.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Σ price × quantity over `lines`, or `None` when the total does not fit in a `Decimal`.
pub fn checked_total<I>(lines: I) -> Option<Decimal>
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    lines.into_iter().try_fold(Decimal::ZERO, |total, (price, quantity)| {
        price
            .checked_mul(Decimal::from(quantity))
            .and_then(|line| total.checked_add(line))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn generated_ids_are_well_formed_and_distinct() {
        let a = new_object_id();
        let b = new_object_id();
        assert_eq!(a.len(), OBJECT_ID_LEN);
        assert!(is_object_id(&a));
        assert!(a.chars().all(|c| !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn id_prefix_encodes_creation_time() {
        let id = new_object_id();
        let secs = u32::from_str_radix(&id[..8], 16).unwrap() as i64;
        assert!((Utc::now().timestamp() - secs).abs() <= 2);
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!(!is_object_id("abc"));
        assert!(!is_object_id("zzzzzzzzzzzzzzzzzzzzzzzz"));
        assert_matches!(
            parse_object_id("123", "Invalid order ID format"),
            Err(ServiceError::ValidationError(msg)) if msg == "Invalid order ID format"
        );
        assert_eq!(
            parse_object_id("65A1B2C3D4E5F60718293A4B", "bad").unwrap(),
            "65a1b2c3d4e5f60718293a4b"
        );
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Wireless Mouse -- Pro! "), "wireless-mouse-pro");
        assert_eq!(slugify("USB-C Hub"), "usb-c-hub");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn totals_report_overflow_instead_of_panicking() {
        use rust_decimal_macros::dec;

        assert_eq!(
            checked_total([(dec!(12.50), 3), (dec!(2.00), 1)]),
            Some(dec!(39.50))
        );
        assert_eq!(checked_total(std::iter::empty()), Some(Decimal::ZERO));
        assert_eq!(checked_total([(Decimal::MAX, 2)]), None);
        assert_eq!(checked_total([(Decimal::MAX, 1), (dec!(1), 1)]), None);
    }
}
