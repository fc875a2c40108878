//! # Order ID Sequencing
//!
//! Human-readable order identifiers: `{PREFIX}-{YYYY}-{NNNNN}`.
//!
//! ```text
//! PH-2025-00001, PH-2025-00002, ... PH-2025-99999, PH-2025-100000
//! └┬┘ └┬─┘ └─┬─┘
//!  │   │     └── sequence, zero-padded to 5 digits, restarts every year
//!  │   └──────── calendar year of creation
//!  └──────────── caller-chosen prefix
//! ```
//!
//! This module only knows how to format, parse and pick the next id from
//! the ids already stored. The read-then-insert race is handled by the
//! storage layer, which relies on a UNIQUE index and retries.

use crate::error::{CoreError, CoreResult};

/// Width the sequence is zero-padded to.
pub const SEQUENCE_WIDTH: usize = 5;

/// Formats an order id.
///
/// ```rust
/// use resale_core::order_id::format_order_id;
///
/// assert_eq!(format_order_id("PH", 2025, 8), "PH-2025-00008");
/// ```
pub fn format_order_id(prefix: &str, year: i32, sequence: u32) -> String {
    format!(
        "{}-{:04}-{:0width$}",
        prefix,
        year,
        sequence,
        width = SEQUENCE_WIDTH
    )
}

/// The `{prefix}-{year}-` stem shared by every id of that year.
pub fn year_stem(prefix: &str, year: i32) -> String {
    format!("{}-{:04}-", prefix, year)
}

/// Extracts the sequence number of `id` if it belongs to `prefix` and `year`.
///
/// Returns `None` for ids of another prefix/year and for malformed suffixes
/// (non-digits, empty, fewer than five digits, or zero).
pub fn parse_sequence(id: &str, prefix: &str, year: i32) -> Option<u32> {
    let suffix = id.strip_prefix(&year_stem(prefix, year))?;

    if suffix.len() < SEQUENCE_WIDTH || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    match suffix.parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(sequence) => Some(sequence),
    }
}

/// Picks the id following the highest valid sequence among `existing`.
///
/// Malformed historical ids are skipped. With no valid predecessor the
/// sequence starts at 1. A year whose highest sequence is `u32::MAX` has no
/// next id and yields [`CoreError::SequenceExhausted`].
///
/// ```rust
/// use resale_core::order_id::next_order_id_from;
///
/// let existing = ["PH-2025-00007", "PH-2025-00003", "PH-2025-garbage"];
/// assert_eq!(next_order_id_from("PH", 2025, existing).unwrap(), "PH-2025-00008");
/// assert_eq!(next_order_id_from("PH", 2026, existing).unwrap(), "PH-2026-00001");
/// ```
pub fn next_order_id_from<'a, I>(prefix: &str, year: i32, existing: I) -> CoreResult<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let highest = existing
        .into_iter()
        .filter_map(|id| parse_sequence(id, prefix, year))
        .max()
        .unwrap_or(0);

    let next = highest
        .checked_add(1)
        .ok_or_else(|| CoreError::SequenceExhausted {
            stem: year_stem(prefix, year),
        })?;

    Ok(format_order_id(prefix, year, next))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(format_order_id("PH", 2025, 1), "PH-2025-00001");
        assert_eq!(format_order_id("SUB", 2024, 12345), "SUB-2024-12345");
        assert_eq!(format_order_id("PH", 2025, 100_000), "PH-2025-100000");
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse_sequence("PH-2025-00007", "PH", 2025), Some(7));
        assert_eq!(parse_sequence("PH-2025-100000", "PH", 2025), Some(100_000));
        assert_eq!(parse_sequence("PH-2024-00007", "PH", 2025), None);
        assert_eq!(parse_sequence("PHX-2025-00007", "PH", 2025), None);
        assert_eq!(parse_sequence("PH-2025-0007", "PH", 2025), None);
        assert_eq!(parse_sequence("PH-2025-00x07", "PH", 2025), None);
        assert_eq!(parse_sequence("PH-2025-", "PH", 2025), None);
        assert_eq!(parse_sequence("PH-2025-00000", "PH", 2025), None);
        assert_eq!(parse_sequence("PH-2025-99999999999", "PH", 2025), None);
    }

    #[test]
    fn test_next_after_latest() {
        let existing = ["PH-2025-00001", "PH-2025-00007", "PH-2025-00002"];
        assert_eq!(next_order_id_from("PH", 2025, existing).unwrap(), "PH-2025-00008");
    }

    #[test]
    fn test_first_of_year() {
        assert_eq!(next_order_id_from("PH", 2025, []).unwrap(), "PH-2025-00001");

        let last_year = ["PH-2024-00321"];
        assert_eq!(next_order_id_from("PH", 2025, last_year).unwrap(), "PH-2025-00001");
    }

    #[test]
    fn test_malformed_ids_are_skipped() {
        // Lexicographically greater than the valid one, but unparseable
        let existing = ["PH-2025-00004", "PH-2025-ZZZZZ", "PH-2025-9x"];
        assert_eq!(next_order_id_from("PH", 2025, existing).unwrap(), "PH-2025-00005");

        let only_malformed = ["PH-2025-oops"];
        assert_eq!(next_order_id_from("PH", 2025, only_malformed).unwrap(), "PH-2025-00001");
    }

    #[test]
    fn test_other_prefixes_ignored() {
        let existing = ["SUB-2025-00099", "PH-2025-00003"];
        assert_eq!(next_order_id_from("PH", 2025, existing).unwrap(), "PH-2025-00004");
    }

    #[test]
    fn test_exhausted_sequence_is_an_error() {
        let existing = ["PH-2025-4294967295"];
        let err = next_order_id_from("PH", 2025, existing).unwrap_err();
        assert!(matches!(err, CoreError::SequenceExhausted { ref stem } if stem == "PH-2025-"));

        // Other years are unaffected
        assert_eq!(next_order_id_from("PH", 2026, existing).unwrap(), "PH-2026-00001");

        let existing = ["PH-2025-4294967294"];
        assert_eq!(next_order_id_from("PH", 2025, existing).unwrap(), "PH-2025-4294967295");
    }

    #[test]
    fn test_widens_past_five_digits() {
        let existing = ["PH-2025-99999"];
        assert_eq!(next_order_id_from("PH", 2025, existing).unwrap(), "PH-2025-100000");

        let existing = ["PH-2025-99999", "PH-2025-100000"];
        assert_eq!(next_order_id_from("PH", 2025, existing).unwrap(), "PH-2025-100001");
    }
}
