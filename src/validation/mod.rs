//! Detail block parsing
//!
//! Submitters send the reference, quantity and notes as one message (or as
//! the caption of their first photo), one field per line. Everything after
//! the second line belongs to the notes.

use crate::submission::Details;
use crate::{IntakeError, Result};

/// Minimum number of lines a detail block must contain
pub const DETAIL_LINES: usize = 3;

/// Parse a multi-line detail block.
///
/// Lines are split on `\n`; a trailing `\r` on any line is ignored. Fewer
/// than three lines is a format error. Reference and quantity must be
/// non-empty after trimming.
pub fn parse_details(raw: &str) -> Result<Details> {
    let lines: Vec<&str> = raw.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    if lines.len() < DETAIL_LINES {
        return Err(IntakeError::validation(format!(
            "expected {DETAIL_LINES} lines, got {}",
            lines.len()
        )));
    }

    let reference = lines[0].trim();
    let quantity = lines[1].trim();
    if reference.is_empty() {
        return Err(IntakeError::validation("reference line is empty"));
    }
    if quantity.is_empty() {
        return Err(IntakeError::validation("quantity line is empty"));
    }

    Ok(Details {
        reference: reference.to_string(),
        quantity: quantity.to_string(),
        notes: lines[2..].join("\n").trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_three_lines() {
        let details = parse_details("CNT123\n5\nNone").unwrap();
        assert_eq!(details.reference, "CNT123");
        assert_eq!(details.quantity, "5");
        assert_eq!(details.notes, "None");
    }

    #[test]
    fn test_fields_are_trimmed() {
        let details = parse_details("  CNT9 \n 12 pallets\n  torn wrap  ").unwrap();
        assert_eq!(details.reference, "CNT9");
        assert_eq!(details.quantity, "12 pallets");
        assert_eq!(details.notes, "torn wrap");
    }

    #[test]
    fn test_remaining_lines_join_into_notes() {
        let details = parse_details("REF\n3\nline one\nline two\n").unwrap();
        assert_eq!(details.notes, "line one\nline two");
    }

    #[test]
    fn test_crlf_input() {
        let details = parse_details("REF\r\n3\r\nok\r\n").unwrap();
        assert_eq!(details.reference, "REF");
        assert_eq!(details.quantity, "3");
        assert_eq!(details.notes, "ok");
    }

    #[test]
    fn test_too_few_lines_rejected() {
        assert!(parse_details("").is_err());
        assert!(parse_details("CNT123").is_err());
        assert!(parse_details("CNT123\n5").is_err());
    }

    #[test]
    fn test_empty_notes_allowed() {
        let details = parse_details("CNT1\n2\n").unwrap();
        assert_eq!(details.notes, "");
    }

    #[test]
    fn test_blank_reference_rejected() {
        let err = parse_details("   \n5\nnotes").unwrap_err();
        assert!(matches!(err, IntakeError::Validation(_)));
        assert!(parse_details("REF\n \nnotes").is_err());
    }
}
