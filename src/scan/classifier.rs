use std::fmt;

use serde::{Deserialize, Serialize};

/// Length of a unit serial number barcode.
pub const SERIAL_LEN: usize = 9;
/// Length of a work order (OP) barcode.
pub const WORK_ORDER_LEN: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Serial,
    WorkOrder,
    Invalid,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Serial => write!(f, "SERIAL"),
            TokenKind::WorkOrder => write!(f, "WORK_ORDER"),
            TokenKind::Invalid => write!(f, "INVALID"),
        }
    }
}

/// A classified scanner read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanToken {
    pub kind: TokenKind,
    pub value: String,
}

/// Classifies a raw scanner read by its trimmed length.
///
/// Returns `None` for blank input. Length is counted in characters so a
/// scanner emitting non-ASCII codes is not misclassified by byte count.
pub fn classify(raw: &str) -> Option<ScanToken> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    let kind = match value.chars().count() {
        SERIAL_LEN => TokenKind::Serial,
        WORK_ORDER_LEN => TokenKind::WorkOrder,
        _ => TokenKind::Invalid,
    };
    Some(ScanToken {
        kind,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(raw: &str) -> Option<TokenKind> {
        classify(raw).map(|t| t.kind)
    }

    #[test]
    fn nine_chars_is_serial() {
        assert_eq!(kind_of("ABC123456"), Some(TokenKind::Serial));
        assert_eq!(kind_of("000000001"), Some(TokenKind::Serial));
    }

    #[test]
    fn eleven_chars_is_work_order() {
        assert_eq!(kind_of("OP202412345"), Some(TokenKind::WorkOrder));
    }

    #[test]
    fn every_other_length_is_invalid() {
        for len in (1..40).filter(|l| *l != SERIAL_LEN && *l != WORK_ORDER_LEN) {
            let raw = "7".repeat(len);
            assert_eq!(kind_of(&raw), Some(TokenKind::Invalid), "length {len}");
        }
    }

    #[test]
    fn blank_input_produces_no_token() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("   \r\n"), None);
    }

    #[test]
    fn input_is_trimmed_before_classifying() {
        let token = classify("  ABC123456\n").unwrap();
        assert_eq!(token.kind, TokenKind::Serial);
        assert_eq!(token.value, "ABC123456");
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert_eq!(kind_of("ÇÃO123456"), Some(TokenKind::Serial));
    }
}
