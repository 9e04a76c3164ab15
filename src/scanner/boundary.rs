//! Word-boundary character class.
//!
//! A token is delimited by whitespace, ASCII control/punctuation, common
//! Unicode punctuation blocks and emoji. Letters, digits and marks never
//! delimit.

/// Check whether `c` separates tokens
pub fn is_boundary(c: char) -> bool {
    if c.is_whitespace() {
        return true;
    }

    let cp = c as u32;
    match cp {
        // \t through space, then ! - / : - @ [ - ` { - ~
        0x09..=0x20 | 0x21..=0x2F | 0x3A..=0x40 | 0x5B..=0x60 | 0x7B..=0x7E => true,
        // Latin-1 punctuation and symbols
        0xA1..=0xBF | 0xD7 | 0xF7 => true,
        // General punctuation, including ZWJ
        0x2000..=0x206F => true,
        // CJK symbols and punctuation
        0x3000..=0x303F => true,
        // Fullwidth ASCII punctuation
        0xFF01..=0xFF0F | 0xFF1A..=0xFF20 | 0xFF3B..=0xFF40 | 0xFF5B..=0xFF65 => true,
        _ => is_emoji(cp),
    }
}

/// Emoji presentation and extended pictographic ranges
fn is_emoji(cp: u32) -> bool {
    matches!(
        cp,
        0x2190..=0x21FF
            | 0x2300..=0x23FF
            | 0x2460..=0x24FF
            | 0x25A0..=0x27BF
            | 0x2900..=0x297F
            | 0x2B00..=0x2BFF
            | 0xFE0F
            | 0x1F000..=0x1FAFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_boundaries() {
        for c in [' ', '\t', '\n', ',', '.', '!', '?', '(', ')', '[', ']', '|', '_', '-', '/', '~', '#'] {
            assert!(is_boundary(c), "{:?} should be a boundary", c);
        }
        for c in ['a', 'Z', '0', '9', 'é', 'ß', '中'] {
            assert!(!is_boundary(c), "{:?} should not be a boundary", c);
        }
    }

    #[test]
    fn test_unicode_boundaries() {
        assert!(is_boundary('，'));
        assert!(is_boundary('。'));
        assert!(is_boundary('—'));
        assert!(is_boundary('«'));
        assert!(is_boundary('🔗'));
        assert!(is_boundary('😀'));
        assert!(is_boundary('✅'));
        assert!(is_boundary('\u{00A0}'));
    }
}
