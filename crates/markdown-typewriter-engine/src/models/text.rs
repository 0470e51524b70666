//! Char/byte offset helpers. Document offsets are Unicode scalar counts.

/// Byte index of the `char_idx`-th char, clamped to `s.len()`.
pub fn char_to_byte(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(b, _)| b)
        .unwrap_or(s.len())
}

/// Char index of `byte_idx`, which must sit on a char boundary (clamped otherwise).
pub fn byte_to_char(s: &str, byte_idx: usize) -> usize {
    let byte_idx = byte_idx.min(s.len());
    s.char_indices().take_while(|(b, _)| *b < byte_idx).count()
}

pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_round_trip_over_multibyte_text() {
        let s = "a•b世c";
        assert_eq!(char_to_byte(s, 2), 4);
        assert_eq!(byte_to_char(s, 4), 2);
        assert_eq!(char_len(s), 5);
    }

    #[test]
    fn out_of_range_is_clamped() {
        assert_eq!(char_to_byte("abc", 10), 3);
        assert_eq!(byte_to_char("abc", 10), 3);
    }
}
