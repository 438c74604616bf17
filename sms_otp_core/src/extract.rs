/// ASCII word characters (`[A-Za-z0-9_]`). Anything else, including every
/// byte of a multi-byte UTF-8 sequence, acts as a token boundary.
#[inline]
fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Find the first standalone run of exactly `otp_length` ASCII digits.
///
/// A run counts only when it is maximal (not part of a longer digit run) and
/// both neighbours are non-word characters or the string edge, so `A482913`
/// and `4829130` never yield `482913`. Returns `None` for `otp_length == 0`.
pub fn extract_otp(text: &str, otp_length: usize) -> Option<String> {
    if otp_length == 0 {
        return None;
    }

    let b = text.as_bytes();
    let mut i = 0usize;
    while i < b.len() {
        if !b[i].is_ascii_digit() {
            i += 1;
            continue;
        }

        let start = i;
        while i < b.len() && b[i].is_ascii_digit() {
            i += 1;
        }

        let left_ok = start == 0 || !is_word(b[start - 1]);
        let right_ok = i == b.len() || !is_word(b[i]);
        if left_ok && right_ok && i - start == otp_length {
            // Digits are ASCII, so both ends sit on char boundaries.
            return Some(text[start..i].to_string());
        }

        // Skip the rest of a word glued to this run ("123abc456").
        while i < b.len() && is_word(b[i]) {
            i += 1;
        }
    }
    None
}
