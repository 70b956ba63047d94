//! Field extraction for raw modem replies.
//!
//! Replies are short ASCII lines carrying comma-delimited numeric fields after
//! a `+PREFIX:` tag. Every helper here is bounds-checked and fails closed: a
//! reply shorter or stranger than expected yields `None` at the first missing
//! piece, never a scan past the buffer or a fabricated zero.

/// Locates `prefix` and returns the offset immediately after it, skipping any
/// spaces that follow.
pub fn find_field(reply: &[u8], prefix: &str) -> Option<usize> {
    let pat = prefix.as_bytes();
    if pat.is_empty() {
        return None;
    }
    let at = reply.windows(pat.len()).position(|w| w == pat)? + pat.len();
    let spaces = reply[at..].iter().take_while(|&&b| b == b' ').count();
    Some(at + spaces)
}

/// Parses a base-10 integer at `at` (optional spaces and sign first) and
/// returns it with the offset of the first byte past the digits. Parsing stops
/// at a comma or any other non-digit; no digits means `None`, as does an
/// overflowing value.
pub fn next_int(reply: &[u8], at: usize) -> Option<(i32, usize)> {
    let mut i = at;
    while i < reply.len() && reply[i] == b' ' {
        i += 1;
    }
    let mut negative = false;
    if i < reply.len() && (reply[i] == b'-' || reply[i] == b'+') {
        negative = reply[i] == b'-';
        i += 1;
    }
    let digits = i;
    let mut value: i32 = 0;
    while i < reply.len() && reply[i].is_ascii_digit() {
        value = value
            .checked_mul(10)?
            .checked_add(i32::from(reply[i] - b'0'))?;
        i += 1;
    }
    if i == digits {
        return None;
    }
    Some((if negative { -value } else { value }, i))
}

/// Parses a decimal number at `at`, `next_int`-style. Used by callers layering
/// sensor and positioning queries over the raw transaction primitive.
pub fn next_float(reply: &[u8], at: usize) -> Option<(f32, usize)> {
    let mut i = at;
    while i < reply.len() && reply[i] == b' ' {
        i += 1;
    }
    let mut negative = false;
    if i < reply.len() && (reply[i] == b'-' || reply[i] == b'+') {
        negative = reply[i] == b'-';
        i += 1;
    }
    let mut any_digits = false;
    let mut value = 0.0f32;
    while i < reply.len() && reply[i].is_ascii_digit() {
        value = value * 10.0 + f32::from(reply[i] - b'0');
        any_digits = true;
        i += 1;
    }
    if i < reply.len() && reply[i] == b'.' {
        i += 1;
        let mut scale = 0.1f32;
        while i < reply.len() && reply[i].is_ascii_digit() {
            value += f32::from(reply[i] - b'0') * scale;
            scale *= 0.1;
            any_digits = true;
            i += 1;
        }
    }
    if !any_digits {
        return None;
    }
    Some((if negative { -value } else { value }, i))
}

/// Advances past `n` comma-delimited fields starting at `at`; `None` if fewer
/// than `n` delimiters remain.
pub fn skip_fields(reply: &[u8], at: usize, n: usize) -> Option<usize> {
    let mut i = at;
    for _ in 0..n {
        let comma = reply.get(i..)?.iter().position(|&b| b == b',')?;
        i += comma + 1;
    }
    Some(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_offset_after_prefix_and_spaces() {
        let reply = b"\r\n+CIPOPEN: 1,0\r\n";
        let at = find_field(reply, "+CIPOPEN:").unwrap();
        assert_eq!(&reply[at..at + 3], b"1,0");
    }

    #[test]
    fn find_field_skips_every_leading_space() {
        let at = find_field(b"+CSQ:   23,99", "+CSQ:").unwrap();
        assert_eq!(at, 8);
    }

    #[test]
    fn find_field_misses_cleanly() {
        assert_eq!(find_field(b"\r\nOK\r\n", "+CIPOPEN:"), None);
        assert_eq!(find_field(b"", "+CIPOPEN:"), None);
        assert_eq!(find_field(b"+CIP", "+CIPOPEN:"), None);
    }

    #[test]
    fn find_field_at_end_of_reply() {
        // Prefix present but nothing after it.
        assert_eq!(find_field(b"junk+CIPSEND:", "+CIPSEND:"), Some(13));
    }

    #[test]
    fn parses_integer_and_advances() {
        let (value, at) = next_int(b"123,45", 0).unwrap();
        assert_eq!(value, 123);
        assert_eq!(at, 3);
        let (value, at) = next_int(b"123,45", 4).unwrap();
        assert_eq!(value, 45);
        assert_eq!(at, 6);
    }

    #[test]
    fn parses_signed_integers() {
        assert_eq!(next_int(b"-7,", 0), Some((-7, 2)));
        assert_eq!(next_int(b"+7,", 0), Some((7, 2)));
    }

    #[test]
    fn integer_skips_leading_spaces() {
        assert_eq!(next_int(b"  42", 0), Some((42, 4)));
    }

    #[test]
    fn rejects_non_numeric_field() {
        assert_eq!(next_int(b"abc", 0), None);
        assert_eq!(next_int(b",1", 0), None);
        assert_eq!(next_int(b"-", 0), None);
    }

    #[test]
    fn rejects_cursor_at_or_past_end() {
        assert_eq!(next_int(b"12", 2), None);
        assert_eq!(next_int(b"12", 50), None);
    }

    #[test]
    fn rejects_overflowing_integer() {
        assert_eq!(next_int(b"99999999999", 0), None);
    }

    #[test]
    fn parses_float_with_fraction() {
        let (value, at) = next_float(b"12.5,N", 0).unwrap();
        assert!((value - 12.5).abs() < 1e-4);
        assert_eq!(at, 4);
    }

    #[test]
    fn parses_float_without_fraction() {
        let (value, at) = next_float(b"-3,", 0).unwrap();
        assert!((value + 3.0).abs() < 1e-4);
        assert_eq!(at, 2);
    }

    #[test]
    fn rejects_float_without_digits() {
        assert_eq!(next_float(b".,", 0).map(|(_, at)| at), None);
        assert_eq!(next_float(b"", 0).map(|(_, at)| at), None);
    }

    #[test]
    fn skips_comma_delimited_fields() {
        let reply = b"3,1,100,24";
        assert_eq!(skip_fields(reply, 0, 1), Some(2));
        assert_eq!(skip_fields(reply, 0, 2), Some(4));
        assert_eq!(skip_fields(reply, 0, 3), Some(8));
    }

    #[test]
    fn skip_fields_fails_when_delimiters_run_out() {
        assert_eq!(skip_fields(b"3,1", 0, 2), None);
        assert_eq!(skip_fields(b"", 0, 1), None);
        assert_eq!(skip_fields(b"3,1", 99, 1), None);
    }

    #[test]
    fn walks_a_full_reply_line() {
        let reply = b"\r\n+CIPRXGET: 3,1,100,24\r\n\r\nOK\r\n";
        let at = find_field(reply, "+CIPRXGET:").unwrap();
        let at = skip_fields(reply, at, 2).unwrap();
        let (to_read, at) = next_int(reply, at).unwrap();
        let at = skip_fields(reply, at, 1).unwrap();
        let (remaining, _) = next_int(reply, at).unwrap();
        assert_eq!(to_read, 100);
        assert_eq!(remaining, 24);
    }
}
