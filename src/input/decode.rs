use percent_encoding::percent_decode_str;

use crate::error::{ChartError, ChartResult};

/// Percent-decode one query component as `decodeURIComponent` would:
/// a stray `%` or a sequence that is not UTF-8 is an error, `+` is kept.
pub fn decode_component(raw: &str) -> ChartResult<String> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(ChartError::malformed(format!("bad escape at byte {}", i)));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|err| ChartError::malformed(err.to_string()))
}

/// Leading-integer parse in the spirit of `parseInt(s, 10)`: optional
/// whitespace and sign, then digits; anything after the digits is ignored.
pub fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}
