//! Exact decimal parsing.
//!
//! Digits are accumulated straight into an `i128` mantissa; no floating point is involved, so a
//! token such as `-73.952407836914062` keeps every digit.

use super::CellError;

/// Parse `token` as a `DECIMAL(precision, scale)` mantissa.
///
/// Accepted shape: optional sign, integral digits, optional `.` and fractional digits, with at
/// least one digit overall. Fewer than `scale` fractional digits are padded with zeros; extra
/// fractional digits are only accepted when they are all zeros.
pub(crate) fn parse_decimal(token: &str, precision: u8, scale: u8) -> Result<i128, CellError> {
    let bytes = token.as_bytes();
    let (negative, body) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };

    let (int_part, frac_part) = match body.iter().position(|&b| b == b'.') {
        Some(dot) => (&body[..dot], &body[dot + 1..]),
        None => (body, &body[body.len()..]),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(CellError::invalid("expected decimal digits"));
    }
    if !int_part.iter().chain(frac_part).all(u8::is_ascii_digit) {
        return Err(CellError::invalid("expected [+-]digits[.digits]"));
    }

    let scale_len = usize::from(scale);
    let (kept_frac, excess_frac) = frac_part.split_at(frac_part.len().min(scale_len));
    if excess_frac.iter().any(|&b| b != b'0') {
        return Err(CellError::out_of_range(format!(
            "{} fractional digits exceed scale {scale}",
            frac_part.len()
        )));
    }

    let first_significant = int_part
        .iter()
        .position(|&b| b != b'0')
        .unwrap_or(int_part.len());
    let int_digits = &int_part[first_significant..];
    let max_int_digits = usize::from(precision.saturating_sub(scale));
    if int_digits.len() > max_int_digits {
        return Err(CellError::out_of_range(format!(
            "{} integral digits exceed {max_int_digits} allowed by decimal({precision},{scale})",
            int_digits.len()
        )));
    }

    // At most `precision` (<= 38) digits, so the mantissa cannot overflow an i128.
    let mut mantissa: i128 = 0;
    for &d in int_digits.iter().chain(kept_frac) {
        mantissa = mantissa * 10 + i128::from(d - b'0');
    }
    for _ in kept_frac.len()..scale_len {
        mantissa *= 10;
    }

    Ok(if negative { -mantissa } else { mantissa })
}
