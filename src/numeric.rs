//! Permissive number parsing for `--line` and `--timeout` style values.
//!
//! Accepts surrounding whitespace, a leading `+`, `_` between digits and,
//! for integers, `0x`/`0o`/`0b` prefixes. Anything else is rejected.

pub fn parse_int(value: &str) -> Option<i64> {
    let trimmed = value.trim();
    let (negative, unsigned) = split_sign(trimmed);
    let digits = strip_separators(unsigned)?;

    let (radix, body) = match digits.get(..2) {
        Some("0x") | Some("0X") => (16, &digits[2..]),
        Some("0o") | Some("0O") => (8, &digits[2..]),
        Some("0b") | Some("0B") => (2, &digits[2..]),
        _ => (10, digits.as_str()),
    };
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    let magnitude = i64::from_str_radix(body, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

pub fn parse_float(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let (negative, unsigned) = split_sign(trimmed);
    let digits = strip_separators(unsigned)?;

    // Rust also parses "inf" and "NaN"; those are not numbers here.
    let valid = !digits.is_empty()
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        && digits.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '.');
    if !valid {
        return None;
    }

    let magnitude: f64 = digits.parse().ok()?;
    if !magnitude.is_finite() {
        return None;
    }
    Some(if negative { -magnitude } else { magnitude })
}

fn split_sign(value: &str) -> (bool, &str) {
    if let Some(rest) = value.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = value.strip_prefix('+') {
        (false, rest)
    } else {
        (false, value)
    }
}

/// Removes `_` separators, which must sit between two alphanumerics.
fn strip_separators(value: &str) -> Option<String> {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' {
            let before = i.checked_sub(1).and_then(|j| chars.get(j));
            let after = chars.get(i + 1);
            let between = before.is_some_and(|b| b.is_ascii_alphanumeric())
                && after.is_some_and(|a| a.is_ascii_alphanumeric());
            if !between {
                return None;
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int_permissive() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int(" +42 "), Some(42));
        assert_eq!(parse_int("-7"), Some(-7));
        assert_eq!(parse_int("1_000"), Some(1000));
        assert_eq!(parse_int("0x2a"), Some(42));
        assert_eq!(parse_int("0b101"), Some(5));
    }

    #[test]
    fn test_parse_int_rejects_garbage() {
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("abc"), None);
        assert_eq!(parse_int("12abc"), None);
        assert_eq!(parse_int("4.2"), None);
        assert_eq!(parse_int("_1"), None);
        assert_eq!(parse_int("0x"), None);
    }

    #[test]
    fn test_parse_float_permissive() {
        assert_eq!(parse_float("1.5"), Some(1.5));
        assert_eq!(parse_float(" 2 "), Some(2.0));
        assert_eq!(parse_float(".5"), Some(0.5));
        assert_eq!(parse_float("1e2"), Some(100.0));
        assert_eq!(parse_float("1_000.25"), Some(1000.25));
        assert_eq!(parse_float("+3"), Some(3.0));
    }

    #[test]
    fn test_parse_float_rejects_garbage() {
        assert_eq!(parse_float("fast"), None);
        assert_eq!(parse_float("inf"), None);
        assert_eq!(parse_float("NaN"), None);
        assert_eq!(parse_float("1.5s"), None);
        assert_eq!(parse_float(""), None);
    }
}
