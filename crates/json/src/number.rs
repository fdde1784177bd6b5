//! Numeric literals.
//!
//! Integer-literal syntax (`42`, `0x2a`, `0o52`, `0b101010`, `052`,
//! `1_000`) goes through a 64-bit integer, so a leading zero means octal.
//! Float-literal syntax (`.5`, `0600.`, `1e3`, `0x1p-2`) goes straight to
//! a float: `0600` is 384 while `0600.` is 600.

/// Parses a scanned literal, sign included, into the float64 it denotes.
pub(crate) fn parse_number(lit: &str) -> Result<f64, String> {
    let invalid = || format!("invalid number literal \"{}\"", lit);

    let (negative, body) = match lit.as_bytes().first() {
        Some(b'-') => (true, &lit[1..]),
        Some(b'+') => (false, &lit[1..]),
        _ => (false, lit),
    };
    if body.is_empty() {
        return Err(invalid());
    }

    let lower = body.to_ascii_lowercase();
    let hex = lower.starts_with("0x");
    let float = if hex {
        lower.contains('p') || lower.contains('.')
    } else {
        !lower.starts_with("0b") && !lower.starts_with("0o") && lower.contains(['.', 'e'])
    };

    let magnitude = if float {
        if hex {
            parse_hex_float(&lower[2..])
        } else {
            parse_decimal_float(&lower)
        }
    } else {
        parse_int(&lower, negative).map(|i| i.unsigned_abs() as f64)
    }
    .ok_or_else(invalid)?;

    Ok(if negative { -magnitude } else { magnitude })
}

/// Integer literal without its sign. The returned value fits an i64
/// once the sign is applied.
fn parse_int(body: &str, negative: bool) -> Option<i64> {
    let (radix, digits, prefixed) = if let Some(d) = body.strip_prefix("0x") {
        (16, d, true)
    } else if let Some(d) = body.strip_prefix("0o") {
        (8, d, true)
    } else if let Some(d) = body.strip_prefix("0b") {
        (2, d, true)
    } else if body.len() > 1 && body.starts_with('0') {
        (8, &body[1..], true)
    } else {
        (10, body, false)
    };
    if !underscores_ok(digits, prefixed) {
        return None;
    }
    let clean: String = digits.chars().filter(|c| *c != '_').collect();
    if clean.is_empty() {
        return None;
    }
    let n = u64::from_str_radix(&clean, radix).ok()?;
    let limit = if negative {
        i64::MIN.unsigned_abs()
    } else {
        i64::MAX as u64
    };
    if n > limit {
        return None;
    }
    Some(if negative {
        (n as i64).wrapping_neg()
    } else {
        n as i64
    })
}

fn parse_decimal_float(body: &str) -> Option<f64> {
    if !body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | '+' | '-' | '_'))
    {
        return None;
    }
    let (mantissa, exponent) = match body.split_once('e') {
        Some((m, e)) => (m, Some(e)),
        None => (body, None),
    };
    if !mantissa.split('.').all(|part| underscores_ok(part, false)) {
        return None;
    }
    if let Some(e) = exponent {
        let digits = e.strip_prefix(['+', '-']).unwrap_or(e);
        if digits.is_empty() || !underscores_ok(digits, false) {
            return None;
        }
    }
    let clean: String = body.chars().filter(|c| *c != '_').collect();
    if !clean.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    clean.parse::<f64>().ok()
}

/// Hexadecimal float after its `0x` prefix: `mantissa[.fraction]p[±]exp`.
fn parse_hex_float(body: &str) -> Option<f64> {
    let (mantissa, exponent) = body.split_once('p')?;
    let digits = exponent.strip_prefix(['+', '-']).unwrap_or(exponent);
    if digits.is_empty() || !underscores_ok(digits, false) {
        return None;
    }
    let exp: i32 = exponent.replace('_', "").parse().ok()?;

    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if !underscores_ok(int_part, true) || !underscores_ok(frac_part, false) {
        return None;
    }
    let mut value = 0f64;
    let mut seen = false;
    for c in int_part.chars().chain(frac_part.chars()).filter(|c| *c != '_') {
        value = value * 16.0 + f64::from(c.to_digit(16)?);
        seen = true;
    }
    if !seen {
        return None;
    }
    if value == 0.0 {
        return Some(0.0);
    }
    // Saturates: extreme exponents underflow to zero or overflow to infinity.
    let frac_digits = frac_part.chars().filter(|c| *c != '_').count();
    let frac_bits = i32::try_from(frac_digits).unwrap_or(i32::MAX).saturating_mul(4);
    Some(value * 2f64.powi(exp.saturating_sub(frac_bits)))
}

/// Underscores may only sit between two digits, or right after a base
/// prefix when `prefixed`.
fn underscores_ok(digits: &str, prefixed: bool) -> bool {
    let bytes = digits.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b != b'_' {
            continue;
        }
        let after_digit = if i == 0 {
            prefixed
        } else {
            bytes[i - 1] != b'_'
        };
        let before_digit = bytes.get(i + 1).is_some_and(|n| *n != b'_');
        if !after_digit || !before_digit {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_literals() {
        assert_eq!(parse_number("42"), Ok(42.0));
        assert_eq!(parse_number("-42"), Ok(-42.0));
        assert_eq!(parse_number("+42"), Ok(42.0));
        assert_eq!(parse_number("0"), Ok(0.0));
        assert_eq!(parse_number("0600"), Ok(384.0));
        assert_eq!(parse_number("0o600"), Ok(384.0));
        assert_eq!(parse_number("0x2A"), Ok(42.0));
        assert_eq!(parse_number("0b101"), Ok(5.0));
        assert_eq!(parse_number("1_000_000"), Ok(1e6));
        assert_eq!(parse_number("0x_ff"), Ok(255.0));
        assert_eq!(parse_number("-9223372036854775808"), Ok(-9.223372036854776e18));
    }

    #[test]
    fn float_literals() {
        assert_eq!(parse_number("0600.123"), Ok(600.123));
        assert_eq!(parse_number("0600."), Ok(600.0));
        assert_eq!(parse_number(".5"), Ok(0.5));
        assert_eq!(parse_number("-.5"), Ok(-0.5));
        assert_eq!(parse_number("1e3"), Ok(1000.0));
        assert_eq!(parse_number("1.5E-1"), Ok(0.15));
        assert_eq!(parse_number("1_0.2_5"), Ok(10.25));
        assert_eq!(parse_number("0x1p-2"), Ok(0.25));
        assert_eq!(parse_number("0x1.8p1"), Ok(3.0));
        assert_eq!(parse_number("0x1.8p-2147483648"), Ok(0.0));
        assert_eq!(parse_number("0x1p2147483647"), Ok(f64::INFINITY));
    }

    #[test]
    fn rejected_literals() {
        for lit in [
            "09", "1__0", "_1", "1_", "0b2", "+", ".", "1e", "0x1.8", "0x", "+inf", "nan",
            "9223372036854775808", "1.5_",
        ] {
            assert!(parse_number(lit).is_err(), "{} should be rejected", lit);
        }
        assert_eq!(
            parse_number("1__0"),
            Err("invalid number literal \"1__0\"".to_string())
        );
    }
}
