//! Boundary for the collaborators spec.md §1 scopes out of the core:
//! decimal-64 arithmetic, base64 and JSON-string literal decoding, and
//! ISO-8601 temporal parsing. Each is exposed as a narrow function or
//! newtype so the lexer/parser/evaluator depend only on the interface,
//! never the implementation strategy.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Stand-in for the "external decimal library" spec.md §1 assumes,
/// exposing exactly the operations the evaluator's arithmetic (§4.4) and
/// printer (§6.2) need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decimal64(Decimal);

impl Decimal64 {
    #[must_use]
    pub fn new(inner: Decimal) -> Self {
        Self(inner)
    }

    pub fn parse(text: &str) -> Result<Self, rust_decimal::Error> {
        text.parse().map(Self)
    }

    #[must_use]
    pub fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }

    #[must_use]
    pub fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }

    #[must_use]
    pub fn mul(self, other: Self) -> Self {
        Self(self.0 * other.0)
    }

    #[must_use]
    pub fn div(self, other: Self) -> Self {
        Self(self.0 / other.0)
    }

    #[must_use]
    pub fn neg(self) -> Self {
        Self(-self.0)
    }

    /// Decomposes into `(sign, mantissa, exponent)` such that
    /// `value == sign * mantissa * 10^exponent`, the form spec.md §4.4's
    /// cross-kind `=` comparison with `double` needs.
    #[must_use]
    pub fn decompose(self) -> (i8, u64, i32) {
        let sign = if self.0.is_sign_negative() { -1 } else { 1 };
        let mantissa = self.0.mantissa().unsigned_abs() as u64;
        let exponent = -i32::from(self.0.scale() as i16);
        (sign, mantissa, exponent)
    }

    #[must_use]
    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or(f64::NAN)
    }
}

impl fmt::Display for Decimal64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compares a `double` against a `decimal64` by decomposing both into
/// `sign * mantissa * 2^e2 * 5^e5` (mantissa odd) and comparing
/// structurally, per spec.md §4.4, avoiding precision loss from
/// converting one representation into the other.
#[must_use]
pub fn decimal_double_eq(dec: Decimal64, dbl: f64) -> bool {
    if !dbl.is_finite() {
        return false;
    }
    let (dsign, dmant, dexp) = dec.decompose();
    if dmant == 0 {
        return dbl == 0.0;
    }
    let dsign = f64::from(dsign);
    let bits = dbl.to_bits();
    let bsign: f64 = if bits >> 63 == 1 { -1.0 } else { 1.0 };
    if dsign != bsign {
        return false;
    }
    // Reduce the decimal mantissa*10^exp to canonical mantissa*2^e2*5^e5 form.
    let (mut dec_mant, mut e2, mut e5) = (dmant, 0i64, 0i64);
    if dexp >= 0 {
        e2 += i64::from(dexp);
        e5 += i64::from(dexp);
    } else {
        // 10^-k = 5^-k * 2^-k is handled by keeping the mantissa as-is and
        // recording negative powers; since mantissa is already an integer
        // (no fractional component in our decompose), a negative exponent
        // with no divisibility means the value is not representable as an
        // exact binary float and thus cannot equal a finite `double`.
        let k = (-dexp) as u32;
        let divisor = 10u64.checked_pow(k);
        match divisor {
            Some(d) if dec_mant % d == 0 => dec_mant /= d,
            _ => return false,
        }
    }
    while dec_mant % 2 == 0 && dec_mant != 0 {
        dec_mant /= 2;
        e2 += 1;
    }
    while dec_mant % 5 == 0 && dec_mant != 0 {
        dec_mant /= 5;
        e5 += 1;
    }

    let exp = bits >> 52 & 0x7ff;
    let frac = bits & ((1u64 << 52) - 1);
    let (mut bin_mant, mut bexp) = if exp == 0 {
        (frac, -1074i64)
    } else {
        (frac | (1u64 << 52), i64::from(exp) - 1075)
    };
    if bin_mant == 0 {
        return dec_mant == 0;
    }
    while bin_mant % 2 == 0 {
        bin_mant /= 2;
        bexp += 1;
    }
    dec_mant == bin_mant && e2 == bexp && e5 == 0
}

/// Decodes a standard-alphabet base64 string, hand-rolled in the style of
/// the teacher's own `modules/base64_mod.rs` (which reimplements base64
/// rather than depending on a crate, since it is re-implementing a stdlib
/// module byte-for-byte).
pub fn decode_base64(input: &str) -> Result<Vec<u8>, &'static str> {
    fn value(byte: u8) -> Option<u8> {
        match byte {
            b'A'..=b'Z' => Some(byte - b'A'),
            b'a'..=b'z' => Some(byte - b'a' + 26),
            b'0'..=b'9' => Some(byte - b'0' + 52),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }

    let bytes: Vec<u8> = input.bytes().filter(|b| *b != b'=').collect();
    if bytes.len() % 4 == 1 {
        return Err("invalid base64 length");
    }
    let mut out = Vec::with_capacity(bytes.len() * 3 / 4 + 3);
    for chunk in bytes.chunks(4) {
        let mut buf = [0u8; 4];
        for (slot, byte) in buf.iter_mut().zip(chunk.iter()) {
            *slot = value(*byte).ok_or("invalid base64 character")?;
        }
        let n = chunk.len();
        let combined = u32::from(buf[0]) << 18 | u32::from(buf[1]) << 12 | u32::from(buf[2]) << 6 | u32::from(buf[3]);
        out.push((combined >> 16) as u8);
        if n > 2 {
            out.push((combined >> 8) as u8);
        }
        if n > 3 {
            out.push(combined as u8);
        }
    }
    Ok(out)
}

/// Decodes the backslash escapes of a JSON-extended string literal body
/// (the text between, but not including, the surrounding quotes).
pub fn decode_json_string_escapes(body: &str) -> Result<String, &'static str> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next().ok_or("unterminated escape")? {
            '"' => out.push('"'),
            '\\' => out.push('\\'),
            '/' => out.push('/'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'u' => {
                let hex: String = (&mut chars).take(4).collect();
                if hex.len() != 4 {
                    return Err("truncated unicode escape");
                }
                let code = u32::from_str_radix(&hex, 16).map_err(|_| "invalid unicode escape")?;
                out.push(char::from_u32(code).ok_or("invalid unicode scalar")?);
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

/// A signed duration with day/time components, per spec.md §3.1's
/// `datetime_interval` kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatetimeInterval(TimeDelta);

impl DatetimeInterval {
    #[must_use]
    pub fn from_delta(delta: TimeDelta) -> Self {
        Self(delta)
    }

    #[must_use]
    pub fn delta(self) -> TimeDelta {
        self.0
    }
}

impl PartialOrd for DatetimeInterval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DatetimeInterval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for DatetimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.num_seconds();
        let days = total.div_euclid(86_400);
        let rem = total.rem_euclid(86_400);
        write!(f, "#P{days}D{}S", rem)
    }
}

/// Parses an ISO-8601 date (`YYYY-MM-DD`).
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Parses an ISO-8601 time-of-day (`HH:MM:SS[.ffffff]`).
pub fn parse_iso_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f").ok().or_else(|| NaiveTime::parse_from_str(text, "%H:%M:%S").ok())
}

/// Parses an ISO-8601 datetime (`YYYY-MM-DDTHH:MM:SS[.ffffff]`).
pub fn parse_iso_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").ok())
}

#[must_use]
pub fn format_iso_date(date: NaiveDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

#[must_use]
pub fn format_iso_time(time: NaiveTime) -> String {
    format!("{:02}:{:02}:{:02}", time.hour(), time.minute(), time.second())
}

#[must_use]
pub fn format_iso_datetime(dt: NaiveDateTime) -> String {
    format!("{}T{}", format_iso_date(dt.date()), format_iso_time(dt.time()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_roundtrips_known_vector() {
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn json_escapes_decode() {
        assert_eq!(decode_json_string_escapes("a\\nb\\u0041").unwrap(), "a\nbA");
    }

    #[test]
    fn decimal_double_cross_kind_equality() {
        let dec = Decimal64::parse("2.0").unwrap();
        assert!(decimal_double_eq(dec, 2.0));
        assert!(!decimal_double_eq(dec, 2.1));
    }

    #[test]
    fn iso_date_roundtrip() {
        let d = parse_iso_date("2020-11-29").unwrap();
        assert_eq!(format_iso_date(d), "2020-11-29");
    }
}
