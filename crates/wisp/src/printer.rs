//! Datum → text serialization (spec.md §6.2, the C10 component).
//!
//! Grounded on the teacher's `value.rs` `Display`/repr functions and
//! `types/str.rs`'s `string_repr_fmt` for escaping conventions — both
//! write a value out in a form a reader of the same language could feed
//! back in, with named exceptions for values that have no literal syntax
//! (there, closures and native functions; here, procedures, native
//! procedures, and unrecognized UDTs).

use std::fmt::Write as _;

use crate::datum::{Builtin, Datum, UserDefined};

/// Renders `datum` the way spec.md §6.2 requires: round-trippable for the
/// closed subset of atoms/pairs/arrays/maps/binary/errors/temporal kinds,
/// with procedures, native procedures, sets, builtins, and unknown UDTs
/// printed in the documented non-parsing notations.
#[must_use]
pub fn print(datum: &Datum) -> String {
    let mut out = String::new();
    write_datum(&mut out, datum);
    out
}

fn write_datum(out: &mut String, datum: &Datum) {
    match datum {
        Datum::Nil => out.push_str("()"),
        Datum::Integer(n) => {
            let _ = write!(out, "{n}");
        }
        Datum::Integer64(n) => {
            let _ = write!(out, "{n}L");
        }
        Datum::Double(n) => {
            let mut buf = ryu::Buffer::new();
            out.push_str(buf.format(*n));
            out.push('B');
        }
        Datum::Decimal64(d) => {
            let _ = write!(out, "{d}");
        }
        Datum::Boolean(true) => out.push_str("#t"),
        Datum::Boolean(false) => out.push_str("#f"),
        Datum::String(s) => write_string_literal(out, s),
        Datum::Binary(bytes) => {
            out.push_str("#base64\"");
            out.push_str(&encode_base64(bytes));
            out.push('"');
        }
        Datum::Error(e) => {
            let _ = write!(out, "#error[{}", e.code);
            if !e.message.is_empty() {
                out.push(' ');
                write_string_literal(out, &e.message);
            }
            out.push(']');
        }
        Datum::Date(d) => out.push_str(&crate::external::format_iso_date(*d)),
        Datum::Time(t) => out.push_str(&crate::external::format_iso_time(*t)),
        Datum::DateTime(dt) => out.push_str(&crate::external::format_iso_datetime(*dt)),
        Datum::DatetimeInterval(interval) => {
            let _ = write!(out, "{interval}");
        }
        Datum::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_datum(out, item);
            }
            out.push(']');
        }
        Datum::MapString(map) => {
            out.push('{');
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_string_literal(out, k);
                out.push(' ');
                write_datum(out, v);
            }
            out.push('}');
        }
        Datum::MapInt(map) => {
            out.push('{');
            for (i, (k, v)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                let _ = write!(out, "{k}");
                out.push(' ');
                write_datum(out, v);
            }
            out.push('}');
        }
        Datum::UserDefined(u) => write_user_defined(out, u),
    }
}

fn write_user_defined(out: &mut String, u: &UserDefined) {
    match u {
        UserDefined::Pair(_) => write_pair(out, u),
        UserDefined::Symbol(sym) => out.push_str(sym.name().as_ref()),
        UserDefined::Procedure(proc) => {
            out.push_str("#procedure[(\u{3bb} (");
            for (i, p) in proc.positional_parameters.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(p);
            }
            if let Some(rest) = &proc.rest_parameter {
                if !proc.positional_parameters.is_empty() {
                    out.push(' ');
                }
                out.push_str(". ");
                out.push_str(rest);
            }
            out.push(')');
            for form in &proc.body {
                out.push(' ');
                write_datum(out, form);
            }
            out.push_str(")]");
        }
        UserDefined::NativeProcedure(native) => {
            let _ = write!(out, "#procedure[native {:p}]", native.func);
        }
        UserDefined::Set(set) => {
            out.push_str("#{");
            for (i, item) in set.to_vec().iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                write_datum(out, item);
            }
            out.push('}');
        }
        UserDefined::Builtin(b) => out.push_str(&canonical_builtin_name(*b)),
        UserDefined::Opaque { type_code, payload } => {
            let _ = write!(out, "#udt[{type_code} \"{:#x}\"]", payload.index());
        }
    }
}

/// `λ` prints by that name per spec.md §6.2 ("builtins print by their
/// canonical name (`λ`, ...)"), even though the parser also accepts the
/// ASCII spelling `lambda`.
fn canonical_builtin_name(b: Builtin) -> String {
    match b {
        Builtin::Lambda => "\u{3bb}".to_owned(),
        Builtin::Undefined => "#undefined".to_owned(),
        other => other.to_string(),
    }
}

fn write_pair(out: &mut String, first_udt: &UserDefined) {
    let UserDefined::Pair(node) = first_udt else { unreachable!("caller guarantees a Pair") };
    out.push('(');
    let mut cursor = Datum::UserDefined(UserDefined::Pair(node.clone()));
    let mut first = true;
    loop {
        match &cursor {
            Datum::UserDefined(UserDefined::Pair(p)) => {
                if !first {
                    out.push(' ');
                }
                first = false;
                write_datum(out, &p.first);
                cursor = p.second.clone();
            }
            Datum::Nil => break,
            other => {
                out.push_str(" . ");
                write_datum(out, other);
                break;
            }
        }
    }
    out.push(')');
}

fn write_string_literal(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn encode_base64(bytes: &[u8]) -> String {
    const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity((bytes.len() + 2) / 3 * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0];
        let b1 = chunk.get(1).copied().unwrap_or(0);
        let b2 = chunk.get(2).copied().unwrap_or(0);
        let combined = (u32::from(b0) << 16) | (u32::from(b1) << 8) | u32::from(b2);
        out.push(ALPHABET[(combined >> 18 & 0x3f) as usize] as char);
        out.push(ALPHABET[(combined >> 12 & 0x3f) as usize] as char);
        out.push(if chunk.len() > 1 { ALPHABET[(combined >> 6 & 0x3f) as usize] as char } else { '=' });
        out.push(if chunk.len() > 2 { ALPHABET[(combined & 0x3f) as usize] as char } else { '=' });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;
    use crate::parser::parse_one;

    fn roundtrip_print(src: &str) -> String {
        let mut interner = Interner::new();
        let datum = parse_one(src, &mut interner).expect("parses");
        print(&datum)
    }

    #[test]
    fn integers_print_with_kind_suffix() {
        assert_eq!(roundtrip_print("42"), "42");
        assert_eq!(roundtrip_print("42L"), "42L");
    }

    #[test]
    fn decimal_prints_without_suffix() {
        assert_eq!(roundtrip_print("3.14"), "3.14");
    }

    #[test]
    fn lists_print_with_parens() {
        assert_eq!(roundtrip_print("(1 2 3)"), "(1 2 3)");
    }

    #[test]
    fn improper_list_prints_with_dot() {
        assert_eq!(roundtrip_print("(1 . 2)"), "(1 . 2)");
    }

    #[test]
    fn strings_reescape() {
        assert_eq!(roundtrip_print(r#""a\nb""#), "\"a\\nb\"");
    }

    #[test]
    fn error_literal_prints_with_message() {
        assert_eq!(roundtrip_print(r#"#error[7 "bad"]"#), "#error[7 \"bad\"]");
    }

    #[test]
    fn set_prints_ascending() {
        assert_eq!(roundtrip_print("#{3 1 2}"), "#{1 2 3}");
    }

    #[test]
    fn builtin_lambda_prints_as_lambda_glyph() {
        assert_eq!(print(&Datum::builtin(Builtin::Lambda)), "\u{3bb}");
    }
}
