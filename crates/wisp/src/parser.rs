//! Recursive-descent parser from tokens to datum trees (spec.md §4.3, the
//! C4 component).
//!
//! Grounded on the teacher's `exception_private.rs` pattern of an error
//! enum whose every variant carries the failing span, and on the general
//! shape of `parse.rs`'s span bookkeeping — the teacher itself parses
//! Python via `ruff_python_parser`, so there is no hand-written recursive
//! descent to imitate directly; this one is written from scratch against
//! spec.md's own production list.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::datum::{Datum, UserDefined};
use crate::error::{Span, SyntaxError, SyntaxErrorKind};
use crate::external::{decode_base64, decode_json_string_escapes, parse_iso_date, parse_iso_datetime, parse_iso_time, Decimal64, DatetimeInterval};
use crate::heap::Heap;
use crate::intern::{Interner, Symbol};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::persistent_set::PersistentSet;

/// Size of the reserved user-defined type-code range (spec.md §3.1: six
/// codes, `pair` through `builtin`).
const RESERVED_TYPE_COUNT: i32 = 6;

/// Parses a single datum from `src`, assuming type offset `0` and a
/// throw-away heap. Suitable for `#udt`-literal-free input — tests and a
/// REPL's first read before an `Interpreter` (and its long-lived heap) is
/// available. Real programs go through [`crate::run::Interpreter`], which
/// calls [`parse_one_with_heap`] against its own heap and type offset so a
/// `#udt` literal's payload handle stays valid for the program's lifetime.
pub fn parse_one(src: &str, interner: &mut Interner) -> Result<Datum, SyntaxError> {
    let mut scratch_heap = Heap::new();
    parse_one_with_heap(src, interner, &mut scratch_heap, 0)
}

/// Parses a single datum from `src` against a live heap and type offset,
/// the entry point [`crate::run::Interpreter`] uses.
pub fn parse_one_with_heap(src: &str, interner: &mut Interner, heap: &mut Heap, type_offset: i32) -> Result<Datum, SyntaxError> {
    let mut parser = Parser::new(src, interner, heap, type_offset);
    parser.parse_datum()
}

/// Parses every top-level datum in `src` (a whole file, or a REPL paste of
/// several forms).
pub fn parse_all_with_heap(src: &str, interner: &mut Interner, heap: &mut Heap, type_offset: i32) -> Result<Vec<Datum>, SyntaxError> {
    let mut parser = Parser::new(src, interner, heap, type_offset);
    let mut out = Vec::new();
    loop {
        if parser.peek()?.kind == TokenKind::Eof {
            return Ok(out);
        }
        out.push(parser.parse_datum()?);
    }
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    interner: &'a mut Interner,
    heap: &'a mut Heap,
    type_offset: i32,
    peeked: Option<Token>,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, interner: &'a mut Interner, heap: &'a mut Heap, type_offset: i32) -> Self {
        Self { lexer: Lexer::new(src), interner, heap, type_offset, peeked: None }
    }

    /// Pulls the next token that is actually part of the grammar, skipping
    /// whitespace and line/shebang comments, and fully consuming (and
    /// discarding) the datum a `#;` prefix applies to (spec.md §4.3).
    fn next_relevant_token(&mut self) -> Result<Token, SyntaxError> {
        loop {
            let tok = self.lexer.next_token()?;
            match tok.kind {
                TokenKind::Whitespace | TokenKind::CommentLine | TokenKind::CommentShebang => continue,
                TokenKind::CommentDatum => {
                    self.parse_datum()?;
                    continue;
                }
                _ => return Ok(tok),
            }
        }
    }

    fn peek(&mut self) -> Result<&Token, SyntaxError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.next_relevant_token()?);
        }
        Ok(self.peeked.as_ref().expect("just filled"))
    }

    fn advance(&mut self) -> Result<Token, SyntaxError> {
        self.peek()?;
        Ok(self.peeked.take().expect("just filled by peek"))
    }

    fn expect(&mut self, kind: TokenKind, err_kind: SyntaxErrorKind, message: &str) -> Result<Token, SyntaxError> {
        let tok = self.advance()?;
        if tok.kind != kind {
            return Err(SyntaxError { kind: err_kind, span: tok.span, message: message.to_owned() });
        }
        Ok(tok)
    }

    fn intern_symbol(&mut self, name: &str) -> Symbol {
        Symbol::new_out_of_place(name, self.interner)
    }

    pub fn parse_datum(&mut self) -> Result<Datum, SyntaxError> {
        let tok = self.advance()?;
        self.parse_from_token(tok)
    }

    fn parse_from_token(&mut self, tok: Token) -> Result<Datum, SyntaxError> {
        match tok.kind {
            TokenKind::Eof => Err(SyntaxError { kind: SyntaxErrorKind::Eof, span: tok.span, message: "unexpected end of input".into() }),
            TokenKind::True => Ok(Datum::Boolean(true)),
            TokenKind::False => Ok(Datum::Boolean(false)),
            TokenKind::String => self.parse_string_literal(&tok),
            TokenKind::Bytes => self.parse_bytes_literal(&tok),
            TokenKind::Int32 => tok
                .text
                .parse::<i32>()
                .map(Datum::Integer)
                .map_err(|e| self.number_error(&tok, e)),
            TokenKind::Int64 => tok
                .text
                .trim_end_matches('L')
                .parse::<i64>()
                .map(Datum::Integer64)
                .map_err(|e| self.number_error(&tok, e)),
            TokenKind::Double => normalize_decimal_separator(tok.text.trim_end_matches('B'))
                .parse::<f64>()
                .map(Datum::Double)
                .map_err(|e| self.number_error(&tok, e)),
            TokenKind::Decimal64 => Decimal64::parse(&normalize_decimal_separator(&tok.text))
                .map(Datum::Decimal64)
                .map_err(|e| self.number_error(&tok, e)),
            TokenKind::Date => parse_iso_date(&tok.text)
                .map(Datum::Date)
                .ok_or_else(|| self.temporal_error(&tok)),
            TokenKind::Time => parse_iso_time(&tok.text)
                .map(Datum::Time)
                .ok_or_else(|| self.temporal_error(&tok)),
            TokenKind::DateTime => parse_iso_datetime(&tok.text)
                .map(Datum::DateTime)
                .ok_or_else(|| self.temporal_error(&tok)),
            TokenKind::DatetimeInterval => self.parse_interval_literal(&tok),
            TokenKind::Symbol => Ok(Datum::symbol(self.intern_symbol(&tok.text))),
            TokenKind::OpenParen => self.parse_list(),
            TokenKind::OpenSquare => self.parse_array(),
            TokenKind::OpenCurly => self.parse_map(),
            TokenKind::OpenSetBrace => self.parse_set(),
            TokenKind::Quote => self.parse_reader_macro("quote", tok.span),
            TokenKind::Quasiquote => self.parse_reader_macro("quasiquote", tok.span),
            TokenKind::Unquote => self.parse_reader_macro("unquote", tok.span),
            TokenKind::UnquoteSplicing => self.parse_reader_macro("unquote-splicing", tok.span),
            TokenKind::Syntax => self.parse_reader_macro("syntax", tok.span),
            TokenKind::Quasisyntax => self.parse_reader_macro("quasisyntax", tok.span),
            TokenKind::Unsyntax => self.parse_reader_macro("unsyntax", tok.span),
            TokenKind::UnsyntaxSplicing => self.parse_reader_macro("unsyntax-splicing", tok.span),
            TokenKind::ErrorTag => self.parse_error_literal(),
            TokenKind::UserDefinedTypeTag => self.parse_udt_literal(),
            TokenKind::CloseParen | TokenKind::CloseSquare | TokenKind::CloseCurly | TokenKind::PairSeparator => {
                Err(SyntaxError { kind: SyntaxErrorKind::NotAValue, span: tok.span, message: format!("unexpected {:?}", tok.kind) })
            }
            TokenKind::Whitespace | TokenKind::CommentLine | TokenKind::CommentDatum | TokenKind::CommentShebang => {
                unreachable!("next_relevant_token never yields a trivia token as a datum head")
            }
        }
    }

    fn number_error(&self, tok: &Token, e: impl std::fmt::Display) -> SyntaxError {
        SyntaxError { kind: SyntaxErrorKind::InvalidNumber, span: tok.span, message: format!("invalid number {:?}: {e}", tok.text) }
    }

    fn temporal_error(&self, tok: &Token) -> SyntaxError {
        SyntaxError { kind: SyntaxErrorKind::InvalidTemporal, span: tok.span, message: format!("invalid temporal literal {:?}", tok.text) }
    }

    fn parse_string_literal(&self, tok: &Token) -> Result<Datum, SyntaxError> {
        let body = strip_quotes(&tok.text).ok_or_else(|| self.string_error(tok))?;
        let decoded = decode_json_string_escapes(body).map_err(|_| self.string_error(tok))?;
        Ok(Datum::String(Rc::from(decoded)))
    }

    fn string_error(&self, tok: &Token) -> SyntaxError {
        SyntaxError { kind: SyntaxErrorKind::InvalidString, span: tok.span, message: format!("invalid string literal {:?}", tok.text) }
    }

    fn parse_bytes_literal(&self, tok: &Token) -> Result<Datum, SyntaxError> {
        let quoted = tok.text.strip_prefix("#base64").ok_or_else(|| self.bytes_error(tok))?;
        let body = strip_quotes(quoted).ok_or_else(|| self.bytes_error(tok))?;
        let decoded = decode_base64(body).map_err(|_| self.bytes_error(tok))?;
        Ok(Datum::Binary(Rc::from(decoded)))
    }

    fn bytes_error(&self, tok: &Token) -> SyntaxError {
        SyntaxError { kind: SyntaxErrorKind::InvalidBase64, span: tok.span, message: format!("invalid base64 literal {:?}", tok.text) }
    }

    fn parse_interval_literal(&self, tok: &Token) -> Result<Datum, SyntaxError> {
        parse_interval_text(tok.text.strip_prefix("#P").unwrap_or(&tok.text))
            .map(Datum::DatetimeInterval)
            .ok_or_else(|| self.temporal_error(tok))
    }

    fn parse_list(&mut self) -> Result<Datum, SyntaxError> {
        let mut items = Vec::new();
        loop {
            let peeked_kind = self.peek()?.kind;
            match peeked_kind {
                TokenKind::CloseParen => {
                    self.advance()?;
                    return Ok(Datum::list(items));
                }
                TokenKind::Eof => {
                    let span = self.peek()?.span;
                    return Err(SyntaxError { kind: SyntaxErrorKind::IncompleteList, span, message: "unterminated list".into() });
                }
                TokenKind::PairSeparator => {
                    self.advance()?;
                    let tail = self.parse_datum()?;
                    let close = self.advance()?;
                    if close.kind != TokenKind::CloseParen {
                        return Err(SyntaxError {
                            kind: SyntaxErrorKind::PairSuffix,
                            span: close.span,
                            message: "improper list requires exactly one datum after '.'".into(),
                        });
                    }
                    return Ok(items.into_iter().rev().fold(tail, |acc, item| Datum::pair(item, acc)));
                }
                _ => items.push(self.parse_datum()?),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Datum, SyntaxError> {
        let mut items = Vec::new();
        loop {
            match self.peek()?.kind {
                TokenKind::CloseSquare => {
                    self.advance()?;
                    return Ok(Datum::Array(Rc::new(items)));
                }
                TokenKind::Eof => {
                    let span = self.peek()?.span;
                    return Err(SyntaxError { kind: SyntaxErrorKind::IncompleteArray, span, message: "unterminated array".into() });
                }
                _ => items.push(self.parse_datum()?),
            }
        }
    }

    fn parse_set(&mut self) -> Result<Datum, SyntaxError> {
        let mut set = PersistentSet::empty();
        loop {
            match self.peek()?.kind {
                TokenKind::CloseCurly => {
                    self.advance()?;
                    return Ok(Datum::UserDefined(UserDefined::Set(set)));
                }
                TokenKind::Eof => {
                    let span = self.peek()?.span;
                    return Err(SyntaxError { kind: SyntaxErrorKind::IncompleteArray, span, message: "unterminated set".into() });
                }
                _ => {
                    let item = self.parse_datum()?;
                    set = set.insert(item, &crate::builtins::comparator::before);
                }
            }
        }
    }

    /// `{k v k v ...}` (spec.md §4.3): string-keyed if every key is a
    /// string, int-keyed if every key is an `int32`, else a parse error.
    /// An empty map has no keys to decide by; we resolve that silently
    /// (Open Question, see DESIGN.md) in favor of `map_string`.
    fn parse_map(&mut self) -> Result<Datum, SyntaxError> {
        let mut pairs = Vec::new();
        loop {
            match self.peek()?.kind {
                TokenKind::CloseCurly => {
                    self.advance()?;
                    break;
                }
                TokenKind::Eof => {
                    let span = self.peek()?.span;
                    return Err(SyntaxError { kind: SyntaxErrorKind::IncompleteArray, span, message: "unterminated map".into() });
                }
                _ => {
                    let key = self.parse_datum()?;
                    if self.peek()?.kind == TokenKind::Eof {
                        let span = self.peek()?.span;
                        return Err(SyntaxError { kind: SyntaxErrorKind::IncompleteArray, span, message: "map entry missing a value".into() });
                    }
                    let value = self.parse_datum()?;
                    pairs.push((key, value));
                }
            }
        }
        if pairs.iter().all(|(k, _)| matches!(k, Datum::Integer(_))) && !pairs.iter().all(|(k, _)| matches!(k, Datum::String(_))) {
            let map: IndexMap<i32, Datum> = pairs
                .into_iter()
                .map(|(k, v)| match k {
                    Datum::Integer(i) => (i, v),
                    _ => unreachable!("filtered to Integer keys above"),
                })
                .collect();
            return Ok(Datum::MapInt(Rc::new(map)));
        }
        if pairs.iter().all(|(k, _)| matches!(k, Datum::String(_))) {
            let map: IndexMap<Rc<str>, Datum> = pairs
                .into_iter()
                .map(|(k, v)| match k {
                    Datum::String(s) => (s, v),
                    _ => unreachable!("filtered to String keys above"),
                })
                .collect();
            return Ok(Datum::MapString(Rc::new(map)));
        }
        Err(SyntaxError {
            kind: SyntaxErrorKind::MapKeyKindMismatch,
            span: Span { start_offset: 0, end_offset: 0, begin_line: 0, begin_col: 0, end_line: 0, end_col: 0 },
            message: "map keys must be all strings or all int32".into(),
        })
    }

    fn parse_reader_macro(&mut self, head: &str, prefix_span: Span) -> Result<Datum, SyntaxError> {
        if self.peek()?.kind == TokenKind::Eof {
            return Err(SyntaxError {
                kind: SyntaxErrorKind::UnterminatedQuoteLike,
                span: prefix_span,
                message: format!("{head} requires a following datum"),
            });
        }
        let inner = self.parse_datum()?;
        let head_symbol = self.intern_symbol(head);
        Ok(Datum::list(vec![Datum::symbol(head_symbol), inner]))
    }

    /// `#error [<int32>]` or `#error [<int32> <string>]` (spec.md §4.3).
    fn parse_error_literal(&mut self) -> Result<Datum, SyntaxError> {
        self.expect(TokenKind::OpenSquare, SyntaxErrorKind::ErrorBadCode, "#error requires [code] or [code \"message\"]")?;
        let code_tok = self.expect(TokenKind::Int32, SyntaxErrorKind::ErrorBadCode, "#error code must be an int32")?;
        let code = code_tok.text.parse::<i32>().map_err(|_| SyntaxError {
            kind: SyntaxErrorKind::ErrorBadCode,
            span: code_tok.span,
            message: "invalid error code".into(),
        })?;
        let message = if self.peek()?.kind == TokenKind::String {
            let tok = self.advance()?;
            let Datum::String(s) = self.parse_string_literal(&tok)? else { unreachable!() };
            s.to_string()
        } else {
            String::new()
        };
        self.expect(TokenKind::CloseSquare, SyntaxErrorKind::ErrorWrongLength, "#error takes [code] or [code message]")?;
        Ok(Datum::error(code, message))
    }

    /// `#udt [<int32> <any>]` (spec.md §4.3): a user-defined literal. The
    /// payload datum is parsed (to keep the reader balanced) but, per
    /// spec.md §3.1, the stored payload is opaque; we allocate a unit
    /// placeholder in the heap rather than retaining the parsed form.
    fn parse_udt_literal(&mut self) -> Result<Datum, SyntaxError> {
        self.expect(TokenKind::OpenSquare, SyntaxErrorKind::UdtWrongShape, "#udt requires [type_code payload]")?;
        let code_tok = self.expect(TokenKind::Int32, SyntaxErrorKind::UdtWrongShape, "#udt type code must be an int32")?;
        let type_code = code_tok.text.parse::<i32>().map_err(|_| SyntaxError {
            kind: SyntaxErrorKind::UdtWrongShape,
            span: code_tok.span,
            message: "invalid type code".into(),
        })?;
        if (self.type_offset..self.type_offset + RESERVED_TYPE_COUNT).contains(&type_code) {
            return Err(SyntaxError {
                kind: SyntaxErrorKind::UdtTypeCollidesWithReservedRange,
                span: code_tok.span,
                message: format!("type code {type_code} collides with the reserved range"),
            });
        }
        let payload_datum = self.parse_datum()?;
        self.expect(TokenKind::CloseSquare, SyntaxErrorKind::UdtWrongShape, "#udt takes exactly [type_code payload]")?;
        let payload = self.heap.alloc(Box::new(payload_datum));
        Ok(Datum::UserDefined(UserDefined::Opaque { type_code, payload }))
    }
}

fn strip_quotes(text: &str) -> Option<&str> {
    let text = text.strip_prefix('"')?;
    text.strip_suffix('"')
}

fn normalize_decimal_separator(text: &str) -> String {
    text.replace(',', ".")
}

/// Parses the `#P...` interval body this printer also emits (`<days>D<secs>S`),
/// the same shape [`crate::external::DatetimeInterval`]'s `Display` writes.
fn parse_interval_text(body: &str) -> Option<DatetimeInterval> {
    let (days_part, rest) = body.split_once('D')?;
    let secs_part = rest.strip_suffix('S')?;
    let days: i64 = days_part.parse().ok()?;
    let secs: i64 = secs_part.parse().ok()?;
    Some(DatetimeInterval::from_delta(chrono::TimeDelta::days(days) + chrono::TimeDelta::seconds(secs)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Datum {
        let mut interner = Interner::new();
        parse_one(src, &mut interner).expect("parses")
    }

    #[test]
    fn atoms_parse() {
        assert!(matches!(parse("42"), Datum::Integer(42)));
        assert!(matches!(parse("42L"), Datum::Integer64(42)));
        assert!(matches!(parse("#t"), Datum::Boolean(true)));
        assert!(matches!(parse("\"hi\""), Datum::String(s) if &*s == "hi"));
    }

    #[test]
    fn proper_and_improper_lists_parse() {
        let proper = parse("(1 2 3)");
        assert_eq!(proper.proper_list_to_vec().unwrap().len(), 3);
        let improper = parse("(1 . 2)");
        let pair = improper.as_pair().unwrap();
        assert!(matches!(pair.first, Datum::Integer(1)));
        assert!(matches!(pair.second, Datum::Integer(2)));
    }

    #[test]
    fn array_and_string_map_parse() {
        let arr = parse("[1 2 3]");
        assert!(matches!(arr, Datum::Array(items) if items.len() == 3));
        let map = parse(r#"{"a" 1 "b" 2}"#);
        assert!(matches!(map, Datum::MapString(m) if m.len() == 2));
    }

    #[test]
    fn int_keyed_map_parses() {
        let map = parse("{1 10 2 20}");
        assert!(matches!(map, Datum::MapInt(m) if m.len() == 2));
    }

    #[test]
    fn set_literal_parses_and_sorts() {
        let set = parse("#{3 1 2}");
        let Datum::UserDefined(UserDefined::Set(s)) = set else { panic!("expected a set") };
        let values: Vec<i32> = s.to_vec().into_iter().map(|d| match d { Datum::Integer(n) => n, _ => unreachable!() }).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn quote_prefixes_desugar() {
        let q = parse("'x");
        let items = q.proper_list_to_vec().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_symbol().unwrap().name(), "quote");
    }

    #[test]
    fn datum_comment_discards_next_form() {
        let d = parse("(1 #;2 3)");
        let items = d.proper_list_to_vec().unwrap();
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Datum::Integer(1)));
        assert!(matches!(items[1], Datum::Integer(3)));
    }

    #[test]
    fn error_literal_parses_with_and_without_message() {
        assert!(matches!(parse("#error[7]"), Datum::Error(e) if e.code == 7));
        assert!(matches!(parse(r#"#error[7 "bad"]"#), Datum::Error(e) if e.code == 7 && &*e.message == "bad"));
    }

    #[test]
    fn unterminated_list_is_an_error() {
        let mut interner = Interner::new();
        assert!(parse_one("(1 2", &mut interner).is_err());
    }

    #[test]
    fn mismatched_map_key_kinds_error() {
        let mut interner = Interner::new();
        assert!(parse_one(r#"{"a" 1 2 3}"#, &mut interner).is_err());
    }
}
