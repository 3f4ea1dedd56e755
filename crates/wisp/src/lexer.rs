//! Line tracking and tokenizing (spec.md §4.1/§4.2, components C2/C3).
//!
//! Grounded on the teacher's span-carrying tokenizer style in `parse.rs`
//! (`CodeRange`) and the error-taxonomy shape of `exception_private.rs`,
//! even though the teacher itself delegates Python tokenization to
//! `ruff_python_parser` — there is no hand-written lexer in the pack closer
//! to this grammar.
//!
//! Token *shape* classification happens here (does this span look like a
//! date, a number, a string?); the actual value conversion (parsing the
//! digits, validating the calendar date, decoding base64) happens in
//! [`crate::parser`], so that a structurally-shaped-but-semantically-bad
//! literal (`2020-13-45`, `99999999999999999999`) surfaces as
//! `invalid_temporal`/`invalid_number` at the parser layer rather than
//! here — the lexer's only failure mode is `bad_token`.

use crate::error::{Span, SyntaxError, SyntaxErrorKind};

/// The token kinds of spec.md §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    Eof,
    True,
    False,
    String,
    Bytes,
    Double,
    Decimal64,
    Int32,
    Int64,
    Symbol,
    OpenParen,
    CloseParen,
    OpenSquare,
    CloseSquare,
    OpenCurly,
    CloseCurly,
    OpenSetBrace,
    Quote,
    Quasiquote,
    Unquote,
    UnquoteSplicing,
    Syntax,
    Quasisyntax,
    Unsyntax,
    UnsyntaxSplicing,
    CommentLine,
    CommentDatum,
    CommentShebang,
    Date,
    Time,
    DateTime,
    DatetimeInterval,
    ErrorTag,
    UserDefinedTypeTag,
    PairSeparator,
}

/// A lexed token: kind, literal text, and span (spec.md §3.5).
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

/// Tracks `(offset, line, column)` as a cursor advances through a string
/// (spec.md §4.1). `advance_to` is monotonic: `new_offset` must not move
/// backward.
#[derive(Debug, Clone, Copy)]
pub struct LineCounter {
    offset: u32,
    line: u32,
    column: u32,
}

impl LineCounter {
    #[must_use]
    pub fn new() -> Self {
        Self { offset: 0, line: 1, column: 1 }
    }

    pub fn reset(&mut self, s: &str) {
        self.offset = 0;
        if s.starts_with('\n') {
            self.line = 2;
            self.column = 0;
        } else {
            self.line = 1;
            self.column = 1;
        }
    }

    /// Charges every `\n` crossed between the current offset and
    /// `new_offset` as a line break; the newline occupies column 0 of the
    /// new line.
    pub fn advance_to(&mut self, s: &str, new_offset: u32) {
        debug_assert!(new_offset >= self.offset, "LineCounter::advance_to must not move backward");
        for ch in s[self.offset as usize..new_offset as usize].chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        self.offset = new_offset;
    }

    #[must_use]
    pub fn position(&self) -> (u32, u32, u32) {
        (self.offset, self.line, self.column)
    }
}

impl Default for LineCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Characters that end a delimited token (spec.md §4.2's follow-set, used
/// here as the universal "maximal munch" break set for the fallback
/// symbol rule and for every bare-word literal).
fn is_break_char(c: char) -> bool {
    c.is_whitespace() || matches!(c, '"' | '(' | ')' | '[' | ']' | '{' | '}' | '\'' | '`' | ',')
}

/// Characters a symbol may *begin* with (spec.md §4.2: "beginning with a
/// character not in `[#\s"()[\]{}'`,]`").
fn is_symbol_start(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '#' | '"' | '(' | ')' | '[' | ']' | '{' | '}' | '\'' | '`' | ',')
}

pub struct Lexer<'a> {
    source: &'a str,
    cursor: LineCounter,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        let mut cursor = LineCounter::new();
        cursor.reset(source);
        Self { source, cursor }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.cursor.offset as usize..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Maximal run of non-break characters starting at the cursor,
    /// without consuming it.
    fn raw_span(&self) -> &'a str {
        let rest = self.rest();
        let end = rest.find(is_break_char).unwrap_or(rest.len());
        &rest[..end]
    }

    fn make_span(&mut self, start_offset: u32, start_line: u32, start_col: u32, end_offset: u32) -> Span {
        self.cursor.advance_to(self.source, end_offset);
        Span {
            start_offset,
            end_offset,
            begin_line: start_line,
            begin_col: start_col,
            end_line: self.cursor.line,
            end_col: self.cursor.column,
        }
    }

    fn emit(&mut self, kind: TokenKind, text: &str, start_offset: u32, start_line: u32, start_col: u32) -> Token {
        let end_offset = start_offset + text.len() as u32;
        let span = self.make_span(start_offset, start_line, start_col, end_offset);
        Token { kind, text: text.to_owned(), span }
    }

    fn error(&mut self, kind: SyntaxErrorKind, message: impl Into<String>, start_offset: u32, start_line: u32, start_col: u32, end_offset: u32) -> SyntaxError {
        let span = self.make_span(start_offset, start_line, start_col, end_offset);
        SyntaxError { kind, span, message: message.into() }
    }

    /// Produces the next token, or `EOF` once the subject is exhausted.
    pub fn next_token(&mut self) -> Result<Token, SyntaxError> {
        let (start_offset, start_line, start_col) = self.cursor.position();
        let Some(c) = self.peek() else {
            return Ok(self.emit(TokenKind::Eof, "", start_offset, start_line, start_col));
        };

        if c.is_whitespace() {
            let len = self.rest().find(|ch: char| !ch.is_whitespace()).unwrap_or(self.rest().len());
            let text = &self.rest()[..len];
            return Ok(self.emit(TokenKind::Whitespace, text, start_offset, start_line, start_col));
        }
        if c == ';' {
            let len = self.rest().find('\n').unwrap_or(self.rest().len());
            let text = &self.rest()[..len];
            return Ok(self.emit(TokenKind::CommentLine, text, start_offset, start_line, start_col));
        }
        if c == '"' {
            return self.scan_quoted(TokenKind::String, 0, start_offset, start_line, start_col);
        }
        match c {
            '(' => return Ok(self.emit(TokenKind::OpenParen, "(", start_offset, start_line, start_col)),
            ')' => return Ok(self.emit(TokenKind::CloseParen, ")", start_offset, start_line, start_col)),
            '[' => return Ok(self.emit(TokenKind::OpenSquare, "[", start_offset, start_line, start_col)),
            ']' => return Ok(self.emit(TokenKind::CloseSquare, "]", start_offset, start_line, start_col)),
            '{' => return Ok(self.emit(TokenKind::OpenCurly, "{", start_offset, start_line, start_col)),
            '}' => return Ok(self.emit(TokenKind::CloseCurly, "}", start_offset, start_line, start_col)),
            '\'' => return Ok(self.emit(TokenKind::Quote, "'", start_offset, start_line, start_col)),
            '`' => return Ok(self.emit(TokenKind::Quasiquote, "`", start_offset, start_line, start_col)),
            ',' => {
                if self.rest().starts_with(",@") {
                    return Ok(self.emit(TokenKind::UnquoteSplicing, ",@", start_offset, start_line, start_col));
                }
                return Ok(self.emit(TokenKind::Unquote, ",", start_offset, start_line, start_col));
            }
            '#' => return self.scan_hash_prefixed(start_offset, start_line, start_col),
            _ => {}
        }

        let span = self.raw_span();
        if span == "." {
            return Ok(self.emit(TokenKind::PairSeparator, ".", start_offset, start_line, start_col));
        }
        if starts_numberish(span) {
            if let Some(kind) = classify_literal(span) {
                return Ok(self.emit(kind, span, start_offset, start_line, start_col));
            }
        }
        if span.chars().next().is_some_and(is_symbol_start) {
            return Ok(self.emit(TokenKind::Symbol, span, start_offset, start_line, start_col));
        }
        let end_offset = start_offset + span.chars().next().map_or(0, char::len_utf8) as u32;
        Err(self.error(SyntaxErrorKind::BadToken, format!("unrecognized input near {span:?}"), start_offset, start_line, start_col, end_offset.max(start_offset + 1)))
    }

    /// Scans a `"`-delimited literal (plain string or, with `prefix_len`
    /// bytes of `#base64` already matched, a bytes literal), honoring
    /// backslash escapes so an escaped quote does not end the token early.
    fn scan_quoted(&mut self, kind: TokenKind, prefix_len: usize, start_offset: u32, start_line: u32, start_col: u32) -> Result<Token, SyntaxError> {
        let rest = self.rest();
        let body = &rest[prefix_len..];
        let mut chars = body.char_indices();
        // Skip the opening quote.
        let Some((_, '"')) = chars.next() else {
            return Err(self.error(SyntaxErrorKind::BadToken, "expected opening quote", start_offset, start_line, start_col, start_offset + 1));
        };
        let mut escaped = false;
        let mut end_in_body = None;
        for (idx, ch) in chars.by_ref() {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '"' => {
                    end_in_body = Some(idx + 1);
                    break;
                }
                _ => {}
            }
        }
        let Some(end_in_body) = end_in_body else {
            let end_offset = start_offset + rest.len() as u32;
            return Err(self.error(SyntaxErrorKind::InvalidString, "unterminated string literal", start_offset, start_line, start_col, end_offset));
        };
        let full_len = prefix_len + end_in_body;
        let text = &rest[..full_len];
        Ok(self.emit(kind, text, start_offset, start_line, start_col))
    }

    fn scan_hash_prefixed(&mut self, start_offset: u32, start_line: u32, start_col: u32) -> Result<Token, SyntaxError> {
        let rest = self.rest();
        if rest.starts_with("#{") {
            return Ok(self.emit(TokenKind::OpenSetBrace, "#{", start_offset, start_line, start_col));
        }
        if rest.starts_with("#base64\"") {
            return self.scan_quoted(TokenKind::Bytes, "#base64".len(), start_offset, start_line, start_col);
        }
        if rest.starts_with("#;") {
            return Ok(self.emit(TokenKind::CommentDatum, "#;", start_offset, start_line, start_col));
        }
        if rest.starts_with("#!") {
            let len = rest.find('\n').unwrap_or(rest.len());
            return Ok(self.emit(TokenKind::CommentShebang, &rest[..len], start_offset, start_line, start_col));
        }
        if rest.starts_with("#'") {
            return Ok(self.emit(TokenKind::Syntax, "#'", start_offset, start_line, start_col));
        }
        if rest.starts_with("#`") {
            return Ok(self.emit(TokenKind::Quasisyntax, "#`", start_offset, start_line, start_col));
        }
        if rest.starts_with("#,@") {
            return Ok(self.emit(TokenKind::UnsyntaxSplicing, "#,@", start_offset, start_line, start_col));
        }
        if rest.starts_with("#,") {
            return Ok(self.emit(TokenKind::Unsyntax, "#,", start_offset, start_line, start_col));
        }

        let span = self.raw_span();
        let kind = match span {
            "#t" | "#true" => Some(TokenKind::True),
            "#f" | "#false" => Some(TokenKind::False),
            "#error" => Some(TokenKind::ErrorTag),
            "#udt" => Some(TokenKind::UserDefinedTypeTag),
            s if s.starts_with("#P") => Some(TokenKind::DatetimeInterval),
            _ => None,
        };
        match kind {
            Some(kind) => Ok(self.emit(kind, span, start_offset, start_line, start_col)),
            None => {
                let end_offset = start_offset + span.len() as u32;
                Err(self.error(SyntaxErrorKind::BadToken, format!("unrecognized '#' form: {span:?}"), start_offset, start_line, start_col, end_offset))
            }
        }
    }
}

fn starts_numberish(span: &str) -> bool {
    let mut chars = span.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('+' | '-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    }
}

fn is_digit_run(s: &str, n: usize) -> bool {
    s.len() == n && s.bytes().all(|b| b.is_ascii_digit())
}

/// Structural (not calendar-valid) date shape: `[-]DDDD-DD-DD`.
fn is_date_shape(span: &str) -> bool {
    let span = span.strip_prefix('-').unwrap_or(span);
    let parts: Vec<&str> = span.split('-').collect();
    matches!(parts.as_slice(), [y, m, d] if is_digit_run(y, 4) && is_digit_run(m, 2) && is_digit_run(d, 2))
}

/// Structural time shape: `DD:DD:DD[.D+]`.
fn is_time_shape(span: &str) -> bool {
    let (hms, frac) = match span.split_once('.') {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (span, None),
    };
    if let Some(frac) = frac {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }
    let parts: Vec<&str> = hms.split(':').collect();
    matches!(parts.as_slice(), [h, m, s] if is_digit_run(h, 2) && is_digit_run(m, 2) && is_digit_run(s, 2))
}

fn classify_literal(span: &str) -> Option<TokenKind> {
    if let Some((date_part, time_part)) = span.split_once('T') {
        if is_date_shape(date_part) && is_time_shape(time_part) {
            return Some(TokenKind::DateTime);
        }
        return None;
    }
    if is_date_shape(span) {
        return Some(TokenKind::Date);
    }
    if is_time_shape(span) {
        return Some(TokenKind::Time);
    }
    classify_number(span)
}

/// Structural number shape: `[sign] digits [('.'|',') digits] [('e'|'E')
/// [sign] digits] [suffix]`, suffix one of `L`/`B` (spec.md §4.2).
fn classify_number(span: &str) -> Option<TokenKind> {
    let bytes = span.as_bytes();
    let mut i = 0;
    if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == int_start {
        return None;
    }
    let mut has_frac = false;
    if i < bytes.len() && matches!(bytes[i], b'.' | b',') {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j == frac_start {
            return None;
        }
        has_frac = true;
        i = j;
    }
    let mut has_exp = false;
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_digit_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j == exp_digit_start {
            return None;
        }
        has_exp = true;
        i = j;
    }
    let suffix = if i < bytes.len() { Some(bytes[i]) } else { None };
    let consumed_suffix = suffix.is_some() as usize;
    if i + consumed_suffix != bytes.len() {
        return None;
    }
    match suffix {
        Some(b'L') if !has_frac && !has_exp => Some(TokenKind::Int64),
        Some(b'L') => None,
        Some(b'B') => Some(TokenKind::Double),
        Some(_) => None,
        None if has_frac || has_exp => Some(TokenKind::Decimal64),
        None => Some(TokenKind::Int32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().expect("lexes");
            let done = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn line_counter_tracks_newlines() {
        let mut lc = LineCounter::new();
        lc.reset("ab\ncd");
        lc.advance_to("ab\ncd", 4);
        assert_eq!(lc.position(), (4, 2, 1));
    }

    #[test]
    fn punctuation_and_parens_tokenize() {
        assert_eq!(
            tokens("(a b)"),
            vec![
                TokenKind::OpenParen,
                TokenKind::Symbol,
                TokenKind::Whitespace,
                TokenKind::Symbol,
                TokenKind::CloseParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn number_suffixes_classify() {
        assert_eq!(classify_number("42"), Some(TokenKind::Int32));
        assert_eq!(classify_number("42L"), Some(TokenKind::Int64));
        assert_eq!(classify_number("3.14"), Some(TokenKind::Decimal64));
        assert_eq!(classify_number("3.14B"), Some(TokenKind::Double));
        assert_eq!(classify_number("3,14"), Some(TokenKind::Decimal64));
        assert_eq!(classify_number("-5"), Some(TokenKind::Int32));
        assert_eq!(classify_number("42LB"), None);
    }

    #[test]
    fn digit_led_non_delimited_run_falls_back_to_symbol() {
        assert_eq!(tokens("1st"), vec![TokenKind::Symbol, TokenKind::Eof]);
    }

    #[test]
    fn date_time_and_datetime_shapes_classify() {
        assert_eq!(classify_literal("2020-11-29"), Some(TokenKind::Date));
        assert_eq!(classify_literal("10:30:00"), Some(TokenKind::Time));
        assert_eq!(classify_literal("2020-11-29T10:30:00"), Some(TokenKind::DateTime));
    }

    #[test]
    fn string_literal_honors_escaped_quotes() {
        let toks = tokens(r#""a\"b""#);
        assert_eq!(toks, vec![TokenKind::String, TokenKind::Eof]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut lexer = Lexer::new("\"abc");
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn quote_like_prefixes_tokenize() {
        assert_eq!(tokens("'x"), vec![TokenKind::Quote, TokenKind::Symbol, TokenKind::Eof]);
        assert_eq!(tokens(",@x"), vec![TokenKind::UnquoteSplicing, TokenKind::Symbol, TokenKind::Eof]);
    }

    #[test]
    fn hash_prefixed_forms_tokenize() {
        assert_eq!(tokens("#t"), vec![TokenKind::True, TokenKind::Eof]);
        assert_eq!(tokens("#{1 2}"), vec![TokenKind::OpenSetBrace, TokenKind::Int32, TokenKind::Whitespace, TokenKind::Int32, TokenKind::CloseCurly, TokenKind::Eof]);
    }
}
