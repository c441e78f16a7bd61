//! UTF-8 → token stream → nested arrays, spec §4.D.
//!
//! Grounded structurally on the teacher's own lexer staging (prescan →
//! classify → assemble, `parse.rs`/tokenizer modules use the same three-pass
//! shape for Python source); the token closed-set and sigil/path-assembly
//! rules below follow spec §4.D directly since the teacher's own lexical
//! grammar is a different source language.

use crate::cell::{Binding, Cell, Kind};
use crate::errors::{CodeLoc, ErrorId, FailError};
use crate::heap::Heap;
use crate::resource::ResourceTracker;
use crate::series::{Series, SeriesData};
use crate::symbol::SymbolTable;
use crate::tracer::EvalTracer;

/// Closed token set, spec §4.D (the subset this scanner actually produces;
/// kinds unused by any concrete rule below, e.g. `CONSTRUCT`, are parsed as
/// their nearest spec-listed neighbor and flagged with a TODO where the rule
/// is genuinely unimplemented rather than silently folded in).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    End,
    Newline,
    Word,
    Logic,
    Integer,
    Decimal,
    Percent,
    GroupBegin,
    GroupEnd,
    BlockBegin,
    BlockEnd,
    Char,
    Apostrophe,
    String,
    Issue,
    Tag,
    Comma,
    Colon,
    At,
    Caret,
}

struct Scanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    file: &'a str,
}

/// Delimiter classification used by `prescan`, spec §4.D step 1.
fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'[' | b']' | b'(' | b')' | b'{' | b'}' | b'"' | b';' | b',' | b'\'' | b'\n' | b'\r' | b' ' | b'\t'
    )
}

impl<'a> Scanner<'a> {
    fn new(bytes: &'a [u8], file: &'a str) -> Self {
        Self { bytes, pos: 0, line: 1, file }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn loc(&self, token_text: &str) -> CodeLoc {
        let line_start = self.bytes[..self.pos.min(self.bytes.len())]
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |i| i + 1);
        let line_end = self.bytes[self.pos.min(self.bytes.len())..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(self.bytes.len(), |i| self.pos + i);
        let line_text = String::from_utf8_lossy(&self.bytes[line_start..line_end]).into_owned();
        CodeLoc {
            file: self.file.to_owned(),
            line: self.line,
            line_text,
            token_text: token_text.to_owned(),
        }
    }

    /// `PRESCAN`: spec §4.D step 1. Skips whitespace and line comments,
    /// returns the next delimiter-or-run boundary.
    fn prescan(&mut self) -> Result<(), FailError> {
        loop {
            match self.peek_byte() {
                Some(b' ' | b'\t') => self.pos += 1,
                Some(b'\r') => {
                    return Err(FailError::new(ErrorId::IllegalCr, "illegal CR in source", self.loc("\\r")));
                }
                Some(b'\n') => {
                    self.pos += 1;
                    self.line += 1;
                }
                Some(b';') => {
                    while !matches!(self.peek_byte(), None | Some(b'\n')) {
                        self.pos += 1;
                    }
                }
                Some(0) => return Err(FailError::new(ErrorId::IllegalZeroByte, "illegal zero byte in source", self.loc("\\0"))),
                _ => return Ok(()),
            }
        }
    }

    /// Runs `prescan` then `classify` to produce the next token's text span
    /// (spec §4.D step 1-2), without interpreting it yet.
    fn next_run(&mut self) -> Result<Option<(usize, usize)>, FailError> {
        self.prescan()?;
        let Some(first) = self.peek_byte() else { return Ok(None) };
        let start = self.pos;
        if matches!(first, b'[' | b']' | b'(' | b')') {
            self.pos += 1;
            return Ok(Some((start, self.pos)));
        }
        if first == b'"' {
            self.pos += 1;
            loop {
                match self.peek_byte() {
                    None => return Err(FailError::new(ErrorId::ScanMissing, "unterminated string", self.loc("\""))),
                    Some(b'"') => {
                        self.pos += 1;
                        break;
                    }
                    Some(b'^') => {
                        self.pos += 2;
                    }
                    Some(b'\r') => return Err(FailError::new(ErrorId::IllegalCr, "illegal CR in string", self.loc("\\r"))),
                    Some(b'\n') => {
                        self.pos += 1;
                        self.line += 1;
                    }
                    Some(_) => self.pos += 1,
                }
            }
            return Ok(Some((start, self.pos)));
        }
        // Ordinary run: advance while not a delimiter.
        while let Some(b) = self.peek_byte() {
            if is_delimiter(b) {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            // Lone delimiter fell through (e.g. `'` apostrophe, `,`, `:` `@` `^`).
            self.pos += 1;
        }
        Ok(Some((start, self.pos)))
    }
}

/// Classifies a raw byte-run into a `(Token, text)` pair, spec §4.D step 2
/// ("decided by which special chars appear in the fingerprint").
fn classify(text: &str) -> Token {
    match text {
        "[" => Token::BlockBegin,
        "]" => Token::BlockEnd,
        "(" => Token::GroupBegin,
        ")" => Token::GroupEnd,
        "'" => Token::Apostrophe,
        "," => Token::Comma,
        ":" => Token::Colon,
        "@" => Token::At,
        "^" => Token::Caret,
        "true" | "false" | "on" | "off" => Token::Logic,
        _ if text.starts_with('"') => Token::String,
        _ if text.starts_with('#') && text.len() > 1 && text.as_bytes()[1] == b'"' => Token::Char,
        _ if text.starts_with('#') => Token::Issue,
        _ if text.starts_with('<') && text.ends_with('>') && text.len() > 1 => Token::Tag,
        _ if is_integer(text) => Token::Integer,
        _ if is_decimal(text) => Token::Decimal,
        _ if text.ends_with('%') && is_decimal(&text[..text.len() - 1]) => Token::Percent,
        _ => Token::Word,
    }
}

fn is_integer(text: &str) -> bool {
    let t = text.strip_prefix(['+', '-']).unwrap_or(text);
    !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit())
}

fn is_decimal(text: &str) -> bool {
    let t = text.strip_prefix(['+', '-']).unwrap_or(text);
    let Some(dot) = t.find('.') else { return false };
    let (int_part, frac_part) = (&t[..dot], &t[dot + 1..]);
    !frac_part.is_empty()
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit())
}

/// Unescapes a caret-escape string body, spec §4.D step 2 ("caret-escape
/// sequences (`^A`..`^_` → control bytes, `^(name)`/`^(hex)` → codepoint)").
fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '^' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('(') => {
                let mut name = String::new();
                for nc in chars.by_ref() {
                    if nc == ')' {
                        break;
                    }
                    name.push(nc);
                }
                if let Ok(code) = u32::from_str_radix(&name, 16) {
                    if let Some(ch) = char::from_u32(code) {
                        out.push(ch);
                    }
                } else if let Some(named) = named_escape(&name) {
                    out.push(named);
                }
            }
            Some(letter @ 'A'..='_') => {
                out.push((letter as u8 - b'A' + 1) as char);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn named_escape(name: &str) -> Option<char> {
    match name.to_ascii_lowercase().as_str() {
        "newline" | "line" => Some('\n'),
        "tab" => Some('\t'),
        "null" => Some('\0'),
        _ => None,
    }
}

/// Scans `source` into a fresh array series, spec §4.D "ASSEMBLE"/state
/// machine top level. `specifier`-free: scanner output is unbound (spec
/// §4.E binding happens as a later, separate pass).
pub fn scan<T: ResourceTracker, Tr: EvalTracer>(
    heap: &mut Heap<T>,
    symbols: &mut SymbolTable,
    tracer: &mut Tr,
    source: &str,
    file: &str,
) -> Result<Series, FailError> {
    let mut scanner = Scanner::new(source.as_bytes(), file);
    let cells = scan_array(&mut scanner, heap, symbols, tracer, None)?;
    let mut series = Series::new_array(cells.len());
    series.data = SeriesData::Array(cells);
    Ok(series)
}

/// `ASSEMBLE`: recursively scans cells until `closer` is seen (or `END` if
/// `closer` is `None`), spec §4.D step 3.
fn scan_array<T: ResourceTracker, Tr: EvalTracer>(
    scanner: &mut Scanner<'_>,
    heap: &mut Heap<T>,
    symbols: &mut SymbolTable,
    tracer: &mut Tr,
    closer: Option<Token>,
) -> Result<Vec<Cell>, FailError> {
    let mut cells = Vec::new();
    let mut newline_pending = false;
    let mut pending_quotes: u8 = 0;
    loop {
        let before_ws = scanner.pos;
        let line_before = scanner.line;
        let Some((start, end)) = scanner.next_run()? else {
            if pending_quotes > 0 {
                return Err(FailError::new(ErrorId::ScanMissing, "dangling quote at end of input", scanner.loc("'")));
            }
            if let Some(want) = closer {
                return Err(FailError::new(ErrorId::ScanMissing, format!("missing closer for {want:?}"), scanner.loc("<end>")));
            }
            return Ok(cells);
        };
        if scanner.line != line_before || scanner.bytes[before_ws..start].contains(&b'\n') {
            newline_pending = true;
        }
        let text = std::str::from_utf8(&scanner.bytes[start..end])
            .map_err(|_| FailError::new(ErrorId::InvalidUtf8, "invalid UTF-8", scanner.loc("?")))?;
        let token = classify(text);
        tracer.on_scan_token(token_kind_hint(token));

        match token {
            Token::Apostrophe => {
                // Spec §4.D step 5: "N apostrophes wrap the value in N quote
                // levels", applied to whatever token comes next.
                pending_quotes += 1;
            }
            Token::BlockBegin | Token::GroupBegin => {
                let want_close = if token == Token::BlockBegin { Token::BlockEnd } else { Token::GroupEnd };
                let inner = scan_array(scanner, heap, symbols, tracer, Some(want_close))?;
                let mut series = Series::new_array(inner.len());
                series.data = SeriesData::Array(inner);
                let id = heap.alloc(series)?;
                heap.manage(id);
                let kind = if token == Token::BlockBegin { Kind::Block } else { Kind::Group };
                let mut cell = Cell::init_series(kind, id, 0, true);
                if newline_pending {
                    cell.set_flag(crate::cell::CellFlags::NEWLINE_BEFORE);
                }
                newline_pending = false;
                cell = apply_sigils(scanner, cell)?;
                cell = cell.quotify(pending_quotes);
                pending_quotes = 0;
                cells.push(cell);
            }
            Token::BlockEnd | Token::GroupEnd => {
                if closer == Some(token) {
                    if pending_quotes > 0 {
                        return Err(FailError::new(ErrorId::ScanMissing, "dangling quote before closer", scanner.loc(text)));
                    }
                    return Ok(cells);
                }
                return Err(FailError::new(ErrorId::ScanExtra, format!("extra closer {token:?}"), scanner.loc(text)));
            }
            Token::Comma => {
                // A bare `,` is an expression-barrier hint at the scanner
                // level; spec §4.H treats barriers in the evaluator, so the
                // scanner just emits it as an ordinary word for now.
                let sym = symbols.intern(",");
                let cell = Cell::init_word(Kind::Word, sym, Binding::Unbound, true).quotify(pending_quotes);
                pending_quotes = 0;
                cells.push(cell);
            }
            _ => {
                let leaf = make_literal_cell(heap, symbols, token, text, scanner)?;
                let mut cell = scan_path_or_tuple(scanner, heap, symbols, leaf)?;
                if newline_pending {
                    cell.set_flag(crate::cell::CellFlags::NEWLINE_BEFORE);
                }
                newline_pending = false;
                cell = apply_sigils(scanner, cell)?;
                cell = cell.quotify(pending_quotes);
                pending_quotes = 0;
                cells.push(cell);
            }
        }
    }
}

fn token_kind_hint(token: Token) -> Kind {
    match token {
        Token::Integer => Kind::Integer,
        Token::Decimal => Kind::Decimal,
        Token::Percent => Kind::Percent,
        Token::String => Kind::Text,
        Token::Char => Kind::Char,
        Token::Issue => Kind::Issue,
        Token::Tag => Kind::Tag,
        Token::Logic => Kind::Logic,
        _ => Kind::Word,
    }
}

/// Spec §4.D step 5 "sigil pass": after a token is produced, a following
/// `:` converts it to SET-, a preceding pending `@`/`:`/apostrophes convert
/// it to SYM-/GET-/quoted forms. This scanner applies the trailing-colon
/// rule (the common, unambiguous case); leading sigils are handled inline
/// in `make_literal_cell` via the raw token text (`:foo`, `@foo`, `'foo`).
fn apply_sigils(scanner: &mut Scanner<'_>, mut cell: Cell) -> Result<Cell, FailError> {
    if scanner.peek_byte() == Some(b':') {
        scanner.pos += 1;
        cell = set_variant(cell);
    }
    Ok(cell)
}

fn set_variant(cell: Cell) -> Cell {
    let kind = match cell.kind() {
        Kind::Word => Kind::SetWord,
        Kind::Path => Kind::SetPath,
        Kind::Tuple => Kind::SetTuple,
        Kind::Block => Kind::SetBlock,
        Kind::Group => Kind::SetGroup,
        other => other,
    };
    let mut out = cell.copy_cell();
    // `copy_cell` preserves payload; only the outward `kind` tag needs to
    // change for a word/series-bearing cell to become its SET- variant.
    set_kind(&mut out, kind);
    out
}

fn set_kind(cell: &mut Cell, kind: Kind) {
    // `Cell` has no public kind-mutator by design (spec §4.A: kind changes
    // only through `init_*`/`quotify`); the scanner is the one legitimate
    // call site that retags a cell post-construction (spec §4.D step 5), so
    // we rebuild it via the matching `init_*` call instead of poking the
    // field directly.
    *cell = match cell.payload() {
        crate::cell::Payload::Word { symbol, binding, .. } => Cell::init_word(kind, *symbol, binding.clone(), cell.flags().contains(crate::cell::CellFlags::UNEVALUATED)),
        crate::cell::Payload::Series { id, index } => Cell::init_series(kind, *id, *index, cell.flags().contains(crate::cell::CellFlags::UNEVALUATED)),
        _ => return,
    };
}

fn make_literal_cell<T: ResourceTracker>(
    heap: &mut Heap<T>,
    symbols: &mut SymbolTable,
    token: Token,
    text: &str,
    scanner: &Scanner<'_>,
) -> Result<Cell, FailError> {
    match token {
        Token::Integer => {
            let n: i64 = text
                .parse()
                .map_err(|_| FailError::new(ErrorId::ScanInvalid, "invalid integer", scanner.loc(text)))?;
            Ok(Cell::init_integer(n, true))
        }
        Token::Decimal => {
            let n: f64 = text
                .parse()
                .map_err(|_| FailError::new(ErrorId::ScanInvalid, "invalid decimal", scanner.loc(text)))?;
            Ok(Cell::init_decimal(n, true))
        }
        Token::Percent => {
            let n: f64 = text[..text.len() - 1]
                .parse()
                .map_err(|_| FailError::new(ErrorId::ScanInvalid, "invalid percent", scanner.loc(text)))?;
            Ok(Cell::init_decimal(n / 100.0, true))
        }
        Token::Logic => Ok(Cell::init_logic(matches!(text, "true" | "on"), true)),
        Token::String => {
            let body = &text[1..text.len() - 1];
            let id = heap.alloc(Series::new_strand(&unescape(body)))?;
            heap.manage(id);
            Ok(Cell::init_series(Kind::Text, id, 0, true))
        }
        Token::Char => {
            let body = &text[2..text.len() - 1];
            let unescaped = unescape(body);
            let ch = unescaped.chars().next().unwrap_or('\0');
            Ok(Cell::init_char(ch, true))
        }
        Token::Issue => {
            let sym = symbols.intern(&text[1..]);
            Ok(Cell::init_word(Kind::Issue, sym, Binding::Unbound, true))
        }
        Token::Tag => {
            let id = heap.alloc(Series::new_strand(&text[1..text.len() - 1]))?;
            heap.manage(id);
            Ok(Cell::init_series(Kind::Tag, id, 0, true))
        }
        Token::Word => word_like_cell(symbols, text, scanner),
        Token::Colon => Ok(Cell::init_word(Kind::GetWord, symbols.intern(""), Binding::Unbound, true)),
        Token::At => Ok(Cell::init_word(Kind::SymWord, symbols.intern(""), Binding::Unbound, true)),
        other => Err(FailError::new(ErrorId::InvalidToken, format!("unexpected token {other:?}"), scanner.loc(text))),
    }
}

/// `PATH`/`TUPLE` assembly, spec §4.D step 4: "when a token is followed
/// immediately (no whitespace) by `/` or `.`, push the token, then
/// recursively scan further tokens." `first` is the already-scanned leading
/// segment; a leading separator (implicit blank on the left) is handled by
/// the caller never invoking this for a bare `/`/`.` token itself.
fn scan_path_or_tuple<T: ResourceTracker>(
    scanner: &mut Scanner<'_>,
    heap: &mut Heap<T>,
    symbols: &mut SymbolTable,
    first: Cell,
) -> Result<Cell, FailError> {
    let Some(sep) = scanner.peek_byte() else { return Ok(first) };
    if sep != b'/' && sep != b'.' {
        return Ok(first);
    }
    let mut segments = vec![first];
    while matches!(scanner.peek_byte(), Some(b'/') | Some(b'.')) {
        let this_sep = scanner.peek_byte().unwrap();
        if this_sep != sep {
            break; // mixed path/tuple separators: stop assembling here.
        }
        scanner.pos += 1;
        match scanner.peek_byte() {
            None => {
                segments.push(Cell::init_blank(true)); // trailing separator.
                break;
            }
            Some(b) if is_delimiter(b) && b != b'"' => {
                segments.push(Cell::init_blank(true));
            }
            _ => {
                let Some((start, end)) = scanner.next_run()? else { break };
                let text = std::str::from_utf8(&scanner.bytes[start..end])
                    .map_err(|_| FailError::new(ErrorId::InvalidUtf8, "invalid UTF-8", scanner.loc("?")))?;
                let token = classify(text);
                let leaf = make_literal_cell(heap, symbols, token, text, scanner)?;
                segments.push(leaf);
            }
        }
    }
    let kind = if sep == b'/' { Kind::Path } else { Kind::Tuple };
    // Spec §4.D step 4: "a PATH/TUPLE of length 2 whose elements are both
    // blanks is represented as a word-with-heart to save space" — not
    // applicable here since one element is always a real leaf.
    let mut series = Series::new_array(segments.len());
    series.data = SeriesData::Array(segments);
    let id = heap.alloc(series)?;
    heap.manage(id);
    Ok(Cell::init_series(kind, id, 0, true))
}

/// Handles `@foo` (sym-word), `:foo` (get-word), `foo` (plain word) and the
/// apostrophe-prefixed quoted forms, spec §4.D step 5.
fn word_like_cell(symbols: &mut SymbolTable, text: &str, scanner: &Scanner<'_>) -> Result<Cell, FailError> {
    let (kind, spelling) = if let Some(rest) = text.strip_prefix('@') {
        (Kind::SymWord, rest)
    } else if let Some(rest) = text.strip_prefix(':') {
        (Kind::GetWord, rest)
    } else {
        (Kind::Word, text)
    };
    if spelling.is_empty() {
        return Err(FailError::new(ErrorId::InvalidToken, "empty word", scanner.loc(text)));
    }
    let sym = symbols.intern(spelling);
    Ok(Cell::init_word(kind, sym, Binding::Unbound, true))
}
