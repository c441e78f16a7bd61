//! The tagged value cell: the single uniform slot every series, frame and
//! context stores. See spec §3.1 and §4.A.
//!
//! `Cell` is deliberately NOT `Clone`/`Copy`-derived in the ordinary sense for
//! its series-bearing payload: `copy_cell`/`move_cell`/`derelativize` are the
//! sanctioned ways to duplicate a cell, because a naive bitwise copy would
//! desynchronize series reference bookkeeping done by the heap (see
//! `heap.rs`). Immediate kinds (INTEGER, LOGIC, ...) are cheap to duplicate;
//! series-bearing kinds route through `Heap::retain`.

use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

use crate::series::SeriesId;
use crate::symbol::Symbol;

/// The primary tag of a cell. Closed set, spec §3.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum Kind {
    Null,
    Blank,
    Logic,
    Integer,
    Decimal,
    Percent,
    Money,
    Char,
    Pair,
    Time,
    Date,
    Binary,
    Text,
    File,
    Email,
    Url,
    Tag,
    Issue,
    Bitset,
    Block,
    Group,
    Path,
    Tuple,
    Word,
    SetWord,
    GetWord,
    SymWord,
    SetPath,
    GetPath,
    SymPath,
    SetTuple,
    GetTuple,
    SymTuple,
    SetBlock,
    GetBlock,
    SymBlock,
    SetGroup,
    GetGroup,
    SymGroup,
    Action,
    Frame,
    Object,
    Error,
    Port,
    Module,
    Varargs,
    Map,
    Handle,
    Datatype,
    Typeset,
    Quoted,
    Void,
    Custom,
}

impl Kind {
    /// True for kinds the evaluator returns verbatim ("inert"), spec GLOSSARY.
    #[must_use]
    pub fn is_inert(self) -> bool {
        !matches!(
            self,
            Self::Word
                | Self::SetWord
                | Self::GetWord
                | Self::SymWord
                | Self::Path
                | Self::SetPath
                | Self::GetPath
                | Self::SymPath
                | Self::Tuple
                | Self::SetTuple
                | Self::GetTuple
                | Self::SymTuple
                | Self::Group
                | Self::SetGroup
                | Self::GetGroup
                | Self::SymGroup
                | Self::SetBlock
                | Self::GetBlock
                | Self::SymBlock
                | Self::Action
                | Self::Quoted
                | Self::Null
                | Self::Void
        )
    }

    /// Does this kind's payload hold a series reference (array/string/binary)?
    #[must_use]
    pub fn is_series_bearing(self) -> bool {
        matches!(
            self,
            Self::Binary
                | Self::Text
                | Self::File
                | Self::Email
                | Self::Url
                | Self::Tag
                | Self::Issue
                | Self::Block
                | Self::Group
                | Self::Path
                | Self::Tuple
                | Self::SetPath
                | Self::GetPath
                | Self::SymPath
                | Self::SetTuple
                | Self::GetTuple
                | Self::SymTuple
                | Self::SetBlock
                | Self::GetBlock
                | Self::SymBlock
                | Self::Bitset
                | Self::Map
                | Self::Varargs
        )
    }

    /// Does this kind's payload hold a word (symbol + binding)?
    #[must_use]
    pub fn is_word_bearing(self) -> bool {
        matches!(
            self,
            Self::Word | Self::SetWord | Self::GetWord | Self::SymWord
        )
    }
}

/// Per-cell flags, spec §3.1. Stored as a small bitset to keep `Cell` compact,
/// the way the teacher keeps `Value` small by hybridizing immediate/heap
/// payloads rather than one fat enum of everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct CellFlags(u16);

impl CellFlags {
    pub const PROTECTED: Self = Self(1 << 0);
    pub const CONST: Self = Self(1 << 1);
    pub const UNEVALUATED: Self = Self(1 << 2);
    pub const NEWLINE_BEFORE: Self = Self(1 << 3);
    pub const ARG_MARKED_CHECKED: Self = Self(1 << 4);
    pub const OUT_MARKED_STALE: Self = Self(1 << 5);
    pub const MARKED_HIDDEN: Self = Self(1 << 6);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn set(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn clear(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl std::ops::BitOr for CellFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// The cell payload, one variant per storage shape. `Word` carries a cached
/// binding slot per spec §3.3 ("a word's cached-index is valid only while its
/// target context/keylist has not been reshaped").
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Payload {
    None,
    Logic(bool),
    Integer(i64),
    Decimal(f64),
    /// MONEY! keeps an integer amount plus a fixed scale, for canonical
    /// comparison without bit-exact decimal arithmetic (spec §1 Non-goals).
    Money { amount: i64, scale: u8 },
    Char(char),
    Pair(i64, i64),
    /// Minutes-from-midnight-independent nanosecond-of-day representation.
    Time(i64),
    Date(chrono::NaiveDate),
    /// Series-bearing kinds: reference into the arena plus a cursor index.
    Series { id: SeriesId, index: u32 },
    Word {
        symbol: Symbol,
        binding: Binding,
        cached_index: Option<u32>,
    },
    /// ACTION! identity.
    Action(crate::action::ActionId),
    /// OBJECT!/FRAME!/MODULE!/ERROR! context identity.
    Context(crate::context::ContextId),
    /// QUOTED! wrapper for quote depth >= 4; see `quotify`/`dequotify`.
    Quoted(Box<Cell>),
    Handle(u64),
    Datatype(Kind),
    Typeset(u64),
}

/// A binding attached to a word cell, spec §3.3.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Binding {
    Unbound,
    Context(crate::context::ContextId),
    /// Relative to a specific action; resolved against the top live frame
    /// whose phase equals that action (spec §9 "Relative bindings").
    Relative(crate::action::ActionId),
    /// A virtual binding / LET patch chain (spec §3.3, §4.E).
    Virtual(crate::context::LetPatchId, Box<Binding>),
}

/// A single tagged value cell, spec §3.1.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Cell {
    kind: Kind,
    heart: Kind,
    quote_depth: u8,
    flags: CellFlags,
    payload: Payload,
}

impl Cell {
    /// `reset_cell`: spec §4.A. Discards any prior payload and flags.
    #[must_use]
    pub fn reset(kind: Kind, flags: CellFlags) -> Self {
        Self {
            kind,
            heart: kind,
            quote_depth: 0,
            flags,
            payload: Payload::None,
        }
    }

    #[must_use]
    pub fn end() -> Self {
        // The end marker is a distinct internal kind; callers must never
        // observe it through the public Kind enum, so we reuse Null with a
        // sentinel flag combination that `is_end` alone interprets.
        Self {
            kind: Kind::Null,
            heart: Kind::Null,
            quote_depth: 0,
            flags: CellFlags::PROTECTED | CellFlags::MARKED_HIDDEN,
            payload: Payload::None,
        }
    }

    #[must_use]
    pub fn is_end(&self) -> bool {
        self.kind == Kind::Null && self.flags.contains(CellFlags::PROTECTED | CellFlags::MARKED_HIDDEN)
    }

    pub fn set_end(&mut self) {
        *self = Self::end();
    }

    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    #[must_use]
    pub fn heart(&self) -> Kind {
        self.heart
    }

    #[must_use]
    pub fn quote_depth(&self) -> u8 {
        self.quote_depth
    }

    #[must_use]
    pub fn flags(&self) -> CellFlags {
        self.flags
    }

    pub fn set_flag(&mut self, flag: CellFlags) {
        self.flags.set(flag);
    }

    pub fn clear_flag(&mut self, flag: CellFlags) {
        self.flags.clear(flag);
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut Payload {
        &mut self.payload
    }

    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.flags.contains(CellFlags::PROTECTED)
    }

    /// Enforces spec §3.1: "`PROTECTED` write attempts raise an error."
    pub fn check_writable(&self) -> Result<(), crate::errors::FailError> {
        if self.is_protected() {
            Err(crate::errors::FailError::protected_write())
        } else {
            Ok(())
        }
    }

    fn init(kind: Kind, payload: Payload, inert_source: bool) -> Self {
        let mut flags = CellFlags::empty();
        if inert_source {
            flags.set(CellFlags::UNEVALUATED);
        }
        Self {
            kind,
            heart: kind,
            quote_depth: 0,
            flags,
            payload,
        }
    }

    /// `init_<kind>` family, spec §4.A. `inert_source` is set by
    /// scanner/inert-literal-copy call sites per the `UNEVALUATED` invariant.
    #[must_use]
    pub fn init_null(inert_source: bool) -> Self {
        Self::init(Kind::Null, Payload::None, inert_source)
    }

    #[must_use]
    pub fn init_blank(inert_source: bool) -> Self {
        Self::init(Kind::Blank, Payload::None, inert_source)
    }

    #[must_use]
    pub fn init_logic(value: bool, inert_source: bool) -> Self {
        Self::init(Kind::Logic, Payload::Logic(value), inert_source)
    }

    #[must_use]
    pub fn init_integer(value: i64, inert_source: bool) -> Self {
        Self::init(Kind::Integer, Payload::Integer(value), inert_source)
    }

    #[must_use]
    pub fn init_decimal(value: f64, inert_source: bool) -> Self {
        Self::init(Kind::Decimal, Payload::Decimal(value), inert_source)
    }

    #[must_use]
    pub fn init_money(amount: i64, scale: u8, inert_source: bool) -> Self {
        Self::init(Kind::Money, Payload::Money { amount, scale }, inert_source)
    }

    #[must_use]
    pub fn init_char(value: char, inert_source: bool) -> Self {
        Self::init(Kind::Char, Payload::Char(value), inert_source)
    }

    #[must_use]
    pub fn init_word(kind: Kind, symbol: Symbol, binding: Binding, inert_source: bool) -> Self {
        debug_assert!(kind.is_word_bearing() || kind == Kind::Path || kind == Kind::Tuple);
        Self::init(
            kind,
            Payload::Word {
                symbol,
                binding,
                cached_index: None,
            },
            inert_source,
        )
    }

    #[must_use]
    pub fn init_series(kind: Kind, id: SeriesId, index: u32, inert_source: bool) -> Self {
        debug_assert!(kind.is_series_bearing());
        Self::init(kind, Payload::Series { id, index }, inert_source)
    }

    #[must_use]
    pub fn init_action(id: crate::action::ActionId) -> Self {
        Self::init(Kind::Action, Payload::Action(id), false)
    }

    #[must_use]
    pub fn init_context(kind: Kind, id: crate::context::ContextId) -> Self {
        Self::init(kind, Payload::Context(id), false)
    }

    #[must_use]
    pub fn init_void() -> Self {
        Self::init(Kind::Void, Payload::None, false)
    }

    /// `copy_cell`: spec §4.A. Copies payload and primary flags but clears
    /// `UNEVALUATED` and `NEWLINE_BEFORE`.
    #[must_use]
    pub fn copy_cell(&self) -> Self {
        let mut flags = self.flags;
        flags.clear(CellFlags::UNEVALUATED | CellFlags::NEWLINE_BEFORE);
        Self {
            kind: self.kind,
            heart: self.heart,
            quote_depth: self.quote_depth,
            flags,
            payload: self.payload.clone(),
        }
    }

    /// `move_cell`: spec §4.A. Transfers ownership markers and zeroes the
    /// source (the source becomes an inert NULL so double-free-style bugs in
    /// series refcounting are structurally impossible).
    pub fn move_cell(&mut self) -> Self {
        let moved = Self {
            kind: self.kind,
            heart: self.heart,
            quote_depth: self.quote_depth,
            flags: self.flags,
            payload: std::mem::replace(&mut self.payload, Payload::None),
        };
        *self = Self::init_null(false);
        moved
    }

    /// `derelativize(dst, src, specifier)`: spec §4.A. Resolves a relative
    /// binding against `specifier`; an already-absolute source behaves as
    /// `copy_cell`.
    #[must_use]
    pub fn derelativize(&self, specifier: &crate::context::Specifier) -> Self {
        let mut out = self.copy_cell();
        if let Payload::Word { binding, .. } = &mut out.payload
            && let Binding::Relative(action_id) = binding
        {
            if let Some(ctx) = specifier.resolve_relative(*action_id) {
                *binding = Binding::Context(ctx);
            }
            // else: stays Relative; a later lookup will report "not bound"
        }
        out
    }

    /// `quotify(n)`: wraps in `n` additional quote levels (spec §3.1, §4.A).
    #[must_use]
    pub fn quotify(mut self, n: u8) -> Self {
        for _ in 0..n {
            let total = self.quote_depth as u16 + 1;
            if total <= 3 {
                self.quote_depth = total as u8;
            } else {
                self = Self {
                    kind: Kind::Quoted,
                    heart: Kind::Quoted,
                    quote_depth: 0,
                    flags: CellFlags::empty(),
                    payload: Payload::Quoted(Box::new(self)),
                };
                // quote level is tracked by nesting depth of Quoted wrappers
                // beyond the base 3 in-place levels; see `quote_level`.
            }
        }
        self
    }

    /// Total quote level across in-place and `QUOTED!`-wrapped encoding.
    #[must_use]
    pub fn quote_level(&self) -> u32 {
        if self.kind == Kind::Quoted {
            if let Payload::Quoted(inner) = &self.payload {
                return 4 + inner.quote_level().saturating_sub(3).max(0) + inner.quote_depth as u32;
            }
        }
        u32::from(self.quote_depth)
    }

    /// `dequotify`: removes one quote level. Spec §8 "quote idempotence":
    /// `unquote(quote(v)) == v`.
    #[must_use]
    pub fn dequotify(&self) -> Option<Self> {
        if self.quote_depth > 0 {
            let mut out = self.copy_cell();
            out.quote_depth -= 1;
            return Some(out);
        }
        if self.kind == Kind::Quoted {
            if let Payload::Quoted(inner) = &self.payload {
                return Some((**inner).copy_cell());
            }
        }
        None
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.quote_level() {
            write!(f, "'")?;
        }
        match &self.payload {
            Payload::None => write!(f, "{}", self.kind),
            Payload::Logic(b) => write!(f, "{b}"),
            Payload::Integer(i) => write!(f, "{i}"),
            Payload::Decimal(d) => write!(f, "{d}"),
            Payload::Money { amount, scale } => write!(f, "${amount}e-{scale}"),
            Payload::Char(c) => write!(f, "#\"{c}\""),
            Payload::Pair(x, y) => write!(f, "{x}x{y}"),
            Payload::Time(ns) => write!(f, "{ns}:00"),
            Payload::Date(d) => write!(f, "{d}"),
            Payload::Series { id, .. } => write!(f, "<series {id:?}>"),
            Payload::Word { symbol, .. } => write!(f, "{symbol}"),
            Payload::Action(id) => write!(f, "<action {id:?}>"),
            Payload::Context(id) => write!(f, "<context {id:?}>"),
            Payload::Quoted(inner) => write!(f, "{inner}"),
            Payload::Handle(h) => write!(f, "<handle {h:#x}>"),
            Payload::Datatype(k) => write!(f, "{k}!"),
            Payload::Typeset(bits) => write!(f, "<typeset {bits:#x}>"),
        }
    }
}
