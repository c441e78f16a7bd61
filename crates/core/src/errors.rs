//! Error taxonomy and the three-tier fail/throw/panic plumbing, spec §4.I/§7.
//!
//! Grounded on the teacher's `RunError`/`ExceptionRaise` split
//! (`exception_private.rs`): `Internal` for interpreter bugs, `Exc` for
//! catchable errors, `UncatchableExc` for resource-limit failures. We add a
//! fourth channel the teacher doesn't need — `panic_core` — because spec
//! §4.I/§7 requires a non-`Result` abort tier distinct from a catchable
//! `Internal`.

use std::borrow::Cow;
use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

/// Closed error-id taxonomy, spec §4.I (representative list) plus the
/// scanner taxonomy from §4.D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorId {
    NoValue,
    NeedNonVoid,
    NeedNonNull,
    ArgType,
    BadRefine,
    NoArg,
    Overflow,
    AmbiguousInfix,
    LiteralLeftPath,
    EvaluateNull,
    VoidEvaluation,
    ProtectedWrite,
    NotBoundToContext,
    DupVars,
    InvalidCompare,
    NoCatchForThrow,
    CannotCompare,
    NoDispatcher,
    ScanInvalid,
    ScanMissing,
    ScanExtra,
    ScanMismatch,
    IllegalCr,
    IllegalZeroByte,
    InvalidUtf8,
    InvalidToken,
}

/// Source location attached to every scanner and evaluator error, spec
/// §4.D/§4.I/§8 ("every scanner error carries `(file, line)` such that the
/// reported line contains the offending byte").
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeLoc {
    pub file: String,
    pub line: u32,
    pub line_text: String,
    pub token_text: String,
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: near {:?}", self.file, self.line, self.token_text)
    }
}

/// The recoverable-tier error payload, spec §4.I tier 1.
#[derive(Debug, Clone)]
pub struct FailError {
    pub id: ErrorId,
    pub message: String,
    pub near: CodeLoc,
}

impl fmt::Display for FailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.id, self.message, self.near)
    }
}

impl std::error::Error for FailError {}

impl FailError {
    #[must_use]
    pub fn new(id: ErrorId, message: impl Into<String>, near: CodeLoc) -> Self {
        Self {
            id,
            message: message.into(),
            near,
        }
    }

    #[must_use]
    pub fn simple(id: ErrorId, message: impl Into<String>) -> Self {
        Self::new(id, message, CodeLoc::default())
    }

    #[must_use]
    pub fn protected_write() -> Self {
        Self::simple(ErrorId::ProtectedWrite, "cell or series is protected")
    }

    #[must_use]
    pub fn from_resource(e: &crate::resource::ResourceError) -> Self {
        Self::simple(ErrorId::Overflow, e.to_string())
    }

    pub fn with_near(mut self, near: CodeLoc) -> Self {
        self.near = near;
        self
    }
}

/// Crate-wide fallible-evaluation error, spec §4.I/§7.
#[derive(Debug)]
pub enum EvalError {
    /// Bug in the runtime itself; recoverable through `Result` plumbing but
    /// never something user code triggers deliberately.
    Internal(Cow<'static, str>),
    /// Recoverable per spec §7 tier 1: caught by `TRAP`/`CATCH`.
    Fail(Box<FailError>),
    /// Resource-limit failure (HALT): displays like a normal error but
    /// cannot be caught, spec §7 propagation policy / §5 cancellation.
    Uncatchable(Box<FailError>),
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            Self::Fail(e) | Self::Uncatchable(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for EvalError {}

impl From<FailError> for EvalError {
    fn from(e: FailError) -> Self {
        Self::Fail(Box::new(e))
    }
}

impl EvalError {
    #[must_use]
    pub fn internal(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal(msg.into())
    }

    #[must_use]
    pub fn uncatchable(e: FailError) -> Self {
        Self::Uncatchable(Box::new(e))
    }

    /// True when `TRAP`/`CATCH` may intercept this error, spec §7.
    #[must_use]
    pub fn is_catchable(&self) -> bool {
        matches!(self, Self::Fail(_))
    }
}

pub type RunResult<T> = Result<T, EvalError>;

/// Tier-3 error channel, spec §4.I "Panic": "an internal inconsistency;
/// takes an immediate process-abort path with a minimal dump (not
/// recoverable)." Unlike `EvalError::Internal`, this never returns.
pub fn panic_core(msg: impl fmt::Display) -> ! {
    eprintln!("*** panic (core invariant violated): {msg}");
    std::process::abort();
}
