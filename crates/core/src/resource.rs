//! Resource/limits contract, spec §4.B (allocation failure) and §5
//! ("Cancellation/timeouts": the periodic signal check).
//!
//! Grounded on the teacher's `ResourceTracker` trait and `NoLimitTracker` /
//! `LimitedTracker` pair (`resource.rs`). `check_call_depth` replaces the
//! source's `Guess_If_Stack_Grows_Up` (spec §9 Open Question) with an
//! explicit counter.

use std::fmt;

/// Error raised when a resource limit is exceeded.
#[derive(Debug, Clone)]
pub enum ResourceError {
    Allocation { limit: usize, count: usize },
    CallDepth { limit: usize, depth: usize },
    Signal,
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation { limit, count } => write!(f, "allocation limit exceeded: {count} > {limit}"),
            Self::CallDepth { limit, depth } => write!(f, "call depth limit exceeded: {depth} > {limit}"),
            Self::Signal => write!(f, "HALT"),
        }
    }
}

impl std::error::Error for ResourceError {}

/// Configurable limits for an embedding that must bound an untrusted script,
/// spec §5.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceLimits {
    pub max_allocations: Option<usize>,
    pub max_call_depth: Option<usize>,
    /// Number of evaluator steps between periodic signal checks, spec
    /// §4.H.1 ("if tick-counter decrement hits 0: run periodic signal
    /// handling").
    pub signal_every_n_steps: Option<u32>,
}

/// Default recursion depth, matching the teacher's conservative default.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

/// Contract every heap/evaluator is generic over, spec §4.B/§5.
pub trait ResourceTracker: fmt::Debug {
    fn charge_allocation(&mut self, estimated_len: usize) -> Result<(), ResourceError>;
    fn release_allocation(&mut self);
    fn check_call_depth(&self, current_depth: usize) -> Result<(), ResourceError>;
    /// The periodic "signal" check, spec §4.H.1/§5. Returning `Err` raises a
    /// HALT that unwinds via the normal fail mechanism (uncatchable, spec
    /// §7).
    fn check_signal(&mut self) -> Result<(), ResourceError>;
}

/// Unrestricted tracker: the REPL default. Still enforces the conservative
/// default call-depth limit so unbounded recursion panics cleanly rather
/// than overflowing the real Rust stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLimitTracker {
    allocations: usize,
}

impl ResourceTracker for NoLimitTracker {
    fn charge_allocation(&mut self, _estimated_len: usize) -> Result<(), ResourceError> {
        self.allocations += 1;
        Ok(())
    }

    fn release_allocation(&mut self) {
        self.allocations = self.allocations.saturating_sub(1);
    }

    fn check_call_depth(&self, current_depth: usize) -> Result<(), ResourceError> {
        if current_depth >= DEFAULT_MAX_CALL_DEPTH {
            Err(ResourceError::CallDepth {
                limit: DEFAULT_MAX_CALL_DEPTH,
                depth: current_depth,
            })
        } else {
            Ok(())
        }
    }

    fn check_signal(&mut self) -> Result<(), ResourceError> {
        Ok(())
    }
}

/// Tracker used for embedding contexts that must bound an untrusted script
/// (spec §5 "Cancellation/timeouts").
#[derive(Debug, Clone, Default)]
pub struct LimitedTracker {
    limits: ResourceLimits,
    allocations: usize,
    halted: bool,
}

impl LimitedTracker {
    #[must_use]
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            allocations: 0,
            halted: false,
        }
    }

    /// Externally requests a halt; the next `check_signal` call surfaces it.
    /// This is the hook an embedder's watchdog thread uses to cancel a
    /// runaway script (spec §5 "no preemptive cancellation" — cancellation is
    /// cooperative via this flag plus the periodic check).
    pub fn request_halt(&mut self) {
        self.halted = true;
    }
}

impl ResourceTracker for LimitedTracker {
    fn charge_allocation(&mut self, _estimated_len: usize) -> Result<(), ResourceError> {
        let limit = self.limits.max_allocations.unwrap_or(usize::MAX);
        if self.allocations >= limit {
            return Err(ResourceError::Allocation {
                limit,
                count: self.allocations,
            });
        }
        self.allocations += 1;
        Ok(())
    }

    fn release_allocation(&mut self) {
        self.allocations = self.allocations.saturating_sub(1);
    }

    fn check_call_depth(&self, current_depth: usize) -> Result<(), ResourceError> {
        let limit = self.limits.max_call_depth.unwrap_or(DEFAULT_MAX_CALL_DEPTH);
        if current_depth >= limit {
            Err(ResourceError::CallDepth { limit, depth: current_depth })
        } else {
            Ok(())
        }
    }

    fn check_signal(&mut self) -> Result<(), ResourceError> {
        if self.halted {
            Err(ResourceError::Signal)
        } else {
            Ok(())
        }
    }
}
