//! Errors - resolution, start and teardown failures
//!
//! - `ResolveError`: the one error `Resolver::resolve` returns. Carries the
//!   step and block it failed at, plus whatever went wrong while unwinding.
//! - `TeardownError`: aggregate of every failed `close`, none dropped.
//! - `RunError`: failures of the post-resolution start pass.

use std::fmt;

use thiserror::Error;

use super::ids::BlockId;
use super::value::LiteralError;
use crate::typed::component::ComponentError;
use crate::typed::factory::FactoryKey;

/// Phase of resolution an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Structural checks before any object exists.
    Plan,
    /// Dependency walk.
    Resolve,
    /// Factory invocation or literal parsing.
    Construct,
    /// Value-edge delivery.
    Deliver,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Plan => "plan",
            Step::Resolve => "resolve",
            Step::Construct => "construct",
            Step::Deliver => "deliver",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ResolveErrorKind {
    #[error("id {0} is used more than once")]
    DuplicateId(BlockId),

    #[error("link {link} references unknown id {id}")]
    DanglingReference { id: BlockId, link: String },

    #[error("link {link} targets constant {id}; only blocks can be targets")]
    ConstantTarget { id: BlockId, link: String },

    #[error("argument link {link} must target a named parameter, not `*`")]
    WholeTarget { link: String },

    #[error("no factory registered for {0}")]
    UnknownFactory(FactoryKey),

    #[error("{factory} has no parameter `{spot}`")]
    UnknownParameter { factory: FactoryKey, spot: String },

    #[error("constant {id}: unknown literal type `{factory}`")]
    UnknownLiteralType { id: BlockId, factory: String },

    #[error("argument cycle: {}", display_path(.0))]
    Cycle(Vec<BlockId>),

    #[error("dependency chain deeper than {0}")]
    DepthExceeded(usize),

    #[error("constant {id}: {source}")]
    LiteralParse {
        id: BlockId,
        #[source]
        source: LiteralError,
    },

    #[error("parameter `{param}` is required but not wired")]
    UnwiredParameter { param: String },

    #[error("parameter `{param}` slot {slot} is wired more than once")]
    DuplicateWiring { param: String, slot: String },

    #[error("parameter `{param}`: {reason}")]
    SlotMismatch { param: String, reason: String },

    #[error("{id} has no output `{spot}`")]
    NoSuchOutput { id: BlockId, spot: String },

    #[error("{id} produced {kind}, which cannot receive values")]
    NotAnObject { id: BlockId, kind: &'static str },

    #[error("factory call failed: {0}")]
    Construction(#[source] ComponentError),

    #[error("delivery of {link} failed: {source}")]
    Delivery {
        link: String,
        #[source]
        source: ComponentError,
    },
}

fn display_path(ids: &[BlockId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Failure of `Resolver::resolve`.
#[derive(Debug)]
pub struct ResolveError {
    step: Step,
    block: Option<BlockId>,
    kind: ResolveErrorKind,
    teardown: Option<TeardownError>,
}

impl ResolveError {
    pub fn new(step: Step, block: Option<BlockId>, kind: ResolveErrorKind) -> Self {
        Self {
            step,
            block,
            kind,
            teardown: None,
        }
    }

    pub fn at(step: Step, block: BlockId, kind: ResolveErrorKind) -> Self {
        Self::new(step, Some(block), kind)
    }

    pub(crate) fn with_teardown(mut self, teardown: Option<TeardownError>) -> Self {
        self.teardown = teardown;
        self
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn block(&self) -> Option<BlockId> {
        self.block
    }

    pub fn kind(&self) -> &ResolveErrorKind {
        &self.kind
    }

    /// Close failures hit while unwinding after this error.
    pub fn teardown(&self) -> Option<&TeardownError> {
        self.teardown.as_ref()
    }

    /// Ids on the argument cycle, if this is a cycle error.
    pub fn cycle(&self) -> Option<&[BlockId]> {
        match &self.kind {
            ResolveErrorKind::Cycle(ids) => Some(ids),
            _ => None,
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block {
            Some(block) => write!(f, "{} failed at {}: {}", self.step, block, self.kind)?,
            None => write!(f, "{} failed: {}", self.step, self.kind)?,
        }
        if let Some(teardown) = &self.teardown {
            write!(f, " (unwind: {teardown})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// One resource that failed to close.
#[derive(Debug, Error)]
#[error("{block} failed to close: {source}")]
pub struct CloseFailure {
    pub block: BlockId,
    #[source]
    pub source: ComponentError,
}

/// Every close failure of one teardown, in the order they happened.
#[derive(Debug, Error)]
#[error("{} resource(s) failed to close", .failures.len())]
pub struct TeardownError {
    failures: Vec<CloseFailure>,
}

impl TeardownError {
    pub(crate) fn from_failures(failures: Vec<CloseFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    pub fn suppressed(&self) -> &[CloseFailure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<CloseFailure> {
        self.failures
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("application was already started")]
    AlreadyStarted,

    #[error("{block} failed to start: {source}")]
    Start {
        block: BlockId,
        #[source]
        source: ComponentError,
    },
}
