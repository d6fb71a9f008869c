//! # Behaviour Chain
//!
//! A behaviour wraps the remainder of its chain. The first declared behaviour
//! is the outermost wrapper and the terminal step always runs last.
//!
//! ```text
//! invoke(ctx) ─► B0 ─► B1 ─► ... ─► Bn ─► Terminal
//!                 ◄──── result propagates outward ────
//! ```
//!
//! A behaviour either forwards by calling [`Next::run`] or short-circuits by
//! returning without it. `Next` is consumed by `run`, so the rest of the chain
//! runs at most once per invocation.

pub mod builder;

pub use builder::{BehaviourKind, PipelineBuilder, PipelineDefinition, Pipelines, Scope};

use crate::error::ProcessingError;
use async_trait::async_trait;
use std::sync::Arc;

/// One middleware unit in a pipeline scope.
#[async_trait]
pub trait Behaviour<C>: Send + Sync {
    /// Name used in configuration and logs.
    fn name(&self) -> &'static str;

    /// Run this behaviour around the rest of the chain.
    async fn invoke(&self, ctx: &mut C, next: Next<'_, C>) -> Result<(), ProcessingError>;
}

/// Implicit final step of a pipeline scope.
#[async_trait]
pub trait Terminal<C>: Send + Sync {
    /// Run the terminal step.
    async fn run(&self, ctx: &mut C) -> Result<(), ProcessingError>;
}

/// Continuation: the behaviours after the current one, then the terminal.
pub struct Next<'a, C> {
    chain: &'a [Arc<dyn Behaviour<C>>],
    terminal: &'a dyn Terminal<C>,
}

impl<'a, C: Send> Next<'a, C> {
    /// Run the remainder of the chain.
    pub async fn run(self, ctx: &mut C) -> Result<(), ProcessingError> {
        match self.chain.split_first() {
            Some((behaviour, rest)) => {
                let next = Next {
                    chain: rest,
                    terminal: self.terminal,
                };
                behaviour.invoke(ctx, next).await
            }
            None => self.terminal.run(ctx).await,
        }
    }

    /// Behaviours left before the terminal.
    pub fn remaining(&self) -> usize {
        self.chain.len()
    }
}

/// An immutable, ordered chain of behaviours ending in a terminal step.
pub struct Pipeline<C> {
    behaviours: Vec<Arc<dyn Behaviour<C>>>,
    terminal: Arc<dyn Terminal<C>>,
}

impl<C: Send> Pipeline<C> {
    /// Assemble a pipeline. Validation happens in [`PipelineBuilder`].
    pub(crate) fn new(behaviours: Vec<Arc<dyn Behaviour<C>>>, terminal: Arc<dyn Terminal<C>>) -> Self {
        Self {
            behaviours,
            terminal,
        }
    }

    /// Run `ctx` through every behaviour and the terminal step.
    pub async fn invoke(&self, ctx: &mut C) -> Result<(), ProcessingError> {
        Next {
            chain: &self.behaviours,
            terminal: self.terminal.as_ref(),
        }
        .run(ctx)
        .await
    }

    /// Behaviour names in declared order.
    pub fn behaviour_names(&self) -> Vec<&'static str> {
        self.behaviours.iter().map(|b| b.name()).collect()
    }
}

impl<C> std::fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field(
                "behaviours",
                &self.behaviours.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
