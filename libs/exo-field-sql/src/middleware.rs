// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Field-rewriting steps that run before a statement is built.
//!
//! A [`Pipeline`] is an ordered chain of [`Middleware`]. Each run works on its own copy of the
//! caller's [`Fields`], bound to the physical table of that run, so the same pipeline can run once
//! per shard without one run seeing another's changes.

use std::sync::Arc;

use crate::{
    database_error::DatabaseError,
    field::{Field, Fields},
    table::TableConfig,
};

/// The kind of statement a pipeline run prepares fields for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scene {
    Insert,
    Update,
    Delete,
    First,
    List,
    Total,
    Exists,
}

impl Scene {
    /// Insert and update build a payload; the rest only read predicates
    pub fn is_write(&self) -> bool {
        matches!(self, Scene::Insert | Scene::Update)
    }
}

/// One step of a pipeline. A step continues the chain by calling [`MiddlewareContext::next`];
/// returning without doing so skips every later step.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: &mut MiddlewareContext<'_>) -> Result<(), DatabaseError>;
}

struct MiddlewareFn<F>(F);

/// Wrap a closure as a shareable step, e.g. for [`Pipeline::with_optional`]
pub fn from_fn<F>(step: F) -> Arc<dyn Middleware>
where
    F: Fn(&mut MiddlewareContext<'_>) -> Result<(), DatabaseError> + Send + Sync + 'static,
{
    Arc::new(MiddlewareFn(step))
}

impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(&mut MiddlewareContext<'_>) -> Result<(), DatabaseError> + Send + Sync,
{
    fn handle(&self, ctx: &mut MiddlewareContext<'_>) -> Result<(), DatabaseError> {
        (self.0)(ctx)
    }
}

pub struct MiddlewareContext<'a> {
    scene: Scene,
    table: &'a TableConfig,
    fields: Fields,
    chain: &'a [Option<Arc<dyn Middleware>>],
    index: isize,
}

impl<'a> MiddlewareContext<'a> {
    pub fn scene(&self) -> Scene {
        self.scene
    }

    /// The physical table this run prepares fields for
    pub fn table(&self) -> &'a TableConfig {
        self.table
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    /// Append a field. Appended fields come after the caller's, so their values win the merge.
    pub fn push(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Run the next step in the chain. Empty slots are passed over but still consume their
    /// position. Calling this past the end of the chain is a no-op.
    pub fn next(&mut self) -> Result<(), DatabaseError> {
        self.index += 1;

        let chain = self.chain;
        match usize::try_from(self.index).ok().and_then(|i| chain.get(i)) {
            Some(Some(step)) => step.handle(self),
            Some(None) => self.next(),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<Option<Arc<dyn Middleware>>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, step: impl Middleware + 'static) -> Self {
        self.steps.push(Some(Arc::new(step)));
        self
    }

    /// Like [`Pipeline::with`], for a closure
    pub fn with_fn<F>(self, step: F) -> Self
    where
        F: Fn(&mut MiddlewareContext<'_>) -> Result<(), DatabaseError> + Send + Sync + 'static,
    {
        self.with(MiddlewareFn(step))
    }

    /// Add a step that may be absent. An absent step keeps its slot, so positions of later steps
    /// do not depend on which optional steps are configured.
    pub fn with_optional(mut self, step: Option<Arc<dyn Middleware>>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the chain on a copy of `fields`, returning the copy. The first step error aborts the
    /// chain and is returned as is.
    pub fn run(
        &self,
        scene: Scene,
        table: &TableConfig,
        fields: &Fields,
    ) -> Result<Fields, DatabaseError> {
        let mut ctx = MiddlewareContext {
            scene,
            table,
            fields: fields.clone(),
            chain: &self.steps,
            index: -1,
        };
        ctx.next()?;
        Ok(ctx.fields)
    }
}
