// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{fmt::Debug, sync::Arc};

use crate::{
    Record, SqlValue, database_error::DatabaseError, middleware::Scene, sql::Expressions,
    table::TableConfig,
};

/// What a field's value producer hands back to the merge.
///
/// Only flat key-value shapes can be merged into a payload; the other variants exist so that a
/// producer can report what it has and let the merge reject it.
#[derive(Clone)]
pub enum Data {
    /// Column name to value
    Record(Record),
    /// A typed value that knows how to flatten itself into named columns
    Flattened(Arc<dyn Flatten>),
    /// A bare value with no column name (unsupported)
    Scalar(SqlValue),
    /// A list of values with no column names (unsupported)
    List(Vec<SqlValue>),
}

impl Data {
    /// A single-column record
    pub fn single(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Data::Record(Record::from_iter([(column.into(), value.into())]))
    }
}

impl Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Data::Record(record) => f.debug_tuple("Record").field(record).finish(),
            Data::Flattened(flatten) => f
                .debug_tuple("Flattened")
                .field(&flatten.flatten())
                .finish(),
            Data::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            Data::List(values) => f.debug_tuple("List").field(values).finish(),
        }
    }
}

/// Turn a typed value into named columns. Implemented by row-like types that want to be inserted
/// or used as an update payload as a whole.
pub trait Flatten: Send + Sync {
    fn flatten(&self) -> Record;
}

/// What a producer sees when it is invoked: the (physical) table the statement will run against
/// and the kind of statement being built.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub table: &'a TableConfig,
    pub scene: Scene,
}

impl<'a> FieldContext<'a> {
    pub fn new(table: &'a TableConfig, scene: Scene) -> Self {
        Self { table, scene }
    }
}

/// Produces a field's contribution to a write payload. `Ok(None)` means "not set", which is
/// different from a value set to `NULL`.
pub trait ValueProducer: Send + Sync {
    fn produce(&self, ctx: &FieldContext<'_>) -> Result<Option<Data>, DatabaseError>;
}

/// Produces a field's contribution to a predicate list. An empty list contributes nothing.
pub trait WhereProducer: Send + Sync {
    fn produce(&self, ctx: &FieldContext<'_>) -> Result<Expressions, DatabaseError>;
}

pub(super) struct ValueFn<F>(pub F);

impl<F> ValueProducer for ValueFn<F>
where
    F: Fn(&FieldContext<'_>) -> Result<Option<Data>, DatabaseError> + Send + Sync,
{
    fn produce(&self, ctx: &FieldContext<'_>) -> Result<Option<Data>, DatabaseError> {
        (self.0)(ctx)
    }
}

pub(super) struct WhereFn<F>(pub F);

impl<F> WhereProducer for WhereFn<F>
where
    F: Fn(&FieldContext<'_>) -> Result<Expressions, DatabaseError> + Send + Sync,
{
    fn produce(&self, ctx: &FieldContext<'_>) -> Result<Expressions, DatabaseError> {
        (self.0)(ctx)
    }
}

/// A value fixed at construction time
pub(super) struct ConstantValue(pub Data);

impl ValueProducer for ConstantValue {
    fn produce(&self, _ctx: &FieldContext<'_>) -> Result<Option<Data>, DatabaseError> {
        Ok(Some(self.0.clone()))
    }
}

/// Predicates fixed at construction time
pub(super) struct ConstantWhere(pub Expressions);

impl WhereProducer for ConstantWhere {
    fn produce(&self, _ctx: &FieldContext<'_>) -> Result<Expressions, DatabaseError> {
        Ok(self.0.clone())
    }
}
