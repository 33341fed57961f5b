// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Composable SQL statements over fields.
//!
//! A logical row is described once as a set of [`Field`]s, each producing a value, predicates or
//! both. The same fields then build inserts, updates, deletes and the read statements, after an
//! optional [`Pipeline`] of middleware has had a chance to add its own fields. A
//! [`ShardedModel`] presents several identically shaped tables as one paginated collection.

#[macro_use]
mod sql;

mod builder;
mod config;
mod field;
mod handler;
mod merge;
mod middleware;
mod model;
mod row;
mod sharded;
mod table;
mod value;

#[cfg(feature = "pool")]
mod pg;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub mod database_error;

pub use builder::{
    Page, build_delete, build_exists, build_first, build_insert, build_list, build_total,
    build_update, build_window,
};
pub use config::{
    EXO_CHECK_CONNECTION_ON_STARTUP, EXO_CONNECTION_POOL_SIZE, EXO_POSTGRES_PASSWORD,
    EXO_POSTGRES_URL, EXO_POSTGRES_USER, EXO_SHARD_SKIP_TOTAL, EXO_SHARD_TABLES, Environment,
    Overlay, PoolConfig, ProcessEnvironment, ShardingConfig,
};
pub use field::{Data, Field, FieldContext, Fields, Flatten, Schema, ValueProducer, WhereProducer};
pub use handler::ExecutionHandler;
pub use merge::{merge_data, merge_where};
pub use middleware::{Middleware, MiddlewareContext, Pipeline, Scene, from_fn};
pub use model::Model;
pub use row::{FromRow, Row};
pub use sharded::ShardedModel;
pub use sql::{
    CaseSensitivity, Column, Count, Delete, ExpressionBuilder, Expressions, Insert, Limit, Offset,
    OrderBy, OrderByElement, Ordering, Predicate, SQLBuilder, Select, Statement, TableRef, Update,
};
pub use table::{ColumnConfig, TableConfig};
pub use value::{FromSqlValue, Record, SqlValue};

#[cfg(feature = "pool")]
pub use pg::PostgresHandler;
