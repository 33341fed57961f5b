// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_trait::async_trait;

use crate::{database_error::DatabaseError, row::Row, sql::Statement};

/// Executes abstract statements against a backend.
///
/// Implementations render the statement themselves (see [`crate::ExpressionBuilder::to_sql`]),
/// so nothing above this trait depends on SQL text. Every method either fully succeeds or returns
/// an error. "No rows" from [`first`](Self::first) and [`exists`](Self::exists) is a result, not
/// an error. Timeouts and cancellation are the implementation's business and surface as errors.
#[async_trait]
pub trait ExecutionHandler: Send + Sync {
    async fn exec(&self, statement: &Statement) -> Result<(), DatabaseError>;

    async fn exec_with_rows_affected(&self, statement: &Statement) -> Result<i64, DatabaseError>;

    /// Run an insert, returning the number of inserted rows and the id of the new row (`0` when
    /// the table has no primary key to return).
    async fn insert_with_last_id(&self, statement: &Statement)
    -> Result<(u64, i64), DatabaseError>;

    async fn first(&self, statement: &Statement) -> Result<Option<Row>, DatabaseError>;

    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, DatabaseError>;

    async fn count(&self, statement: &Statement) -> Result<i64, DatabaseError>;

    async fn exists(&self, statement: &Statement) -> Result<bool, DatabaseError>;
}
