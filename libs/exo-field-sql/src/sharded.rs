// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! One logical table spread over several physical tables.
//!
//! Shards are visited one at a time, in the configured order, which also defines the global row
//! order: the rows of a page are the rows that page would hold if the shards were concatenated.
//! Each shard's contribution depends on what the previous shards held, so the loop is sequential.
//! Separate paginations share nothing mutable and may run concurrently.

use tracing::{instrument, trace};

use crate::{
    builder::Page,
    config::ShardingConfig,
    database_error::DatabaseError,
    field::Fields,
    model::{Model, decode_rows},
    row::{FromRow, Row},
    sql::OrderBy,
    table::TableConfig,
};

#[derive(Clone, Debug)]
pub struct ShardedModel {
    model: Model,
    shards: Vec<String>,
    skip_total: bool,
}

/// Running state of a pagination: rows still to skip, and rows still to collect
#[derive(Debug, Clone, Copy)]
struct Cursor {
    global_offset: i64,
    remaining_limit: i64,
}

impl ShardedModel {
    /// A sharded view of `model`, whose table's physical name is substituted by each of `shards`
    /// in turn
    pub fn new(model: Model, shards: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            model,
            shards: shards.into_iter().map(Into::into).collect(),
            skip_total: false,
        }
    }

    pub fn from_config(model: Model, config: &ShardingConfig) -> Self {
        Self::new(model, config.tables.iter().cloned()).skip_total(config.skip_total)
    }

    /// Stop visiting shards once the page is full. The total returned by
    /// [`paginate`](Self::paginate) then only counts the shards visited so far.
    pub fn skip_total(mut self, skip_total: bool) -> Self {
        self.skip_total = skip_total;
        self
    }

    pub fn shards(&self) -> &[String] {
        &self.shards
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Fill `out` with the rows on `page` across all shards and return the total number of
    /// matching rows.
    ///
    /// `order_by` orders rows within each shard. `out` is replaced only when the whole pagination
    /// succeeds; on error it is left as it was.
    #[instrument(
        skip_all,
        fields(table = self.model.table().logical_name(), index = page.index, size = page.size)
    )]
    pub async fn paginate<T: FromRow>(
        &self,
        fields: &Fields,
        order_by: &OrderBy,
        page: Page,
        out: &mut Vec<T>,
    ) -> Result<i64, DatabaseError> {
        if page.index == 0 && page.size == 0 {
            return Err(DatabaseError::PaginationSizeRequired);
        }
        let views = self.views()?;

        let mut cursor = Cursor {
            global_offset: page.offset(),
            remaining_limit: i64::from(page.size),
        };
        let mut total_count = 0;
        let mut rows = Vec::new();

        for table in &views {
            if self.skip_total && cursor.remaining_limit <= 0 {
                trace!(shard = table.physical_name(), "Page is full, skipping remaining shards");
                break;
            }
            total_count += self
                .visit(table, fields, order_by, &mut cursor, &mut rows)
                .await?;
        }

        *out = decode_rows(rows)?;
        Ok(total_count)
    }

    /// Count one shard and collect its part of the page, returning the shard's count
    #[instrument(skip_all, fields(shard = table.physical_name()))]
    async fn visit(
        &self,
        table: &TableConfig,
        fields: &Fields,
        order_by: &OrderBy,
        cursor: &mut Cursor,
        rows: &mut Vec<Row>,
    ) -> Result<i64, DatabaseError> {
        let shard_count = self.model.total_in(table, fields).await?;

        if shard_count <= cursor.global_offset {
            cursor.global_offset -= shard_count;
            trace!(shard_count, global_offset = cursor.global_offset, "Shard lies before the page");
            return Ok(shard_count);
        }

        if cursor.remaining_limit > 0 {
            let shard_rows = self
                .model
                .window_in(
                    table,
                    fields,
                    order_by,
                    cursor.global_offset,
                    cursor.remaining_limit,
                )
                .await?;
            let got = shard_rows.len() as i64;
            trace!(
                shard_count,
                offset = cursor.global_offset,
                limit = cursor.remaining_limit,
                got,
                "Collected rows"
            );

            rows.extend(shard_rows);
            cursor.remaining_limit -= got;
            // This shard held the first row of the page, so later shards start at their first row
            cursor.global_offset = 0;
        } else {
            trace!(shard_count, "Page is full, counting only");
        }

        Ok(shard_count)
    }

    /// The number of matching rows across all shards
    #[instrument(skip_all, fields(table = self.model.table().logical_name()))]
    pub async fn total(&self, fields: &Fields) -> Result<i64, DatabaseError> {
        let mut total_count = 0;
        for table in self.views()? {
            total_count += self.model.total_in(&table, fields).await?;
        }
        Ok(total_count)
    }

    /// Whether any shard has a matching row. Shards after the first hit are not queried.
    #[instrument(skip_all, fields(table = self.model.table().logical_name()))]
    pub async fn exists(&self, fields: &Fields) -> Result<bool, DatabaseError> {
        for table in self.views()? {
            if self.model.exists_in(&table, fields).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The first matching row of the first shard, in shard order, that has one
    #[instrument(skip_all, fields(table = self.model.table().logical_name()))]
    pub async fn first<T: FromRow>(
        &self,
        fields: &Fields,
        order_by: &OrderBy,
    ) -> Result<Option<T>, DatabaseError> {
        for table in self.views()? {
            if let Some(row) = self.model.first_in(&table, fields, order_by).await? {
                return T::from_row(row).map(Some);
            }
        }
        Ok(None)
    }

    /// One table view per shard. Fails before any backend call if the table has no handler or
    /// there are no shards.
    fn views(&self) -> Result<Vec<TableConfig>, DatabaseError> {
        let table = self.model.table();
        table.handler()?;

        if self.shards.is_empty() {
            return Err(DatabaseError::Config(format!(
                "No shards configured for table `{}`",
                table.logical_name()
            )));
        }

        Ok(self
            .shards
            .iter()
            .map(|shard| table.with_physical_name(shard))
            .collect())
    }
}
