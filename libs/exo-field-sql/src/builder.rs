// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Statement builders.
//!
//! Each builder is a pure function of a table and a set of fields (already prepared by the
//! middleware pipeline). Values and predicates come from the merge in [`crate::merge`]. Ordering
//! is never implied: without one, paging through results is not guaranteed to be stable.

use tracing::warn;

use crate::{
    database_error::DatabaseError,
    field::{FieldContext, Fields},
    merge::{merge_data, merge_present, merge_where},
    middleware::Scene,
    sql::{Column, Count, Delete, Insert, Limit, Offset, OrderBy, Select, Update},
    table::TableConfig,
};

/// A page request. A `size` of zero means "no limit" for a single table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub index: u32,
    pub size: u32,
}

impl Page {
    pub fn new(index: u32, size: u32) -> Self {
        Self { index, size }
    }

    /// Every matching row
    pub fn all() -> Self {
        Self::default()
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.index) * i64::from(self.size)
    }

    /// `(offset, limit)` for a bounded page, `None` when `size` is zero
    pub fn window(&self) -> Option<(Offset, Limit)> {
        (self.size > 0).then(|| (Offset(self.offset().max(0)), Limit(i64::from(self.size))))
    }
}

pub fn build_insert(table: &TableConfig, fields: &Fields) -> Result<Insert, DatabaseError> {
    let table_ref = table.table_ref()?;
    let ctx = FieldContext::new(table, Scene::Insert);
    let (values, present) = merge_present(fields, &ctx)?;

    if let Some(missing) = fields
        .iter()
        .find(|field| field.schema().required && !present.contains(field.name()))
    {
        return Err(DatabaseError::validation(missing.name(), "is required"));
    }

    Ok(Insert {
        table: table_ref,
        values,
        returning: table.primary_key().map(|column| column.name.clone()),
    })
}

/// Build an update. An empty predicate list is allowed and updates every row; guarding against
/// that is up to the caller.
pub fn build_update(table: &TableConfig, fields: &Fields) -> Result<Update, DatabaseError> {
    let table_ref = table.table_ref()?;
    let ctx = FieldContext::new(table, Scene::Update);
    let values = merge_data(fields, &ctx)?;
    let predicates = merge_where(fields, &ctx)?;

    if values.is_empty() {
        return Err(DatabaseError::EmptyUpdate(table.logical_name().to_string()));
    }
    if predicates.is_empty() {
        warn!(table = table_ref.name, "Update without predicates affects every row");
    }

    Ok(Update {
        table: table_ref,
        predicates,
        values,
    })
}

/// Build a delete. Like [`build_update`], an empty predicate list is allowed.
pub fn build_delete(table: &TableConfig, fields: &Fields) -> Result<Delete, DatabaseError> {
    let table_ref = table.table_ref()?;
    let ctx = FieldContext::new(table, Scene::Delete);
    let predicates = merge_where(fields, &ctx)?;

    if predicates.is_empty() {
        warn!(table = table_ref.name, "Delete without predicates affects every row");
    }

    Ok(Delete {
        table: table_ref,
        predicates,
    })
}

pub fn build_first(
    table: &TableConfig,
    fields: &Fields,
    order_by: &OrderBy,
) -> Result<Select, DatabaseError> {
    let mut select = select(table, fields, order_by, Scene::First, None)?;
    select.limit = Some(Limit(1));
    Ok(select)
}

pub fn build_list(
    table: &TableConfig,
    fields: &Fields,
    order_by: &OrderBy,
    page: Page,
) -> Result<Select, DatabaseError> {
    select(table, fields, order_by, Scene::List, page.window())
}

/// A list over an explicit window, as used per shard by the pagination engine
pub fn build_window(
    table: &TableConfig,
    fields: &Fields,
    order_by: &OrderBy,
    offset: i64,
    limit: i64,
) -> Result<Select, DatabaseError> {
    select(
        table,
        fields,
        order_by,
        Scene::List,
        Some((Offset(offset.max(0)), Limit(limit))),
    )
}

pub fn build_total(table: &TableConfig, fields: &Fields) -> Result<Count, DatabaseError> {
    let table_ref = table.table_ref()?;
    let ctx = FieldContext::new(table, Scene::Total);

    Ok(Count {
        table: table_ref,
        predicates: merge_where(fields, &ctx)?,
    })
}

pub fn build_exists(table: &TableConfig, fields: &Fields) -> Result<Select, DatabaseError> {
    let table_ref = table.table_ref()?;
    let ctx = FieldContext::new(table, Scene::Exists);

    Ok(Select {
        table: table_ref,
        columns: vec![Column::Constant(1)],
        predicates: merge_where(fields, &ctx)?,
        order_by: None,
        offset: None,
        limit: Some(Limit(1)),
    })
}

fn select(
    table: &TableConfig,
    fields: &Fields,
    order_by: &OrderBy,
    scene: Scene,
    window: Option<(Offset, Limit)>,
) -> Result<Select, DatabaseError> {
    let table_ref = table.table_ref()?;
    let ctx = FieldContext::new(table, scene);
    let predicates = merge_where(fields, &ctx)?;
    let (offset, limit) = window.unzip();

    Ok(Select {
        table: table_ref,
        columns: table.select_columns(),
        predicates,
        order_by: (!order_by.is_empty()).then(|| order_by.clone()),
        offset,
        limit,
    })
}
