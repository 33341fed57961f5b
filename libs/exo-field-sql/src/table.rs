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
    database_error::DatabaseError,
    handler::ExecutionHandler,
    sql::{Column, TableRef},
};

/// Column metadata owned by a [`TableConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnConfig {
    pub name: String,
    pub primary_key: bool,
}

impl ColumnConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: false,
        }
    }

    pub fn pk(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: true,
        }
    }
}

/// A logical table: its name, the alias used to qualify columns, its columns and the handler that
/// executes statements against it.
///
/// A sharded view is a copy with a different physical name (see [`TableConfig::with_physical_name`]).
/// Columns and handler are shared behind `Arc`s, so such copies are cheap and the original is never
/// touched.
#[derive(Clone)]
pub struct TableConfig {
    logical_name: String,
    physical_name: Option<String>,
    alias: Option<String>,
    columns: Arc<[ColumnConfig]>,
    handler: Option<Arc<dyn ExecutionHandler>>,
}

impl TableConfig {
    pub fn new(logical_name: impl Into<String>, columns: Vec<ColumnConfig>) -> Self {
        Self {
            logical_name: logical_name.into(),
            physical_name: None,
            alias: None,
            columns: columns.into(),
            handler: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_handler(mut self, handler: Arc<dyn ExecutionHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// A view of this table backed by another physical table with the same columns.
    pub fn with_physical_name(&self, physical_name: impl Into<String>) -> Self {
        Self {
            physical_name: Some(physical_name.into()),
            ..self.clone()
        }
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    /// The table statements actually run against
    pub fn physical_name(&self) -> &str {
        self.physical_name.as_deref().unwrap_or(&self.logical_name)
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn columns(&self) -> &[ColumnConfig] {
        &self.columns
    }

    pub fn primary_key(&self) -> Option<&ColumnConfig> {
        self.columns.iter().find(|column| column.primary_key)
    }

    pub fn handler(&self) -> Result<&Arc<dyn ExecutionHandler>, DatabaseError> {
        self.handler.as_ref().ok_or_else(|| {
            DatabaseError::Config(format!(
                "No execution handler configured for table `{}`",
                self.logical_name
            ))
        })
    }

    pub(crate) fn table_ref(&self) -> Result<TableRef, DatabaseError> {
        let name = self.physical_name();
        if name.trim().is_empty() {
            return Err(DatabaseError::Config("Table name must not be empty".into()));
        }
        Ok(TableRef::new(name, self.alias.clone()))
    }

    /// The select list: every configured column, or `*` when none are configured
    pub(crate) fn select_columns(&self) -> Vec<Column> {
        if self.columns.is_empty() {
            vec![Column::Star]
        } else {
            self.columns
                .iter()
                .map(|column| Column::named(&column.name))
                .collect()
        }
    }
}

impl Debug for TableConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableConfig")
            .field("logical_name", &self.logical_name)
            .field("physical_name", &self.physical_name)
            .field("alias", &self.alias)
            .field("columns", &self.columns)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_view_leaves_original() {
        let table = TableConfig::new("orders", vec![ColumnConfig::pk("id")]).with_alias("o");
        let shard = table.with_physical_name("orders_2");

        assert_eq!(table.physical_name(), "orders");
        assert_eq!(shard.physical_name(), "orders_2");
        assert_eq!(shard.logical_name(), "orders");
        assert_eq!(shard.alias(), Some("o"));
        assert!(Arc::ptr_eq(&table.columns, &shard.columns));
    }

    #[test]
    fn empty_name_rejected() {
        let err = TableConfig::new(" ", vec![]).table_ref().unwrap_err();
        assert!(matches!(err, DatabaseError::Config(_)));
    }

    #[test]
    fn missing_handler() {
        let table = TableConfig::new("orders", vec![]);
        let Err(err) = table.handler() else {
            panic!("expected a missing handler error");
        };
        assert_eq!(
            err.to_string(),
            "Configuration error: No execution handler configured for table `orders`"
        );
    }

    #[test]
    fn select_list() {
        let bare = TableConfig::new("orders", vec![]);
        assert_eq!(bare.select_columns(), vec![Column::Star]);

        let table = TableConfig::new(
            "orders",
            vec![ColumnConfig::pk("id"), ColumnConfig::new("total")],
        );
        assert_eq!(
            table.select_columns(),
            vec![Column::named("id"), Column::named("total")]
        );
        assert_eq!(table.primary_key().map(|c| c.name.as_str()), Some("id"));
    }
}
