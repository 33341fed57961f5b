// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;

use crate::{
    database_error::DatabaseError,
    value::{FromSqlValue, Record, SqlValue},
};

/// A result row keyed by column name, in the order the columns were selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: IndexMap<String, SqlValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.columns.insert(column.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        self.columns.insert(column.into(), value);
    }

    pub fn value(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(column)
    }

    /// Decode a column. A missing column is an error, a present `NULL` decodes into `Option`.
    pub fn get<T: FromSqlValue>(&self, column: &str) -> Result<T, DatabaseError> {
        let value = self
            .columns
            .get(column)
            .cloned()
            .ok_or_else(|| DatabaseError::Decode(format!("no column named `{column}`")))?;

        T::from_sql_value(value)
            .map_err(|e| e.with_context(format!("While decoding column `{column}`:")))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keep only the named columns, in the given order. Unknown names are skipped.
    pub fn project(&self, columns: &[&str]) -> Row {
        Row {
            columns: columns
                .iter()
                .filter_map(|name| {
                    self.columns
                        .get(*name)
                        .map(|value| (name.to_string(), value.clone()))
                })
                .collect(),
        }
    }
}

impl From<Record> for Row {
    fn from(columns: Record) -> Self {
        Self { columns }
    }
}

impl From<Row> for Record {
    fn from(row: Row) -> Self {
        row.columns
    }
}

/// Decode a [`Row`] into a caller-defined type. Destination collections for list and
/// pagination results are `Vec<T>` of such types.
pub trait FromRow: Sized {
    fn from_row(row: Row) -> Result<Self, DatabaseError>;
}

impl FromRow for Row {
    fn from_row(row: Row) -> Result<Self, DatabaseError> {
        Ok(row)
    }
}

impl FromRow for Record {
    fn from_row(row: Row) -> Result<Self, DatabaseError> {
        Ok(row.columns)
    }
}

#[cfg(feature = "pool")]
impl TryFrom<&tokio_postgres::Row> for Row {
    type Error = DatabaseError;

    fn try_from(pg_row: &tokio_postgres::Row) -> Result<Self, Self::Error> {
        let mut row = Row::new();
        for (index, column) in pg_row.columns().iter().enumerate() {
            let value: SqlValue = pg_row.try_get(index)?;
            row.insert(column.name(), value);
        }
        Ok(row)
    }
}
