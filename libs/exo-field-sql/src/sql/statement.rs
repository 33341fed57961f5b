// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{Count, Delete, ExpressionBuilder, Insert, SQLBuilder, Select, Update};

/// The physical table a statement runs against, with an optional alias used to qualify columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            name: name.into(),
            alias,
        }
    }

    /// The name columns are qualified with: the alias if there is one, else the table name
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl ExpressionBuilder for TableRef {
    /// Build expression of the form `"name"` or `"name" AS "alias"`
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_identifier(&self.name);
        if let Some(alias) = &self.alias {
            builder.push_str(" AS ");
            builder.push_identifier(alias);
        }
    }
}

/// An abstract statement, ready to be rendered by an execution handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Select(Select),
    Count(Count),
}

impl Statement {
    pub fn table(&self) -> &TableRef {
        match self {
            Statement::Insert(insert) => &insert.table,
            Statement::Update(update) => &update.table,
            Statement::Delete(delete) => &delete.table,
            Statement::Select(select) => &select.table,
            Statement::Count(count) => &count.table,
        }
    }
}

macro_rules! into_statement {
    ($($kind:ident),*) => {
        $(
            impl From<$kind> for Statement {
                fn from(statement: $kind) -> Self {
                    Statement::$kind(statement)
                }
            }
        )*
    };
}

into_statement!(Insert, Update, Delete, Select, Count);

impl ExpressionBuilder for Statement {
    fn build(&self, builder: &mut SQLBuilder) {
        match self {
            Statement::Insert(insert) => insert.build(builder),
            Statement::Update(update) => update.build(builder),
            Statement::Delete(delete) => delete.build(builder),
            Statement::Select(select) => select.build(builder),
            Statement::Count(count) => count.build(builder),
        }
    }
}
