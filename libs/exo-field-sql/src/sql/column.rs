// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::SqlValue;

use super::{ExpressionBuilder, SQLBuilder};

/// A column-like concept covering any usage where a database table column could be used. For
/// example, in a predicate you can say `first_name = 'Sam'` or `first_name = last_name`. Here,
/// first_name, last_name, and `'Sam'` all serve as columns from our perspective.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// A column of the statement's table. Rendered qualified with the table's alias (or physical
    /// name), so the same column reference works against every shard.
    Named(String),
    /// A literal value such as a string or number e.g. 'Sam'. This will be mapped to a placeholder
    /// to avoid SQL injection.
    Param(SqlValue),
    /// A parenthesized list of literal values, used as the right-hand side of `IN`
    ParamList(Vec<SqlValue>),
    /// A null value
    Null,
    /// All columns of the table
    Star,
    /// A constant integer, as in `SELECT 1 FROM ...`
    Constant(i64),
    /// `COUNT(*)`
    CountStar,
}

impl Column {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn param(value: impl Into<SqlValue>) -> Self {
        match value.into() {
            SqlValue::Null => Self::Null,
            value => Self::Param(value),
        }
    }

    pub(crate) fn is_null(&self) -> bool {
        matches!(self, Column::Null | Column::Param(SqlValue::Null))
    }
}

impl ExpressionBuilder for Column {
    fn build(&self, builder: &mut SQLBuilder) {
        match self {
            Column::Named(name) => builder.push_column(name),
            Column::Param(value) => builder.push_param(value.clone()),
            Column::ParamList(values) => {
                builder.push('(');
                builder.push_iter(values.iter(), ", ", |builder, value| {
                    builder.push_param(value.clone())
                });
                builder.push(')');
            }
            Column::Null => builder.push_str("NULL"),
            Column::Star => builder.push('*'),
            Column::Constant(value) => builder.push_str(value.to_string()),
            Column::CountStar => builder.push_str("COUNT(*)"),
        }
    }
}
