// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::Record;

use super::{
    ExpressionBuilder, SQLBuilder,
    predicate::{Expressions, build_where},
    statement::TableRef,
};

/// An update operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// The table to update.
    pub table: TableRef,
    /// The predicates to filter rows to update. An empty list updates every row.
    pub predicates: Expressions,
    /// The columns to update and their values.
    pub values: Record,
}

impl ExpressionBuilder for Update {
    /// Build the update statement for the form `UPDATE <table> SET <column = value, ...> WHERE
    /// <predicates>`. The `WHERE` is omitted if there are no effective predicates.
    fn build(&self, builder: &mut SQLBuilder) {
        builder.with_qualifier(self.table.qualifier(), |builder| {
            builder.push_str("UPDATE ");
            self.table.build(builder);

            builder.push_str(" SET ");
            builder.push_iter(self.values.iter(), ", ", |builder, (column, value)| {
                builder.without_fully_qualified_column_names(|builder| {
                    builder.push_column(column);
                });

                builder.push_str(" = ");
                builder.push_param(value.clone());
            });

            build_where(&self.predicates, builder);
        })
    }
}
