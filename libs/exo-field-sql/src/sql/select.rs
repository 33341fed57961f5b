// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{
    ExpressionBuilder, Limit, Offset, SQLBuilder, column::Column, order::OrderBy,
    predicate::{Expressions, build_where},
    statement::TableRef,
};

/// A select statement
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    /// The table to select from
    pub table: TableRef,
    /// The columns to select
    pub columns: Vec<Column>,
    /// The predicates to filter the rows (joined with `AND`)
    pub predicates: Expressions,
    /// The order by clause
    pub order_by: Option<OrderBy>,
    /// The offset clause
    pub offset: Option<Offset>,
    /// The limit clause
    pub limit: Option<Limit>,
}

impl ExpressionBuilder for Select {
    /// Build the select statement for the form `SELECT <columns> FROM <table> WHERE <predicates>
    /// ORDER BY <order-by> LIMIT <limit> OFFSET <offset>`. Each clause is omitted when not set.
    fn build(&self, builder: &mut SQLBuilder) {
        builder.with_qualifier(self.table.qualifier(), |builder| {
            builder.push_str("SELECT ");
            builder.push_elems(&self.columns, ", ");

            builder.push_str(" FROM ");
            self.table.build(builder);

            build_where(&self.predicates, builder);

            if let Some(order_by) = &self.order_by {
                if !order_by.is_empty() {
                    builder.push_space();
                    order_by.build(builder);
                }
            }
            if let Some(limit) = &self.limit {
                builder.push_space();
                limit.build(builder);
            }
            if let Some(offset) = &self.offset {
                builder.push_space();
                offset.build(builder);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::Predicate;

    #[test]
    fn full_select() {
        let select = Select {
            table: TableRef::new("orders_2024", Some("o".into())),
            columns: vec![Column::named("id"), Column::named("total")],
            predicates: vec![Predicate::Gt(Column::named("total"), Column::param(10_i64))],
            order_by: Some(OrderBy::asc("id")),
            offset: Some(Offset(20)),
            limit: Some(Limit(10)),
        };

        assert_binding!(
            select.to_sql(),
            r#"SELECT "o"."id", "o"."total" FROM "orders_2024" AS "o" WHERE "o"."total" > $1 ORDER BY "o"."id" ASC LIMIT $2 OFFSET $3"#,
            10_i64,
            10_i64,
            20_i64
        );
    }

    #[test]
    fn bare_select() {
        let select = Select {
            table: TableRef::new("orders", None),
            columns: vec![Column::Star],
            predicates: vec![],
            order_by: Some(OrderBy::default()),
            offset: None,
            limit: None,
        };

        assert_binding!(select.to_sql(), r#"SELECT * FROM "orders""#);
    }
}
