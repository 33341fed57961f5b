// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{
    ExpressionBuilder, SQLBuilder,
    predicate::{Expressions, build_where},
    statement::TableRef,
};

/// A `SELECT COUNT(*)` over the rows matching the predicates
#[derive(Debug, Clone, PartialEq)]
pub struct Count {
    pub table: TableRef,
    pub predicates: Expressions,
}

impl ExpressionBuilder for Count {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.with_qualifier(self.table.qualifier(), |builder| {
            builder.push_str("SELECT COUNT(*) FROM ");
            self.table.build(builder);
            build_where(&self.predicates, builder);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{Column, Predicate};

    #[test]
    fn count_with_predicate() {
        let count = Count {
            table: TableRef::new("orders_1", None),
            predicates: vec![Predicate::Eq(Column::named("status"), Column::param("paid"))],
        };

        assert_binding!(
            count.to_sql(),
            r#"SELECT COUNT(*) FROM "orders_1" WHERE "orders_1"."status" = $1"#,
            "paid"
        );
    }
}
