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

/// A delete operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub table: TableRef,
    /// An empty list deletes every row.
    pub predicates: Expressions,
}

impl ExpressionBuilder for Delete {
    /// Build the delete statement for the form `DELETE FROM <table> WHERE <predicates>`
    fn build(&self, builder: &mut SQLBuilder) {
        builder.with_qualifier(self.table.qualifier(), |builder| {
            builder.push_str("DELETE FROM ");
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
    fn delete_with_predicate() {
        let delete = Delete {
            table: TableRef::new("sessions_3", None),
            predicates: vec![Predicate::Lt(
                Column::named("expires_at"),
                Column::param(100_i64),
            )],
        };

        assert_binding!(
            delete.to_sql(),
            r#"DELETE FROM "sessions_3" WHERE "sessions_3"."expires_at" < $1"#,
            100_i64
        );
    }
}
