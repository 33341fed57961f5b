// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::Record;

use super::{ExpressionBuilder, SQLBuilder, statement::TableRef};

/// An insert operation for a single row.
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    /// The table to insert into. Any alias is ignored.
    pub table: TableRef,
    /// The column values to insert such as `{age: 30, name: "John"}`
    pub values: Record,
    /// The column to return, typically the primary key
    pub returning: Option<String>,
}

impl ExpressionBuilder for Insert {
    /// Build the insert statement for the form `INSERT INTO <table> (<columns>) VALUES (<values>)
    /// RETURNING <returning-column>`. The `RETURNING` clause is omitted if there is no column to
    /// return.
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("INSERT INTO ");
        builder.push_identifier(&self.table.name);

        if self.values.is_empty() {
            // Every column takes its default
            builder.push_str(" DEFAULT VALUES");
        } else {
            builder.push_str(" (");
            builder.push_iter(self.values.keys(), ", ", |builder, column| {
                builder.push_identifier(column);
            });

            builder.push_str(") VALUES (");
            builder.push_iter(self.values.values(), ", ", |builder, value| {
                builder.push_param(value.clone());
            });
            builder.push(')');
        }

        if let Some(returning) = &self.returning {
            builder.push_str(" RETURNING ");
            builder.push_identifier(returning);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqlValue;

    #[test]
    fn insert_with_returning() {
        let insert = Insert {
            table: TableRef::new("people", Some("p".into())),
            values: Record::from_iter([
                ("name".to_string(), SqlValue::from("Sam")),
                ("age".to_string(), SqlValue::from(30_i64)),
            ]),
            returning: Some("id".into()),
        };

        assert_binding!(
            insert.to_sql(),
            r#"INSERT INTO "people" ("name", "age") VALUES ($1, $2) RETURNING "id""#,
            "Sam",
            30_i64
        );
    }

    #[test]
    fn insert_defaults() {
        let insert = Insert {
            table: TableRef::new("people", None),
            values: Record::new(),
            returning: None,
        };

        assert_binding!(insert.to_sql(), r#"INSERT INTO "people" DEFAULT VALUES"#);
    }
}
