// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{ExpressionBuilder, SQLBuilder};

#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum Ordering {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByElement(pub String, pub Ordering);

/// Caller-supplied ordering. There is no implicit default: without an ordering, the order of
/// paginated results across repeated calls is whatever the database returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBy(pub Vec<OrderByElement>);

impl OrderByElement {
    pub fn new(column: impl Into<String>, ordering: Ordering) -> Self {
        Self(column.into(), ordering)
    }
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self(vec![OrderByElement::new(column, Ordering::Asc)])
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self(vec![OrderByElement::new(column, Ordering::Desc)])
    }

    pub fn then(mut self, column: impl Into<String>, ordering: Ordering) -> Self {
        self.0.push(OrderByElement::new(column, ordering));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ExpressionBuilder for OrderByElement {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_column(&self.0);
        builder.push_space();

        if self.1 == Ordering::Asc {
            builder.push_str("ASC");
        } else {
            builder.push_str("DESC");
        }
    }
}

impl ExpressionBuilder for OrderBy {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("ORDER BY ");
        builder.push_elems(&self.0, ", ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single() {
        let order_by = OrderBy::desc("age");

        let mut builder = SQLBuilder::new();
        builder.with_qualifier("people", |builder| order_by.build(builder));

        assert_binding!(builder.into_sql(), r#"ORDER BY "people"."age" DESC"#);
    }

    #[test]
    fn multiple() {
        {
            let order_by = OrderBy::asc("name").then("age", Ordering::Desc);
            assert_binding!(order_by.to_sql(), r#"ORDER BY "name" ASC, "age" DESC"#);
        }

        // Reverse the order and it should be reflected in the statement
        {
            let order_by = OrderBy::desc("age").then("name", Ordering::Asc);
            assert_binding!(order_by.to_sql(), r#"ORDER BY "age" DESC, "name" ASC"#);
        }
    }
}
