// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::SqlValue;

use super::{ExpressionBuilder, SQLBuilder, column::Column};

/// Case sensitivity for string predicates.
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum CaseSensitivity {
    Sensitive,
    Insensitive,
}

/// A predicate is a boolean expression that can be used in a WHERE clause.
#[derive(Debug, PartialEq, Clone)]
pub enum Predicate {
    True,
    False,
    Eq(Column, Column),
    Neq(Column, Column),
    Lt(Column, Column),
    Lte(Column, Column),
    Gt(Column, Column),
    Gte(Column, Column),
    In(Column, Column),

    // string predicates
    StringLike(Column, Column, CaseSensitivity),
    StringStartsWith(Column, Column),
    StringEndsWith(Column, Column),

    // Prefer Predicate::and(), which simplifies the clause
    And(Box<Predicate>, Box<Predicate>),
    // Prefer Predicate::or(), which simplifies the clause
    Or(Box<Predicate>, Box<Predicate>),
    // Prefer `!predicate`, which simplifies the clause
    Not(Box<Predicate>),
}

/// An ordered list of predicates, implicitly joined by `AND`. Merging two lists concatenates them;
/// duplicates are kept.
pub type Expressions = Vec<Predicate>;

impl Predicate {
    /// Compare two columns and reduce to a simpler predicate if possible.
    pub fn eq(lhs: Column, rhs: Column) -> Predicate {
        if lhs == rhs {
            Predicate::True
        } else {
            match (&lhs, &rhs) {
                // Two distinct literals can never be equal
                (Column::Param(_), Column::Param(_)) => Predicate::False,
                _ => Predicate::Eq(lhs, rhs),
            }
        }
    }

    /// Compare two columns and reduce to a simpler predicate if possible
    pub fn neq(lhs: Column, rhs: Column) -> Predicate {
        !Self::eq(lhs, rhs)
    }

    /// Membership in a list of values. An empty list matches nothing.
    pub fn in_list(lhs: Column, values: Vec<SqlValue>) -> Predicate {
        if values.is_empty() {
            Predicate::False
        } else {
            Predicate::In(lhs, Column::ParamList(values))
        }
    }

    /// Logical and of two predicates, reducing to a simpler predicate if possible.
    pub fn and(lhs: Predicate, rhs: Predicate) -> Predicate {
        match (lhs, rhs) {
            (Predicate::False, _) | (_, Predicate::False) => Predicate::False,
            (Predicate::True, rhs) => rhs,
            (lhs, Predicate::True) => lhs,
            (lhs, rhs) if lhs == rhs => lhs,
            (lhs, rhs) => Predicate::And(Box::new(lhs), Box::new(rhs)),
        }
    }

    /// Logical or of two predicates, reducing to a simpler predicate if possible.
    pub fn or(lhs: Predicate, rhs: Predicate) -> Predicate {
        match (lhs, rhs) {
            (Predicate::True, _) | (_, Predicate::True) => Predicate::True,
            (Predicate::False, rhs) => rhs,
            (lhs, Predicate::False) => lhs,
            (lhs, rhs) if lhs == rhs => lhs,
            (lhs, rhs) => Predicate::Or(Box::new(lhs), Box::new(rhs)),
        }
    }
}

impl From<bool> for Predicate {
    fn from(b: bool) -> Predicate {
        if b { Predicate::True } else { Predicate::False }
    }
}

impl std::ops::Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Self::Output {
        match self {
            // Reduced to a simpler form when possible, else fall back to Predicate::Not
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Eq(lhs, rhs) => Predicate::Neq(lhs, rhs),
            Predicate::Neq(lhs, rhs) => Predicate::Eq(lhs, rhs),
            Predicate::Lt(lhs, rhs) => Predicate::Gte(lhs, rhs),
            Predicate::Lte(lhs, rhs) => Predicate::Gt(lhs, rhs),
            Predicate::Gt(lhs, rhs) => Predicate::Lte(lhs, rhs),
            Predicate::Gte(lhs, rhs) => Predicate::Lt(lhs, rhs),
            predicate => Predicate::Not(Box::new(predicate)),
        }
    }
}

impl ExpressionBuilder for Predicate {
    /// Build a predicate into a SQL string.
    fn build(&self, builder: &mut SQLBuilder) {
        match &self {
            Predicate::True => builder.push_str("TRUE"),
            Predicate::False => builder.push_str("FALSE"),
            Predicate::Eq(column1, column2) => {
                if column2.is_null() {
                    column1.build(builder);
                    builder.push_str(" IS NULL");
                } else {
                    relational_combine(column1, column2, "=", builder)
                }
            }
            Predicate::Neq(column1, column2) => {
                if column2.is_null() {
                    column1.build(builder);
                    builder.push_str(" IS NOT NULL");
                } else {
                    relational_combine(column1, column2, "<>", builder)
                }
            }
            Predicate::Lt(column1, column2) => relational_combine(column1, column2, "<", builder),
            Predicate::Lte(column1, column2) => {
                relational_combine(column1, column2, "<=", builder)
            }
            Predicate::Gt(column1, column2) => relational_combine(column1, column2, ">", builder),
            Predicate::Gte(column1, column2) => {
                relational_combine(column1, column2, ">=", builder)
            }
            Predicate::In(column1, column2) => relational_combine(column1, column2, "IN", builder),
            Predicate::StringLike(column1, column2, case_sensitivity) => relational_combine(
                column1,
                column2,
                if *case_sensitivity == CaseSensitivity::Insensitive {
                    "ILIKE"
                } else {
                    "LIKE"
                },
                builder,
            ),
            // we use the postgres concat operator (||) in order to handle both literals and column references
            Predicate::StringStartsWith(column1, column2) => {
                column1.build(builder);
                builder.push_str(" LIKE ");
                column2.build(builder);
                builder.push_str(" || '%'");
            }
            Predicate::StringEndsWith(column1, column2) => {
                column1.build(builder);
                builder.push_str(" LIKE '%' || ");
                column2.build(builder);
            }
            Predicate::And(predicate1, predicate2) => {
                logical_combine(predicate1, predicate2, "AND", builder)
            }
            Predicate::Or(predicate1, predicate2) => {
                logical_combine(predicate1, predicate2, "OR", builder)
            }
            Predicate::Not(predicate) => {
                builder.push_str("NOT(");
                predicate.build(builder);
                builder.push(')');
            }
        }
    }
}

/// Push ` WHERE <p1> AND <p2> ...` for a predicate list. `TRUE` entries are dropped and nothing
/// is pushed if none remain.
pub(super) fn build_where(expressions: &[Predicate], builder: &mut SQLBuilder) {
    let effective: Vec<&Predicate> = expressions
        .iter()
        .filter(|predicate| **predicate != Predicate::True)
        .collect();

    if effective.is_empty() {
        return;
    }

    builder.push_str(" WHERE ");
    builder.push_iter(effective.into_iter(), " AND ", |builder, predicate| {
        predicate.build(builder)
    });
}

/// Combine two expressions with a relational operator.
fn relational_combine<E1: ExpressionBuilder, E2: ExpressionBuilder>(
    left: &E1,
    right: &E2,
    op: &'static str,
    builder: &mut SQLBuilder,
) {
    left.build(builder);
    builder.push_space();
    builder.push_str(op);
    builder.push_space();
    right.build(builder);
}

/// Combine two expressions with a logical binary operator.
fn logical_combine<E1: ExpressionBuilder, E2: ExpressionBuilder>(
    left: &E1,
    right: &E2,
    op: &'static str,
    builder: &mut SQLBuilder,
) {
    builder.push('(');
    left.build(builder);
    builder.push_space();
    builder.push_str(op);
    builder.push_space();
    right.build(builder);
    builder.push(')');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qualified(predicate: &Predicate) -> (String, Vec<SqlValue>) {
        let mut builder = SQLBuilder::new();
        builder.with_qualifier("people", |builder| predicate.build(builder));
        builder.into_sql()
    }

    #[test]
    fn true_predicate() {
        assert_binding!(Predicate::True.to_sql(), "TRUE");
    }

    #[test]
    fn eq_predicate() {
        let predicate = Predicate::Eq(Column::named("age"), Column::param(5_i64));
        assert_binding!(qualified(&predicate), r#""people"."age" = $1"#, 5_i64);
    }

    #[test]
    fn eq_null_predicate() {
        let predicate = Predicate::eq(Column::named("deleted_at"), Column::param(None::<i64>));
        assert_binding!(qualified(&predicate), r#""people"."deleted_at" IS NULL"#);

        assert_binding!(
            qualified(&!predicate),
            r#""people"."deleted_at" IS NOT NULL"#
        );
    }

    #[test]
    fn literal_reduction() {
        assert_eq!(
            Predicate::eq(Column::param(1_i64), Column::param(1_i64)),
            Predicate::True
        );
        assert_eq!(
            Predicate::eq(Column::param(1_i64), Column::param(2_i64)),
            Predicate::False
        );
        assert_eq!(
            Predicate::in_list(Column::named("id"), vec![]),
            Predicate::False
        );
    }

    #[test]
    fn and_predicate() {
        let name_predicate = Predicate::Eq(Column::named("name"), Column::param("foo"));
        let age_predicate = Predicate::Eq(Column::named("age"), Column::param(5_i64));

        let predicate = Predicate::and(name_predicate, age_predicate);

        assert_binding!(
            qualified(&predicate),
            r#"("people"."name" = $1 AND "people"."age" = $2)"#,
            "foo",
            5_i64
        );
    }

    #[test]
    fn string_predicates() {
        let title = || Column::named("title");
        let value = || Column::param("utawaku");

        assert_binding!(
            qualified(&Predicate::StringLike(
                title(),
                value(),
                CaseSensitivity::Insensitive
            )),
            r#""people"."title" ILIKE $1"#,
            "utawaku"
        );
        assert_binding!(
            qualified(&Predicate::StringStartsWith(title(), value())),
            r#""people"."title" LIKE $1 || '%'"#,
            "utawaku"
        );
        assert_binding!(
            qualified(&Predicate::StringEndsWith(title(), value())),
            r#""people"."title" LIKE '%' || $1"#,
            "utawaku"
        );
    }

    #[test]
    fn where_clause_keeps_duplicates() {
        let id = Predicate::Eq(Column::named("id"), Column::param(3_i64));
        let mut builder = SQLBuilder::new();
        build_where(&[id.clone(), Predicate::True, id], &mut builder);

        assert_binding!(
            builder.into_sql(),
            r#" WHERE "id" = $1 AND "id" = $2"#,
            3_i64,
            3_i64
        );
    }

    #[test]
    fn where_clause_omitted_when_trivial() {
        let mut builder = SQLBuilder::new();
        build_where(&[Predicate::True], &mut builder);

        assert_binding!(builder.into_sql(), "");
    }
}
