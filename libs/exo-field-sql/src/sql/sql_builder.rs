// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::SqlValue;

use super::ExpressionBuilder;

pub struct SQLBuilder {
    /// The SQL being built with placeholders for each parameter
    sql: String,
    /// The list of parameters
    params: Vec<SqlValue>,
    /// The table name or alias that columns are qualified with, i.e. "table"."col"
    qualifier: Option<String>,
    /// Indicates if column name should be rendered with the qualifier instead of just "col"
    /// (the column list of INSERT and the SET clause of UPDATE must not be qualified)
    fully_qualify_column_names: bool,
}

impl Default for SQLBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SQLBuilder {
    pub fn new() -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            qualifier: None,
            fully_qualify_column_names: true,
        }
    }

    /// Push a string
    pub fn push_str<T: AsRef<str>>(&mut self, s: T) {
        self.sql.push_str(s.as_ref());
    }

    /// Push a character
    pub fn push(&mut self, c: char) {
        self.sql.push(c);
    }

    /// Push a string surrounded by double quotes. Useful for identifier such as table names, column
    /// names, etc. Without the quotes, the identifier with uppercase letters will be interpreted
    /// the same as the identifier with lowercase letters. Embedded quotes are doubled.
    pub fn push_identifier<T: AsRef<str>>(&mut self, s: T) {
        self.sql.push('"');
        self.sql.push_str(&s.as_ref().replace('"', "\"\""));
        self.sql.push('"');
    }

    /// Push a column. Push `<qualifier>.<column_name>` if in fully_qualify_column_names mode and a
    /// qualifier is set, otherwise just `<column_name>`.
    pub fn push_column<T: AsRef<str>>(&mut self, column_name: T) {
        if self.fully_qualify_column_names {
            if let Some(qualifier) = self.qualifier.clone() {
                self.push_identifier(qualifier);
                self.push('.');
            }
        }
        self.push_identifier(column_name);
    }

    /// Push a space. This is a common operation, so it is provided as a separate method.
    pub fn push_space(&mut self) {
        self.sql.push(' ');
    }

    /// Push a parameter, which will be replaced with a placeholder in the SQL string
    /// and the parameter will be added to the list of parameters.
    pub fn push_param(&mut self, param: SqlValue) {
        self.params.push(param);
        self.push('$');
        self.push_str(self.params.len().to_string());
    }

    /// Push elements of an iterator, separated by `sep`. The `push_elem` function provides
    /// the flexibility to map the elements (compared to [`SQLBuilder::push_elems`], which assumes that
    /// the elements implement [`ExpressionBuilder`] and [`build`](ExpressionBuilder::build) is all you need to call).
    pub fn push_iter<T>(
        &mut self,
        iter: impl ExactSizeIterator<Item = T>,
        sep: &str,
        push_elem: impl Fn(&mut Self, T),
    ) {
        let len = iter.len();
        for (i, item) in iter.enumerate() {
            push_elem(self, item);

            if i < len - 1 {
                self.sql.push_str(sep);
            }
        }
    }

    /// Push elements of a slice, separated by `sep`. The elements must themselves implement
    /// `ExpressionBuilder`.
    pub fn push_elems<T: ExpressionBuilder>(&mut self, elems: &[T], sep: &str) {
        self.push_iter(elems.iter(), sep, |builder, elem| {
            elem.build(builder);
        });
    }

    /// Get the SQL string and the list of parameters. Calling this method should be the final step
    /// in building an SQL expression, and thus this builder consumes the `self`.
    pub fn into_sql(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }

    /// Execute the given function with columns qualified by `qualifier`, restoring the previous
    /// qualifier afterwards.
    pub fn with_qualifier<F, R>(&mut self, qualifier: &str, func: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let previous = self.qualifier.replace(qualifier.to_string());
        let ret = func(self);
        self.qualifier = previous;
        ret
    }

    /// Execute the given function with the [`Self::fully_qualify_column_names`] flag set to false.
    pub fn without_fully_qualified_column_names<F, R>(&mut self, func: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        let cur_fully_qualify_column_names = self.fully_qualify_column_names;
        self.fully_qualify_column_names = false;
        let ret = func(self);
        self.fully_qualify_column_names = cur_fully_qualify_column_names;
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_are_numbered() {
        let mut builder = SQLBuilder::new();
        builder.push_param(SqlValue::Int(1));
        builder.push_str(", ");
        builder.push_param(SqlValue::Text("a".into()));

        assert_binding!(builder.into_sql(), "$1, $2", 1_i64, "a");
    }

    #[test]
    fn qualifier_is_scoped() {
        let mut builder = SQLBuilder::new();
        builder.with_qualifier("orders", |builder| {
            builder.push_column("id");
            builder.push_space();
            builder.without_fully_qualified_column_names(|builder| builder.push_column("id"));
        });
        builder.push_space();
        builder.push_column("id");

        assert_binding!(builder.into_sql(), r#""orders"."id" "id" "id""#);
    }

    #[test]
    fn identifiers_escape_quotes() {
        let mut builder = SQLBuilder::new();
        builder.push_identifier(r#"we"ird"#);

        assert_binding!(builder.into_sql(), r#""we""ird""#);
    }
}
