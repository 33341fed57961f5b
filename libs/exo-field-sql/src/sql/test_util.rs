// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

#![cfg(test)]

//! Test assertion to check SQL statements and parameters.

/// Assert that rendered SQL and its bound parameters match.
///
/// # Usage:
/// ```no_run
/// assert_binding!(stmt.to_sql(), r#"SELECT * FROM "orders" WHERE "orders"."id" = $1"#, 5_i64);
/// ```
///
/// Each expected parameter is converted with `SqlValue::from`, so plain Rust literals work.
macro_rules! assert_binding {
    ($actual:expr, $expected_stmt:expr) => {
        let (actual_stmt, actual_params) = $actual;
        assert_eq!(actual_stmt, $expected_stmt);
        assert!(actual_params.is_empty(), "Extra actual parameters: {:?}", actual_params);
    };
    ($actual:expr, $expected_stmt:expr, $($expected_param:expr),+ $(,)?) => {
        let (actual_stmt, actual_params) = $actual;
        assert_eq!(actual_stmt, $expected_stmt);
        let expected_params: Vec<$crate::SqlValue> =
            vec![$($crate::SqlValue::from($expected_param)),+];
        assert_eq!(actual_params, expected_params, "Parameter mismatch");
    };
}
