// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Postgres rendering of abstract statements.
//!
//! Statements are plain data. Each constituent implements [`ExpressionBuilder`], which renders
//! it into a [`SQLBuilder`] as SQL text with `$n` placeholders plus the values to bind.

#[macro_use]
#[cfg(test)]
mod test_util;

mod column;
mod count;
mod delete;
mod expression_builder;
mod insert;
mod limit;
mod offset;
mod order;
mod predicate;
mod select;
mod sql_builder;
mod statement;
mod update;

pub use column::Column;
pub use count::Count;
pub use delete::Delete;
pub use expression_builder::ExpressionBuilder;
pub use insert::Insert;
pub use limit::Limit;
pub use offset::Offset;
pub use order::{OrderBy, OrderByElement, Ordering};
pub use predicate::{CaseSensitivity, Expressions, Predicate};
pub use select::Select;
pub use sql_builder::SQLBuilder;
pub use statement::{Statement, TableRef};
pub use update::Update;
