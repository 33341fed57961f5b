// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Fields: named, independently computed contributions to a statement.
//!
//! A [`Field`] may carry a value producer (its part of an INSERT/UPDATE payload), a where
//! producer (its part of the WHERE clause), or both, plus a [`Schema`] its value is validated
//! against. Field definitions are built once and reused; the middleware pipeline always works on
//! a clone, so steps never leak changes back into the caller's [`Fields`].

mod producer;
mod schema;

use std::{fmt::Debug, sync::Arc};

pub use producer::{Data, FieldContext, Flatten, ValueProducer, WhereProducer};
pub use schema::Schema;

use producer::{ConstantValue, ConstantWhere, ValueFn, WhereFn};

use crate::{
    SqlValue,
    database_error::DatabaseError,
    sql::{Column, Expressions, Predicate},
};

#[derive(Clone)]
pub struct Field {
    name: String,
    value: Option<Arc<dyn ValueProducer>>,
    filter: Option<Arc<dyn WhereProducer>>,
    schema: Schema,
}

impl Field {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            filter: None,
            schema: Schema::default(),
        }
    }

    /// A field that sets `name` to a fixed value
    pub fn set(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        let name = name.into();
        let data = Data::single(name.clone(), value);
        Self::new(name).with_value(ConstantValue(data))
    }

    /// A field that filters on `name = value` (`IS NULL` for a null value)
    pub fn eq(name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        let name = name.into();
        let predicate = Predicate::eq(Column::named(name.clone()), Column::param(value));
        Self::new(name).with_where(ConstantWhere(vec![predicate]))
    }

    /// A field that contributes fixed predicates
    pub fn when(name: impl Into<String>, predicates: Expressions) -> Self {
        Self::new(name).with_where(ConstantWhere(predicates))
    }

    pub fn with_value(mut self, producer: impl ValueProducer + 'static) -> Self {
        self.value = Some(Arc::new(producer));
        self
    }

    pub fn with_where(mut self, producer: impl WhereProducer + 'static) -> Self {
        self.filter = Some(Arc::new(producer));
        self
    }

    /// Like [`Field::with_value`], for a closure
    pub fn value_fn<F>(self, producer: F) -> Self
    where
        F: Fn(&FieldContext<'_>) -> Result<Option<Data>, DatabaseError> + Send + Sync + 'static,
    {
        self.with_value(ValueFn(producer))
    }

    /// Like [`Field::with_where`], for a closure
    pub fn where_fn<F>(self, producer: F) -> Self
    where
        F: Fn(&FieldContext<'_>) -> Result<Expressions, DatabaseError> + Send + Sync + 'static,
    {
        self.with_where(WhereFn(producer))
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn has_where(&self) -> bool {
        self.filter.is_some()
    }

    /// Run the value producer. A field without one produces nothing.
    pub fn produce_value(&self, ctx: &FieldContext<'_>) -> Result<Option<Data>, DatabaseError> {
        match &self.value {
            Some(producer) => producer.produce(ctx),
            None => Ok(None),
        }
    }

    /// Run the where producer. A field without one produces no predicates.
    pub fn produce_where(&self, ctx: &FieldContext<'_>) -> Result<Expressions, DatabaseError> {
        match &self.filter {
            Some(producer) => producer.produce(ctx),
            None => Ok(vec![]),
        }
    }
}

impl Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("value", &self.value.is_some())
            .field("where", &self.filter.is_some())
            .field("schema", &self.schema)
            .finish()
    }
}

/// An ordered set of fields. Order matters: a later field overrides an earlier one when both
/// produce a value for the same column.
#[derive(Debug, Clone, Default)]
pub struct Fields(Vec<Field>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: Field) -> Self {
        self.0.push(field);
        self
    }

    pub fn push(&mut self, field: Field) {
        self.0.push(field);
    }

    /// Concatenate another set after this one
    pub fn extend(&mut self, other: Fields) {
        self.0.extend(other.0);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The last field with the given name
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.0.iter().rev().find(|field| field.name == name)
    }

    /// The last field with the given name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.0.iter_mut().rev().find(|field| field.name == name)
    }

    /// Remove every field with the given name, returning how many were removed
    pub fn remove(&mut self, name: &str) -> usize {
        let before = self.0.len();
        self.0.retain(|field| field.name != name);
        before - self.0.len()
    }
}

impl From<Vec<Field>> for Fields {
    fn from(fields: Vec<Field>) -> Self {
        Self(fields)
    }
}

impl FromIterator<Field> for Fields {
    fn from_iter<T: IntoIterator<Item = Field>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Fields {
    type Item = Field;
    type IntoIter = std::vec::IntoIter<Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{middleware::Scene, table::TableConfig};

    #[test]
    fn absent_producers_contribute_nothing() {
        let table = TableConfig::new("orders", vec![]);
        let ctx = FieldContext::new(&table, Scene::List);
        let field = Field::new("note");

        assert!(field.produce_value(&ctx).unwrap().is_none());
        assert!(field.produce_where(&ctx).unwrap().is_empty());
    }

    #[test]
    fn producers_see_physical_table() {
        let table = TableConfig::new("orders", vec![]).with_physical_name("orders_7");
        let ctx = FieldContext::new(&table, Scene::Insert);
        let field = Field::new("shard").value_fn(|ctx| {
            Ok(Some(Data::single("shard", ctx.table.physical_name())))
        });

        let data = field.produce_value(&ctx).unwrap();
        assert!(matches!(
            data,
            Some(Data::Record(record)) if record["shard"] == SqlValue::from("orders_7")
        ));
    }

    #[test]
    fn clone_owns_schema() {
        let original = Fields::new().with(Field::set("age", 3_i64));
        let mut copy = original.clone();
        copy.get_mut("age").unwrap().schema_mut().required = true;

        assert!(!original.get("age").unwrap().schema().required);
        assert!(copy.get("age").unwrap().schema().required);
    }

    #[test]
    fn get_returns_last_and_remove_drops_all() {
        let mut fields = Fields::new()
            .with(Field::set("a", 1_i64))
            .with(Field::eq("a", 2_i64).with_schema(Schema::new().required()))
            .with(Field::set("b", 3_i64));

        assert!(fields.get("a").unwrap().has_where());
        assert_eq!(fields.remove("a"), 2);
        assert_eq!(fields.len(), 1);
    }
}
