// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A table bound to its middleware pipeline.
//!
//! Every operation resolves the table's execution handler first (so configuration errors never
//! reach the backend), runs the pipeline for its [`Scene`] on a copy of the caller's fields,
//! builds the statement and hands it to the handler.

use tracing::instrument;

use crate::{
    builder::{self, Page},
    database_error::DatabaseError,
    field::Fields,
    middleware::{Pipeline, Scene},
    row::{FromRow, Row},
    sql::{OrderBy, Statement},
    table::TableConfig,
};

#[derive(Clone, Debug)]
pub struct Model {
    table: TableConfig,
    pipeline: Pipeline,
}

impl Model {
    pub fn new(table: TableConfig) -> Self {
        Self {
            table,
            pipeline: Pipeline::default(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn table(&self) -> &TableConfig {
        &self.table
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Insert one row, returning the number of inserted rows and the new row's id
    #[instrument(skip_all, fields(table = self.table.logical_name()))]
    pub async fn insert(&self, fields: &Fields) -> Result<(u64, i64), DatabaseError> {
        let handler = self.table.handler()?;
        let fields = self.pipeline.run(Scene::Insert, &self.table, fields)?;
        let statement = builder::build_insert(&self.table, &fields)?;

        handler.insert_with_last_id(&statement.into()).await
    }

    /// Update the matching rows, returning how many were affected. Without predicates, every row
    /// is updated.
    #[instrument(skip_all, fields(table = self.table.logical_name()))]
    pub async fn update(&self, fields: &Fields) -> Result<i64, DatabaseError> {
        let handler = self.table.handler()?;
        let fields = self.pipeline.run(Scene::Update, &self.table, fields)?;
        let statement = builder::build_update(&self.table, &fields)?;

        handler.exec_with_rows_affected(&statement.into()).await
    }

    /// Delete the matching rows, returning how many were affected. Without predicates, every row
    /// is deleted.
    #[instrument(skip_all, fields(table = self.table.logical_name()))]
    pub async fn delete(&self, fields: &Fields) -> Result<i64, DatabaseError> {
        let handler = self.table.handler()?;
        let fields = self.pipeline.run(Scene::Delete, &self.table, fields)?;
        let statement = builder::build_delete(&self.table, &fields)?;

        handler.exec_with_rows_affected(&statement.into()).await
    }

    #[instrument(skip_all, fields(table = self.table.logical_name()))]
    pub async fn first<T: FromRow>(
        &self,
        fields: &Fields,
        order_by: &OrderBy,
    ) -> Result<Option<T>, DatabaseError> {
        self.table.handler()?;
        self.first_in(&self.table, fields, order_by)
            .await?
            .map(T::from_row)
            .transpose()
    }

    /// The rows on `page`, in `order_by` order. A page size of zero returns every matching row.
    #[instrument(
        skip_all,
        fields(table = self.table.logical_name(), index = page.index, size = page.size)
    )]
    pub async fn list<T: FromRow>(
        &self,
        fields: &Fields,
        order_by: &OrderBy,
        page: Page,
    ) -> Result<Vec<T>, DatabaseError> {
        let handler = self.table.handler()?;
        let fields = self.pipeline.run(Scene::List, &self.table, fields)?;
        let statement = builder::build_list(&self.table, &fields, order_by, page)?;

        decode_rows(handler.query(&statement.into()).await?)
    }

    #[instrument(skip_all, fields(table = self.table.logical_name()))]
    pub async fn total(&self, fields: &Fields) -> Result<i64, DatabaseError> {
        self.table.handler()?;
        self.total_in(&self.table, fields).await
    }

    #[instrument(skip_all, fields(table = self.table.logical_name()))]
    pub async fn exists(&self, fields: &Fields) -> Result<bool, DatabaseError> {
        self.table.handler()?;
        self.exists_in(&self.table, fields).await
    }

    // The `*_in` variants run against a physical view of the table (see
    // `TableConfig::with_physical_name`), sharing this model's handler and pipeline.

    pub(crate) async fn first_in(
        &self,
        table: &TableConfig,
        fields: &Fields,
        order_by: &OrderBy,
    ) -> Result<Option<Row>, DatabaseError> {
        let handler = table.handler()?;
        let fields = self.pipeline.run(Scene::First, table, fields)?;
        let statement = builder::build_first(table, &fields, order_by)?;

        handler.first(&statement.into()).await
    }

    pub(crate) async fn window_in(
        &self,
        table: &TableConfig,
        fields: &Fields,
        order_by: &OrderBy,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Row>, DatabaseError> {
        let handler = table.handler()?;
        let fields = self.pipeline.run(Scene::List, table, fields)?;
        let statement = builder::build_window(table, &fields, order_by, offset, limit)?;

        handler.query(&statement.into()).await
    }

    pub(crate) async fn total_in(
        &self,
        table: &TableConfig,
        fields: &Fields,
    ) -> Result<i64, DatabaseError> {
        let handler = table.handler()?;
        let fields = self.pipeline.run(Scene::Total, table, fields)?;
        let statement: Statement = builder::build_total(table, &fields)?.into();

        handler.count(&statement).await
    }

    pub(crate) async fn exists_in(
        &self,
        table: &TableConfig,
        fields: &Fields,
    ) -> Result<bool, DatabaseError> {
        let handler = table.handler()?;
        let fields = self.pipeline.run(Scene::Exists, table, fields)?;
        let statement: Statement = builder::build_exists(table, &fields)?.into();

        handler.exists(&statement).await
    }
}

pub(crate) fn decode_rows<T: FromRow>(rows: Vec<Row>) -> Result<Vec<T>, DatabaseError> {
    rows.into_iter().map(T::from_row).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        Record, SqlValue,
        field::Field,
        sql::{Column, Predicate},
        table::ColumnConfig,
        testing::MemoryHandler,
    };

    #[derive(Debug)]
    struct Person {
        name: String,
        age: i64,
    }

    impl FromRow for Person {
        fn from_row(row: Row) -> Result<Self, DatabaseError> {
            Ok(Person {
                name: row.get("name")?,
                age: row.get("age")?,
            })
        }
    }

    fn person(id: i64, name: &str, age: i64) -> Record {
        Row::new()
            .with("id", id)
            .with("name", name)
            .with("age", age)
            .into()
    }

    fn setup() -> (Arc<MemoryHandler>, Model) {
        let handler = Arc::new(MemoryHandler::new().with_table(
            "people",
            [person(1, "Sam", 30), person(2, "Alex", 25), person(3, "Kim", 41)],
        ));
        let table = TableConfig::new(
            "people",
            vec![
                ColumnConfig::pk("id"),
                ColumnConfig::new("name"),
                ColumnConfig::new("age"),
            ],
        )
        .with_handler(handler.clone());

        (handler, Model::new(table))
    }

    #[tokio::test]
    async fn insert_returns_new_id() {
        let (handler, model) = setup();
        let fields = Fields::new()
            .with(Field::set("name", "Lee"))
            .with(Field::set("age", 19_i64));

        assert_eq!(model.insert(&fields).await.unwrap(), (1, 4));
        assert_eq!(handler.rows("people")[3]["name"], SqlValue::from("Lee"));
    }

    #[tokio::test]
    async fn middleware_values_override_caller_values() {
        let (handler, model) = setup();
        let model = model.with_pipeline(Pipeline::new().with_fn(|ctx| {
            if ctx.scene().is_write() {
                ctx.push(Field::set("age", 99_i64));
            }
            ctx.next()
        }));
        let fields = Fields::new()
            .with(Field::set("age", 20_i64))
            .with(Field::eq("id", 2_i64));

        assert_eq!(model.update(&fields).await.unwrap(), 1);
        assert_eq!(handler.rows("people")[1]["age"], SqlValue::from(99_i64));
        // The caller's fields are untouched
        assert_eq!(fields.len(), 2);
    }

    #[tokio::test]
    async fn reads() {
        let (_, model) = setup();
        let adults = Fields::new().with(Field::when(
            "age",
            vec![Predicate::Gte(Column::named("age"), Column::param(30_i64))],
        ));

        let oldest: Option<Person> = model.first(&adults, &OrderBy::desc("age")).await.unwrap();
        let oldest = oldest.unwrap();
        assert_eq!((oldest.name.as_str(), oldest.age), ("Kim", 41));

        let page: Vec<Person> = model
            .list(&Fields::new(), &OrderBy::asc("age"), Page::new(1, 2))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "Kim");

        assert_eq!(model.total(&adults).await.unwrap(), 2);
        assert!(model.exists(&adults).await.unwrap());
        assert!(
            !model
                .exists(&Fields::new().with(Field::eq("name", "Nobody")))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn delete_matching() {
        let (handler, model) = setup();

        let deleted = model
            .delete(&Fields::new().with(Field::eq("name", "Sam")))
            .await
            .unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(handler.rows("people").len(), 2);
    }

    #[tokio::test]
    async fn pipeline_sees_each_scene() {
        let (_, model) = setup();
        let scenes = Arc::new(Mutex::new(vec![]));
        let recorded = scenes.clone();
        let model = model.with_pipeline(Pipeline::new().with_fn(move |ctx| {
            recorded.lock().unwrap().push(ctx.scene());
            ctx.next()
        }));
        let by_id = Fields::new().with(Field::eq("id", 1_i64));

        model.total(&by_id).await.unwrap();
        model.exists(&by_id).await.unwrap();
        model.first::<Row>(&by_id, &OrderBy::default()).await.unwrap();
        model
            .list::<Row>(&by_id, &OrderBy::default(), Page::all())
            .await
            .unwrap();

        assert_eq!(
            *scenes.lock().unwrap(),
            vec![Scene::Total, Scene::Exists, Scene::First, Scene::List]
        );
    }

    #[tokio::test]
    async fn missing_handler_fails_before_the_pipeline() {
        let calls = Arc::new(Mutex::new(0));
        let counted = calls.clone();
        let model = Model::new(TableConfig::new("people", vec![])).with_pipeline(
            Pipeline::new().with_fn(move |ctx| {
                *counted.lock().unwrap() += 1;
                ctx.next()
            }),
        );

        let err = model.total(&Fields::new()).await.unwrap_err();

        assert!(matches!(err, DatabaseError::Config(_)));
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn decode_errors_surface() {
        let (_, model) = setup();
        let handler = MemoryHandler::new().with_table(
            "people",
            [Row::new().with("id", 1_i64).with("name", "Sam").into()],
        );
        let model = Model::new(model.table().clone().with_handler(Arc::new(handler)));

        let err = model
            .list::<Person>(&Fields::new(), &OrderBy::default(), Page::all())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("age"));
    }
}
