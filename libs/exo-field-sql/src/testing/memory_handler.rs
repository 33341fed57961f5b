// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    cmp::Ordering as CmpOrdering,
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use indexmap::IndexMap;
use regex::RegexBuilder;

use crate::{
    Record, SqlValue,
    database_error::DatabaseError,
    handler::ExecutionHandler,
    row::Row,
    sql::{CaseSensitivity, Column, Ordering, Predicate, Select, Statement},
};

/// An [`ExecutionHandler`] that keeps tables of records in memory.
///
/// Statements are evaluated directly (predicates, ordering, offset, limit and projection) rather
/// than rendered, and every statement received is logged so tests can assert what reached the
/// backend. Statements against unknown tables fail like a missing relation would.
#[derive(Default)]
pub struct MemoryHandler {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    tables: IndexMap<String, Vec<Record>>,
    statements: Vec<Statement>,
    failing: HashSet<String>,
}

enum Outcome {
    Rows(Vec<Row>),
    Count(i64),
    Affected(i64),
    Inserted(i64),
}

impl MemoryHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table holding `rows`
    pub fn with_table(self, name: &str, rows: impl IntoIterator<Item = Record>) -> Self {
        self.seed(name, rows);
        self
    }

    /// Append `rows` to a table, creating it if needed
    pub fn seed(&self, name: &str, rows: impl IntoIterator<Item = Record>) {
        self.state()
            .tables
            .entry(name.to_string())
            .or_default()
            .extend(rows);
    }

    /// Make every later statement against `table` fail
    pub fn fail_on(&self, table: &str) {
        self.state().failing.insert(table.to_string());
    }

    /// The current content of a table
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.state().tables.get(table).cloned().unwrap_or_default()
    }

    /// Every statement received so far, in order
    pub fn statements(&self) -> Vec<Statement> {
        self.state().statements.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state().statements.len()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn execute(&self, statement: &Statement) -> Result<Outcome, DatabaseError> {
        let mut state = self.state();
        state.statements.push(statement.clone());

        let name = &statement.table().name;
        if state.failing.contains(name) {
            return Err(DatabaseError::BoxedError(
                format!("Simulated failure on table `{name}`").into(),
            ));
        }
        let rows = state
            .tables
            .get_mut(name)
            .ok_or_else(|| DatabaseError::Config(format!("Relation `{name}` does not exist")))?;

        let outcome = match statement {
            Statement::Select(select) => Outcome::Rows(select_rows(rows, select)),
            Statement::Count(count) => {
                let matched = rows
                    .iter()
                    .filter(|row| matches_all(&count.predicates, row))
                    .count();
                Outcome::Count(matched as i64)
            }
            Statement::Insert(insert) => {
                let mut record = insert.values.clone();
                let id = match &insert.returning {
                    Some(pk) => match record.get(pk) {
                        Some(SqlValue::Int(id)) => *id,
                        _ => {
                            let id = next_id(rows, pk);
                            record.insert(pk.clone(), SqlValue::Int(id));
                            id
                        }
                    },
                    None => 0,
                };
                rows.push(record);
                Outcome::Inserted(id)
            }
            Statement::Update(update) => {
                let mut affected = 0;
                for row in rows
                    .iter_mut()
                    .filter(|row| matches_all(&update.predicates, row))
                {
                    for (column, value) in &update.values {
                        row.insert(column.clone(), value.clone());
                    }
                    affected += 1;
                }
                Outcome::Affected(affected)
            }
            Statement::Delete(delete) => {
                let before = rows.len();
                rows.retain(|row| !matches_all(&delete.predicates, row));
                Outcome::Affected((before - rows.len()) as i64)
            }
        };
        Ok(outcome)
    }
}

#[async_trait]
impl ExecutionHandler for MemoryHandler {
    async fn exec(&self, statement: &Statement) -> Result<(), DatabaseError> {
        self.execute(statement).map(|_| ())
    }

    async fn exec_with_rows_affected(&self, statement: &Statement) -> Result<i64, DatabaseError> {
        Ok(match self.execute(statement)? {
            Outcome::Rows(rows) => rows.len() as i64,
            Outcome::Count(_) | Outcome::Inserted(_) => 1,
            Outcome::Affected(affected) => affected,
        })
    }

    async fn insert_with_last_id(
        &self,
        statement: &Statement,
    ) -> Result<(u64, i64), DatabaseError> {
        match self.execute(statement)? {
            Outcome::Inserted(id) => Ok((1, id)),
            _ => Err(unexpected("an insert")),
        }
    }

    async fn first(&self, statement: &Statement) -> Result<Option<Row>, DatabaseError> {
        Ok(self.query(statement).await?.into_iter().next())
    }

    async fn query(&self, statement: &Statement) -> Result<Vec<Row>, DatabaseError> {
        Ok(match self.execute(statement)? {
            Outcome::Rows(rows) => rows,
            Outcome::Count(count) => vec![Row::new().with("count", count)],
            Outcome::Affected(_) | Outcome::Inserted(_) => vec![],
        })
    }

    async fn count(&self, statement: &Statement) -> Result<i64, DatabaseError> {
        match self.execute(statement)? {
            Outcome::Count(count) => Ok(count),
            Outcome::Rows(rows) => Ok(rows.len() as i64),
            _ => Err(unexpected("a count or a select")),
        }
    }

    async fn exists(&self, statement: &Statement) -> Result<bool, DatabaseError> {
        match self.execute(statement)? {
            Outcome::Rows(rows) => Ok(!rows.is_empty()),
            Outcome::Count(count) => Ok(count > 0),
            _ => Err(unexpected("a count or a select")),
        }
    }
}

fn unexpected(expected: &str) -> DatabaseError {
    DatabaseError::Config(format!("Expected {expected} statement"))
}

fn next_id(rows: &[Record], pk: &str) -> i64 {
    rows.iter()
        .filter_map(|row| match row.get(pk) {
            Some(SqlValue::Int(id)) => Some(*id),
            _ => None,
        })
        .max()
        .unwrap_or(0)
        + 1
}

fn select_rows(rows: &[Record], select: &Select) -> Vec<Row> {
    let mut matched: Vec<&Record> = rows
        .iter()
        .filter(|row| matches_all(&select.predicates, row))
        .collect();

    if let Some(order_by) = &select.order_by {
        matched.sort_by(|a, b| {
            order_by
                .0
                .iter()
                .map(|element| {
                    let ordering = value_of(a, &element.0)
                        .compare(&value_of(b, &element.0))
                        .unwrap_or(CmpOrdering::Equal);
                    match element.1 {
                        Ordering::Asc => ordering,
                        Ordering::Desc => ordering.reverse(),
                    }
                })
                .find(|ordering| ordering.is_ne())
                .unwrap_or(CmpOrdering::Equal)
        });
    }

    let offset = select.offset.as_ref().map_or(0, |offset| offset.0.max(0)) as usize;
    let limit = select
        .limit
        .as_ref()
        .map_or(usize::MAX, |limit| limit.0.max(0) as usize);

    matched
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|record| project(record, &select.columns))
        .collect()
}

fn project(record: &Record, columns: &[Column]) -> Row {
    let mut row = Row::new();
    for column in columns {
        match column {
            Column::Star => {
                for (name, value) in record {
                    row.insert(name.clone(), value.clone());
                }
            }
            Column::Named(name) => row.insert(name.clone(), value_of(record, name)),
            Column::Constant(constant) => row.insert("?column?", SqlValue::Int(*constant)),
            _ => {}
        }
    }
    row
}

fn value_of(record: &Record, column: &str) -> SqlValue {
    record.get(column).cloned().unwrap_or(SqlValue::Null)
}

fn resolve(column: &Column, record: &Record) -> SqlValue {
    match column {
        Column::Named(name) => value_of(record, name),
        Column::Param(value) => value.clone(),
        Column::Constant(constant) => SqlValue::Int(*constant),
        _ => SqlValue::Null,
    }
}

fn matches_all(predicates: &[Predicate], record: &Record) -> bool {
    predicates
        .iter()
        .all(|predicate| matches(predicate, record))
}

/// Evaluate a predicate the way SQL would, treating an unknown (null) comparison as false
fn matches(predicate: &Predicate, record: &Record) -> bool {
    let compare = |lhs: &Column, rhs: &Column, accept: fn(CmpOrdering) -> bool| {
        let (lhs, rhs) = (resolve(lhs, record), resolve(rhs, record));
        !lhs.is_null() && !rhs.is_null() && lhs.compare(&rhs).is_some_and(accept)
    };
    let text = |column: &Column| resolve(column, record).as_str().map(str::to_string);

    match predicate {
        Predicate::True => true,
        Predicate::False => false,
        Predicate::Eq(lhs, Column::Null) => resolve(lhs, record).is_null(),
        Predicate::Neq(lhs, Column::Null) => !resolve(lhs, record).is_null(),
        Predicate::Eq(lhs, rhs) => compare(lhs, rhs, CmpOrdering::is_eq),
        Predicate::Neq(lhs, rhs) => compare(lhs, rhs, CmpOrdering::is_ne),
        Predicate::Lt(lhs, rhs) => compare(lhs, rhs, CmpOrdering::is_lt),
        Predicate::Lte(lhs, rhs) => compare(lhs, rhs, CmpOrdering::is_le),
        Predicate::Gt(lhs, rhs) => compare(lhs, rhs, CmpOrdering::is_gt),
        Predicate::Gte(lhs, rhs) => compare(lhs, rhs, CmpOrdering::is_ge),
        Predicate::In(lhs, Column::ParamList(values)) => {
            let lhs = resolve(lhs, record);
            !lhs.is_null()
                && values
                    .iter()
                    .any(|value| lhs.compare(value).is_some_and(CmpOrdering::is_eq))
        }
        Predicate::In(lhs, rhs) => compare(lhs, rhs, CmpOrdering::is_eq),
        Predicate::StringLike(lhs, rhs, sensitivity) => match (text(lhs), text(rhs)) {
            (Some(value), Some(pattern)) => like(&value, &pattern, *sensitivity),
            _ => false,
        },
        Predicate::StringStartsWith(lhs, rhs) => match (text(lhs), text(rhs)) {
            (Some(value), Some(prefix)) => value.starts_with(&prefix),
            _ => false,
        },
        Predicate::StringEndsWith(lhs, rhs) => match (text(lhs), text(rhs)) {
            (Some(value), Some(suffix)) => value.ends_with(&suffix),
            _ => false,
        },
        Predicate::And(lhs, rhs) => matches(lhs, record) && matches(rhs, record),
        Predicate::Or(lhs, rhs) => matches(lhs, record) || matches(rhs, record),
        Predicate::Not(predicate) => !matches(predicate, record),
    }
}

/// SQL `LIKE`: `%` matches any run of characters, `_` exactly one
fn like(value: &str, pattern: &str, sensitivity: CaseSensitivity) -> bool {
    let mut regex = String::from("^");
    for c in pattern.chars() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
    }
    regex.push('$');

    RegexBuilder::new(&regex)
        .case_insensitive(sensitivity == CaseSensitivity::Insensitive)
        .dot_matches_new_line(true)
        .build()
        .is_ok_and(|regex| regex.is_match(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{Count, Delete, Insert, Limit, Offset, OrderBy, TableRef, Update};

    fn person(id: i64, name: &str, age: i64) -> Record {
        Record::from_iter([
            ("id".to_string(), SqlValue::from(id)),
            ("name".to_string(), SqlValue::from(name)),
            ("age".to_string(), SqlValue::from(age)),
        ])
    }

    fn handler() -> MemoryHandler {
        MemoryHandler::new().with_table(
            "people",
            [person(1, "Sam", 30), person(2, "alex", 25), person(3, "Sasha", 41)],
        )
    }

    fn select(predicates: Vec<Predicate>) -> Select {
        Select {
            table: TableRef::new("people", None),
            columns: vec![Column::named("name")],
            predicates,
            order_by: Some(OrderBy::desc("age")),
            offset: None,
            limit: None,
        }
    }

    fn names(rows: Vec<Row>) -> Vec<String> {
        rows.iter()
            .map(|row| row.get::<String>("name").unwrap())
            .collect()
    }

    #[tokio::test]
    async fn filters_orders_and_windows() {
        let handler = handler();
        let mut statement = select(vec![Predicate::Gt(
            Column::named("age"),
            Column::param(26_i64),
        )]);

        let rows = handler.query(&statement.clone().into()).await.unwrap();
        assert_eq!(names(rows), vec!["Sasha", "Sam"]);

        statement.predicates.clear();
        statement.offset = Some(Offset(1));
        statement.limit = Some(Limit(1));
        let rows = handler.query(&statement.into()).await.unwrap();
        assert_eq!(names(rows), vec!["Sam"]);
    }

    #[tokio::test]
    async fn nulls_order_last_ascending_and_first_descending() {
        let unknown = Record::from_iter([
            ("id".to_string(), SqlValue::from(4_i64)),
            ("name".to_string(), SqlValue::from("Kim")),
            ("age".to_string(), SqlValue::Null),
        ]);
        let handler = MemoryHandler::new()
            .with_table("people", [person(1, "Sam", 30), unknown, person(2, "alex", 25)]);

        let mut statement = select(vec![]);
        statement.order_by = Some(OrderBy::asc("age"));
        let rows = handler.query(&statement.clone().into()).await.unwrap();
        assert_eq!(names(rows), vec!["alex", "Sam", "Kim"]);

        statement.order_by = Some(OrderBy::desc("age"));
        let rows = handler.query(&statement.into()).await.unwrap();
        assert_eq!(names(rows), vec!["Kim", "Sam", "alex"]);
    }

    #[tokio::test]
    async fn like_and_membership() {
        let handler = handler();

        let like = select(vec![Predicate::StringLike(
            Column::named("name"),
            Column::param("s%"),
            CaseSensitivity::Insensitive,
        )]);
        assert_eq!(
            names(handler.query(&like.into()).await.unwrap()),
            vec!["Sasha", "Sam"]
        );

        let within = select(vec![Predicate::in_list(
            Column::named("id"),
            vec![SqlValue::from(2_i64), SqlValue::from(9_i64)],
        )]);
        assert_eq!(
            names(handler.query(&within.into()).await.unwrap()),
            vec!["alex"]
        );
    }

    #[tokio::test]
    async fn null_comparisons() {
        let handler = MemoryHandler::new().with_table(
            "people",
            [
                person(1, "Sam", 30),
                Record::from_iter([("id".to_string(), SqlValue::from(2_i64))]),
            ],
        );
        let is_null = Count {
            table: TableRef::new("people", None),
            predicates: vec![Predicate::eq(Column::named("name"), Column::param(SqlValue::Null))],
        };
        let not_sam = Count {
            table: TableRef::new("people", None),
            predicates: vec![Predicate::neq(Column::named("name"), Column::param("Sam"))],
        };

        assert_eq!(handler.count(&is_null.into()).await.unwrap(), 1);
        assert_eq!(handler.count(&not_sam.into()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn writes() {
        let handler = handler();
        let table = TableRef::new("people", None);

        let insert = Insert {
            table: table.clone(),
            values: Record::from_iter([("name".to_string(), SqlValue::from("Kim"))]),
            returning: Some("id".into()),
        };
        assert_eq!(
            handler.insert_with_last_id(&insert.into()).await.unwrap(),
            (1, 4)
        );

        let update = Update {
            table: table.clone(),
            predicates: vec![Predicate::Lt(Column::named("age"), Column::param(35_i64))],
            values: Record::from_iter([("age".to_string(), SqlValue::from(50_i64))]),
        };
        assert_eq!(
            handler.exec_with_rows_affected(&update.into()).await.unwrap(),
            2
        );

        let delete = Delete {
            table,
            predicates: vec![Predicate::Eq(Column::named("age"), Column::param(50_i64))],
        };
        assert_eq!(
            handler.exec_with_rows_affected(&delete.into()).await.unwrap(),
            2
        );
        assert_eq!(handler.rows("people").len(), 2);
        assert_eq!(handler.call_count(), 3);
    }

    #[tokio::test]
    async fn failures() {
        let handler = handler();
        let missing = Count {
            table: TableRef::new("nobody", None),
            predicates: vec![],
        };
        assert!(handler.count(&missing.into()).await.is_err());

        handler.fail_on("people");
        let err = handler.exists(&select(vec![]).into()).await.unwrap_err();
        assert_eq!(err.to_string(), "Simulated failure on table `people`");
        assert_eq!(handler.call_count(), 2);
    }
}
