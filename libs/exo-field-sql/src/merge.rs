// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Combining many fields into one payload or one predicate list.
//!
//! Predicates concatenate in field order. Payload values override by column name, with the
//! later field winning, so fields appended by middleware take precedence over the caller's.

use std::collections::HashSet;

use tracing::trace;

use crate::{
    Record,
    database_error::DatabaseError,
    field::{Data, FieldContext, Fields},
    sql::Expressions,
};

/// Concatenate the predicates of every field, in order. The first producer error aborts the merge.
pub fn merge_where(fields: &Fields, ctx: &FieldContext<'_>) -> Result<Expressions, DatabaseError> {
    let mut expressions = Expressions::new();
    for field in fields {
        expressions.extend(field.produce_where(ctx)?);
    }
    Ok(expressions)
}

/// Merge the values of every field into one record, later fields overwriting earlier ones on the
/// same column. Fields that produce nothing are skipped.
///
/// A record carrying the field's own column is validated on that column. A record without it
/// (a flattened struct, say) has every one of its columns validated, reported as `field.column`.
pub fn merge_data(fields: &Fields, ctx: &FieldContext<'_>) -> Result<Record, DatabaseError> {
    merge_present(fields, ctx).map(|(payload, _)| payload)
}

/// [`merge_data`], also returning the names of the fields that contributed at least one column.
pub(crate) fn merge_present<'f>(
    fields: &'f Fields,
    ctx: &FieldContext<'_>,
) -> Result<(Record, HashSet<&'f str>), DatabaseError> {
    let mut payload = Record::new();
    let mut present = HashSet::new();
    for field in fields {
        let record = match field.produce_value(ctx)? {
            None => continue,
            Some(Data::Record(record)) => record,
            Some(Data::Flattened(flatten)) => flatten.flatten(),
            Some(Data::Scalar(_) | Data::List(_)) => {
                return Err(DatabaseError::UnsupportedDataShape {
                    field: field.name().to_string(),
                });
            }
        };

        let schema = field.schema();
        match record.get(field.name()) {
            Some(value) => schema.validate(field.name(), value)?,
            None if record.is_empty() && schema.required => {
                return Err(DatabaseError::validation(field.name(), "is required"));
            }
            None => {
                for (column, value) in &record {
                    schema.validate(&format!("{}.{column}", field.name()), value)?;
                }
            }
        }

        if !record.is_empty() {
            present.insert(field.name());
        }
        for (column, value) in record {
            if let Some(previous) = payload.insert(column, value) {
                trace!(field = field.name(), ?previous, "Overriding merged value");
            }
        }
    }
    Ok((payload, present))
}
