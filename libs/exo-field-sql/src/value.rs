// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{cmp::Ordering, fmt::Display};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::IndexMap;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type, to_sql_checked};

use crate::database_error::DatabaseError;

/// A value bound to a statement or read back from a row.
///
/// This is a closed set so that field validation and in-memory evaluation can inspect values
/// without downcasting. Conversion to the wire format is delegated to the `tokio_postgres`
/// implementation for the corresponding Rust type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Timestamp(DateTime<Utc>),
}

/// Column name to value, in insertion order.
pub type Record = IndexMap<String, SqlValue>;

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view used by range checks. Integers are widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Int(i) => Some(*i as f64),
            SqlValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Total-ish ordering among values of a compatible kind. Nulls sort after every value, as
    /// Postgres orders them by default (last ascending, first descending). Mismatched kinds are
    /// incomparable.
    pub fn compare(&self, other: &SqlValue) -> Option<Ordering> {
        match (self, other) {
            (SqlValue::Null, SqlValue::Null) => Some(Ordering::Equal),
            (SqlValue::Null, _) => Some(Ordering::Greater),
            (_, SqlValue::Null) => Some(Ordering::Less),
            (SqlValue::Bool(a), SqlValue::Bool(b)) => a.partial_cmp(b),
            (SqlValue::Int(a), SqlValue::Int(b)) => a.partial_cmp(b),
            (SqlValue::Text(a), SqlValue::Text(b)) => a.partial_cmp(b),
            (SqlValue::Bytes(a), SqlValue::Bytes(b)) => a.partial_cmp(b),
            (SqlValue::Timestamp(a), SqlValue::Timestamp(b)) => a.partial_cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}

impl Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(v) => write!(f, "{v}"),
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::Float(v) => write!(f, "{v}"),
            SqlValue::Text(v) => write!(f, "'{v}'"),
            SqlValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            SqlValue::Json(v) => write!(f, "{v}"),
            SqlValue::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut bytes::BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(v) => v.to_sql(ty, out),
            SqlValue::Int(v) => {
                if *ty == Type::INT2 {
                    i16::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*v)?.to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlValue::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlValue::Text(v) => v.to_sql(ty, out),
            SqlValue::Bytes(v) => v.to_sql(ty, out),
            SqlValue::Json(v) => v.to_sql(ty, out),
            SqlValue::Timestamp(v) => {
                if *ty == Type::DATE {
                    v.date_naive().to_sql(ty, out)
                } else if *ty == Type::TIMESTAMP {
                    v.naive_utc().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// Column types read back as [`SqlValue::Text`].
const TEXT_TYPES: [Type; 5] = [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME, Type::UNKNOWN];

impl<'a> FromSql<'a> for SqlValue {
    fn from_sql(
        ty: &Type,
        raw: &'a [u8],
    ) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        let value = if *ty == Type::BOOL {
            SqlValue::Bool(bool::from_sql(ty, raw)?)
        } else if *ty == Type::INT2 {
            SqlValue::Int(i16::from_sql(ty, raw)?.into())
        } else if *ty == Type::INT4 {
            SqlValue::Int(i32::from_sql(ty, raw)?.into())
        } else if *ty == Type::INT8 {
            SqlValue::Int(i64::from_sql(ty, raw)?)
        } else if *ty == Type::FLOAT4 {
            SqlValue::Float(f32::from_sql(ty, raw)?.into())
        } else if *ty == Type::FLOAT8 {
            SqlValue::Float(f64::from_sql(ty, raw)?)
        } else if *ty == Type::JSON || *ty == Type::JSONB {
            SqlValue::Json(serde_json::Value::from_sql(ty, raw)?)
        } else if *ty == Type::TIMESTAMPTZ {
            SqlValue::Timestamp(DateTime::<Utc>::from_sql(ty, raw)?)
        } else if *ty == Type::TIMESTAMP {
            SqlValue::Timestamp(NaiveDateTime::from_sql(ty, raw)?.and_utc())
        } else if *ty == Type::DATE {
            let date = NaiveDate::from_sql(ty, raw)?;
            SqlValue::Timestamp(date.and_time(NaiveTime::MIN).and_utc())
        } else if *ty == Type::BYTEA {
            SqlValue::Bytes(Vec::<u8>::from_sql(ty, raw)?)
        } else if TEXT_TYPES.contains(ty) {
            SqlValue::Text(String::from_sql(ty, raw)?)
        } else {
            // The binary format of anything else (numeric, uuid, arrays) is not text.
            return Err(format!("Unsupported column type `{ty}`").into());
        };

        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(SqlValue::Null)
    }

    fn accepts(ty: &Type) -> bool {
        [
            Type::BOOL,
            Type::INT2,
            Type::INT4,
            Type::INT8,
            Type::FLOAT4,
            Type::FLOAT8,
            Type::JSON,
            Type::JSONB,
            Type::TIMESTAMPTZ,
            Type::TIMESTAMP,
            Type::DATE,
            Type::BYTEA,
        ]
        .contains(ty)
            || TEXT_TYPES.contains(ty)
    }
}

macro_rules! from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for SqlValue {
                fn from(value: $ty) -> Self {
                    SqlValue::$variant(value.into())
                }
            }
        )*
    };
}

from_primitive! {
    bool => Bool,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    serde_json::Value => Json,
    DateTime<Utc> => Timestamp,
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// Decode a [`SqlValue`] into a Rust type. Used by [`crate::Row::get`].
pub trait FromSqlValue: Sized {
    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError>;
}

fn mismatch(expected: &str, value: &SqlValue) -> DatabaseError {
    DatabaseError::Decode(format!("expected {expected}, found {value}"))
}

impl FromSqlValue for SqlValue {
    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        Ok(value)
    }
}

impl FromSqlValue for bool {
    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Bool(v) => Ok(v),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromSqlValue for i64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Int(v) => Ok(v),
            other => Err(mismatch("integer", &other)),
        }
    }
}

impl FromSqlValue for i32 {
    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        let v = i64::from_sql_value(value)?;
        i32::try_from(v).map_err(|_| DatabaseError::Decode(format!("{v} does not fit in i32")))
    }
}

impl FromSqlValue for f64 {
    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        value.as_f64().ok_or_else(|| mismatch("number", &value))
    }
}

impl FromSqlValue for String {
    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Text(v) => Ok(v),
            other => Err(mismatch("text", &other)),
        }
    }
}

impl FromSqlValue for Vec<u8> {
    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Bytes(v) => Ok(v),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

impl FromSqlValue for serde_json::Value {
    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Json(v) => Ok(v),
            other => Err(mismatch("json", &other)),
        }
    }
}

impl FromSqlValue for DateTime<Utc> {
    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Timestamp(v) => Ok(v),
            other => Err(mismatch("timestamp", &other)),
        }
    }
}

impl<T: FromSqlValue> FromSqlValue for Option<T> {
    fn from_sql_value(value: SqlValue) -> Result<Self, DatabaseError> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_maps_to_null() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::Text("x".into()));
    }

    #[test]
    fn compare_widens_numbers() {
        assert_eq!(
            SqlValue::Int(2).compare(&SqlValue::Float(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            SqlValue::Text("a".into()).compare(&SqlValue::Text("b".into())),
            Some(Ordering::Less)
        );
        assert_eq!(SqlValue::Text("a".into()).compare(&SqlValue::Int(1)), None);
    }

    #[test]
    fn nulls_sort_last() {
        assert_eq!(SqlValue::Null.compare(&SqlValue::Int(0)), Some(Ordering::Greater));
        assert_eq!(SqlValue::Int(0).compare(&SqlValue::Null), Some(Ordering::Less));
        assert_eq!(SqlValue::Null.compare(&SqlValue::Null), Some(Ordering::Equal));
    }

    #[test]
    fn text_types_decode_as_text() {
        assert!(<SqlValue as FromSql>::accepts(&Type::VARCHAR));
        assert_eq!(
            SqlValue::from_sql(&Type::TEXT, b"Oslo").unwrap(),
            SqlValue::Text("Oslo".into())
        );
    }

    #[test]
    fn date_decodes_as_midnight_utc() {
        // Days since 2000-01-01
        let raw = 1_i32.to_be_bytes();
        let value = SqlValue::from_sql(&Type::DATE, &raw).unwrap();

        assert_eq!(value.to_string(), "2000-01-02T00:00:00+00:00");
    }

    #[test]
    fn binary_only_types_are_rejected() {
        assert!(!<SqlValue as FromSql>::accepts(&Type::NUMERIC));
        assert!(!<SqlValue as FromSql>::accepts(&Type::UUID));

        let uuid = [0_u8; 16];
        let err = SqlValue::from_sql(&Type::UUID, &uuid).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported column type `uuid`");
    }

    #[test]
    fn decode_mismatch() {
        let err = i64::from_sql_value(SqlValue::Text("ten".into())).unwrap_err();
        assert_eq!(err.to_string(), "Could not decode row: expected integer, found 'ten'");

        assert_eq!(Option::<i64>::from_sql_value(SqlValue::Null).unwrap(), None);
        assert_eq!(i32::from_sql_value(SqlValue::Int(7)).unwrap(), 7);
    }
}
