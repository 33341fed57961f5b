// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use regex::Regex;

use crate::{SqlValue, database_error::DatabaseError};

/// Validation rules for the value a field produces under its own name, or for each column of a
/// record that lacks that name.
///
/// A `NULL` value only ever fails `required`; the other rules apply to non-null values.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub required: bool,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub one_of: Vec<SqlValue>,
    pub pattern: Option<Regex>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn one_of(mut self, values: impl IntoIterator<Item = impl Into<SqlValue>>) -> Self {
        self.one_of = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn pattern(mut self, pattern: &str) -> Result<Self, DatabaseError> {
        let regex = Regex::new(pattern)
            .map_err(|e| DatabaseError::Config(format!("Invalid pattern `{pattern}`: {e}")))?;
        self.pattern = Some(regex);
        Ok(self)
    }

    pub fn validate(&self, field: &str, value: &SqlValue) -> Result<(), DatabaseError> {
        if value.is_null() {
            return if self.required {
                Err(DatabaseError::validation(field, "is required"))
            } else {
                Ok(())
            };
        }

        if self.min_length.is_some() || self.max_length.is_some() {
            let length = match value {
                SqlValue::Text(s) => s.chars().count(),
                SqlValue::Bytes(b) => b.len(),
                other => {
                    return Err(DatabaseError::validation(
                        field,
                        format!("must be text or bytes to check its length, found {other}"),
                    ));
                }
            };
            if let Some(min) = self.min_length {
                if length < min {
                    return Err(DatabaseError::validation(
                        field,
                        format!("must be at least {min} long, found {length}"),
                    ));
                }
            }
            if let Some(max) = self.max_length {
                if length > max {
                    return Err(DatabaseError::validation(
                        field,
                        format!("must be at most {max} long, found {length}"),
                    ));
                }
            }
        }

        if self.min.is_some() || self.max.is_some() {
            let number = value.as_f64().ok_or_else(|| {
                DatabaseError::validation(field, format!("must be a number, found {value}"))
            })?;
            if let Some(min) = self.min {
                if number < min {
                    return Err(DatabaseError::validation(
                        field,
                        format!("must be at least {min}, found {value}"),
                    ));
                }
            }
            if let Some(max) = self.max {
                if number > max {
                    return Err(DatabaseError::validation(
                        field,
                        format!("must be at most {max}, found {value}"),
                    ));
                }
            }
        }

        if !self.one_of.is_empty() && !self.one_of.contains(value) {
            let allowed = self
                .one_of
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(DatabaseError::validation(
                field,
                format!("must be one of [{allowed}], found {value}"),
            ));
        }

        if let Some(pattern) = &self.pattern {
            match value.as_str() {
                Some(s) if pattern.is_match(s) => {}
                Some(_) => {
                    return Err(DatabaseError::validation(
                        field,
                        format!("must match pattern `{}`", pattern.as_str()),
                    ));
                }
                None => {
                    return Err(DatabaseError::validation(
                        field,
                        format!("must be text to match a pattern, found {value}"),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<(), DatabaseError>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn required_rejects_null_only() {
        let schema = Schema::new().required();
        assert!(schema.validate("name", &SqlValue::from("x")).is_ok());
        assert_eq!(
            message(schema.validate("name", &SqlValue::Null)),
            "Validation: field `name` is required"
        );

        assert!(Schema::new().range(Some(1.0), None).validate("age", &SqlValue::Null).is_ok());
    }

    #[test]
    fn length_counts_characters() {
        let schema = Schema::new().length(Some(2), Some(3));
        assert!(schema.validate("code", &SqlValue::from("äöü")).is_ok());
        assert_eq!(
            message(schema.validate("code", &SqlValue::from("abcd"))),
            "Validation: field `code` must be at most 3 long, found 4"
        );
        assert!(schema.validate("code", &SqlValue::from(12_i64)).is_err());
    }

    #[test]
    fn range() {
        let schema = Schema::new().range(Some(0.0), Some(120.0));
        assert!(schema.validate("age", &SqlValue::from(30_i64)).is_ok());
        assert_eq!(
            message(schema.validate("age", &SqlValue::from(-1_i64))),
            "Validation: field `age` must be at least 0, found -1"
        );
    }

    #[test]
    fn enumeration() {
        let schema = Schema::new().one_of(["draft", "paid"]);
        assert!(schema.validate("status", &SqlValue::from("paid")).is_ok());
        assert_eq!(
            message(schema.validate("status", &SqlValue::from("void"))),
            "Validation: field `status` must be one of ['draft', 'paid'], found 'void'"
        );
    }

    #[test]
    fn pattern() {
        let schema = Schema::new().pattern("^[a-z]+@[a-z]+$").unwrap();
        assert!(schema.validate("email", &SqlValue::from("a@b")).is_ok());
        assert_eq!(
            message(schema.validate("email", &SqlValue::from("nope"))),
            "Validation: field `email` must match pattern `^[a-z]+@[a-z]+$`"
        );
        assert!(Schema::new().pattern("(").is_err());
    }
}
