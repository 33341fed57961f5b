// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation: field `{field}` {message}")]
    Validation { field: String, message: String },

    #[error("Field `{field}` produced an unsupported data shape")]
    UnsupportedDataShape { field: String },

    #[error("Update of `{0}` has no values to set")]
    EmptyUpdate(String),

    #[error("Pagination size required")]
    PaginationSizeRequired,

    #[error("Could not decode row: {0}")]
    Decode(String),

    #[error("{0}")]
    Middleware(String),

    #[error("Delegate: {0}")]
    Delegate(#[from] tokio_postgres::Error),

    #[cfg(feature = "pool")]
    #[error("Pool: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("{0} {1}")]
    WithContext(String, #[source] Box<DatabaseError>),

    #[error("{0}")]
    BoxedError(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl DatabaseError {
    pub fn with_context(self, context: String) -> DatabaseError {
        DatabaseError::WithContext(context, Box::new(self))
    }

    pub fn validation(field: &str, message: impl Into<String>) -> DatabaseError {
        DatabaseError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub trait WithContext {
    fn with_context(self, context: String) -> Self;
}

impl<T> WithContext for Result<T, DatabaseError> {
    fn with_context(self, context: String) -> Result<T, DatabaseError> {
        self.map_err(|e| e.with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_field() {
        let err = DatabaseError::validation("email", "must match pattern `@`");
        assert_eq!(
            err.to_string(),
            "Validation: field `email` must match pattern `@`"
        );
    }

    #[test]
    fn context_wraps_source() {
        let res: Result<(), _> = Err(DatabaseError::PaginationSizeRequired);
        let err = res.with_context("Listing orders failed:".into()).unwrap_err();

        assert_eq!(err.to_string(), "Listing orders failed: Pagination size required");
        assert!(matches!(
            err,
            DatabaseError::WithContext(_, inner)
                if matches!(*inner, DatabaseError::PaginationSizeRequired)
        ));
    }
}
