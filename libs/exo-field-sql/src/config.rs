// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Configuration read from the environment.
//!
//! The environment is passed by reference (see [`Environment`]) so tests and embedders can
//! supply their own values without touching process state.

use std::{borrow::Borrow, collections::HashMap, hash::Hash};

use crate::database_error::DatabaseError;

pub const EXO_POSTGRES_URL: &str = "EXO_POSTGRES_URL";
pub const EXO_POSTGRES_USER: &str = "EXO_POSTGRES_USER";
pub const EXO_POSTGRES_PASSWORD: &str = "EXO_POSTGRES_PASSWORD";
pub const EXO_CONNECTION_POOL_SIZE: &str = "EXO_CONNECTION_POOL_SIZE";
pub const EXO_CHECK_CONNECTION_ON_STARTUP: &str = "EXO_CHECK_CONNECTION_ON_STARTUP";
pub const EXO_SHARD_TABLES: &str = "EXO_SHARD_TABLES";
pub const EXO_SHARD_SKIP_TOTAL: &str = "EXO_SHARD_SKIP_TOTAL";

const DEFAULT_POOL_SIZE: usize = 10;

/// A source of configuration variables.
pub trait Environment: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The variables of the running process.
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl<K, V> Environment for HashMap<K, V>
where
    K: Borrow<str> + Hash + Eq + Send + Sync,
    V: AsRef<str> + Send + Sync,
{
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| value.as_ref().to_string())
    }
}

/// Variables from `overrides`, then from `base` for anything `overrides` leaves unset.
pub struct Overlay<O, B> {
    pub overrides: O,
    pub base: B,
}

impl<O: Environment, B: Environment> Environment for Overlay<O, B> {
    fn var(&self, key: &str) -> Option<String> {
        self.overrides.var(key).or_else(|| self.base.var(key))
    }
}

/// Typed reads of the `EXO_*` variables. Every failure names the variable.
struct Vars<'a>(&'a dyn Environment);

impl Vars<'_> {
    fn invalid(key: &str, value: &str, expected: &str) -> DatabaseError {
        DatabaseError::Config(format!("Invalid value for {key}: {value}. Expected {expected}"))
    }

    fn required(&self, key: &str) -> Result<String, DatabaseError> {
        self.0
            .var(key)
            .ok_or_else(|| DatabaseError::Config(format!("Env {key} must be provided")))
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, DatabaseError> {
        let Some(value) = self.0.var(key) else {
            return Ok(default);
        };
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" | "enabled" | "enable" => Ok(true),
            "false" | "0" | "no" | "off" | "disabled" | "disable" => Ok(false),
            _ => Err(Self::invalid(key, &value, "a boolean such as true/false or on/off")),
        }
    }

    fn positive(&self, key: &str, default: usize) -> Result<usize, DatabaseError> {
        match self.0.var(key) {
            None => Ok(default),
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(Self::invalid(key, &value, "a positive integer")),
            },
        }
    }

    /// Comma-separated entries, trimmed, empty ones dropped.
    fn list(&self, key: &str) -> Vec<String> {
        self.0
            .var(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|entry| !entry.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Connection pool settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub pool_size: usize,
    pub check_connection_on_startup: bool,
}

impl PoolConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: None,
            password: None,
            pool_size: DEFAULT_POOL_SIZE,
            check_connection_on_startup: true,
        }
    }

    pub fn from_env(env: &dyn Environment) -> Result<Self, DatabaseError> {
        let vars = Vars(env);
        Ok(Self {
            url: vars.required(EXO_POSTGRES_URL)?,
            user: env.var(EXO_POSTGRES_USER),
            password: env.var(EXO_POSTGRES_PASSWORD),
            pool_size: vars.positive(EXO_CONNECTION_POOL_SIZE, DEFAULT_POOL_SIZE)?,
            check_connection_on_startup: vars.flag(EXO_CHECK_CONNECTION_ON_STARTUP, true)?,
        })
    }
}

/// The physical tables behind one logical table, in the order they are paginated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardingConfig {
    pub tables: Vec<String>,
    pub skip_total: bool,
}

impl ShardingConfig {
    pub fn from_env(env: &dyn Environment) -> Result<Self, DatabaseError> {
        let vars = Vars(env);
        let tables = vars.list(EXO_SHARD_TABLES);
        if tables.is_empty() {
            return Err(DatabaseError::Config(format!(
                "Env {EXO_SHARD_TABLES} must list at least one table"
            )));
        }

        Ok(Self {
            tables,
            skip_total: vars.flag(EXO_SHARD_SKIP_TOTAL, false)?,
        })
    }
}
