//! Shared helpers for integration tests.

#![allow(dead_code)]

use crud_api::{Args, Record, Uuid};

pub const USER_ID: &str = "5f0c7b1e-2a3d-4c8e-9f10-1a2b3c4d5e6f";

pub const INSERT_USER: &str =
    "INSERT INTO users (name, age) VALUES ($1, $2) RETURNING id, name, age, fk";
pub const SELECT_USER: &str = "SELECT * FROM users WHERE name = $1 AND age = $2";

#[derive(Debug, Clone, PartialEq, Args)]
pub struct UserInput {
    pub name: String,
    pub age: i32,
    #[crud(skip)]
    pub request_id: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
pub struct UserOutput {
    #[crud(column = "id")]
    pub id: Uuid,
    #[crud(column = "name")]
    pub name: String,
    #[crud(column = "age")]
    pub age: i32,
    #[crud(column = "fk")]
    pub fk: Option<Uuid>,
}

pub fn user_id() -> Uuid {
    Uuid::parse_str(USER_ID).unwrap()
}

/// Route `tracing` output through the test harness. `RUST_LOG` picks the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
