//! Incident insights for the Are You Safe reporting tool.
//!
//! [`recommend`] turns one report into an urgency tier and action plan;
//! [`trend`] summarizes a student's whole report history. Both are pure
//! functions of their input. [`service`] adds the cache and the
//! superseded-result policy around the recommendation call, and [`db`]
//! is the Postgres system of record the CLI works against.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod recommend;
pub mod report;
pub mod service;
pub mod trend;

pub use error::{EngineError, Result};
