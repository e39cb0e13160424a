//! Library data-warehouse toolkit
//!
//! Generates synthetic fact data shaped by an academic calendar, bulk-loads it into the
//! warehouse tables, and keeps the calendar dimension's holiday attributes current.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod calendar;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod generator;
pub mod migrator;
pub mod services;

pub use calendar::{classify, AcademicPhase};
pub use errors::{AppError, ServiceError};
