//! ddlkit CLI - command-line interface for ddlkit.
//!
//! This crate wires the migration engine to the filesystem and, with the
//! `postgres` feature, to a live database for introspection.

#[cfg(feature = "postgres")]
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
