//! Demo program for the entwine engine
//!
//! Each subcommand is client code driving the public API: materialize a
//! users/cars/groups registry, create instances and walk their edges.

pub mod cli;
pub mod commands;
pub mod config;
pub mod output;
pub mod schema;
