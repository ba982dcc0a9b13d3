//! Shared task list client: a task store and view controller over a hosted
//! row database with per-user auth.

pub mod clock;
pub mod commands;
pub mod config;
pub mod controller;
pub mod error;
pub mod filter;
pub mod model;
pub mod notify;
pub mod output;
pub mod remote;
pub mod session;
pub mod store;
pub mod task_id;
