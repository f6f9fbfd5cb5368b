//! Personal job-application tracker: domain model, row-store adapters,
//! the session-scoped application list, and the views derived from it.

pub mod conf;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod rest;
pub mod store;
pub mod tracker;
pub mod views;
