//! Exhibition Service Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod domain;
pub mod jobs;
pub mod query;
pub mod repository;
pub mod service;
pub mod store;

pub mod config;
pub mod db;
mod error;

pub use config::Config;
pub use domain::{CallerContext, DomainError, ObjectId};
pub use error::{AppError, AppResult};
pub use repository::{AggregateRepository, RepositoryError};
pub use service::ExhibitionService;
