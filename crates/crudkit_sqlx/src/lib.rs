//! PostgreSQL Repository Backing
//!
//! This crate implements the crudkit repository contract against
//! PostgreSQL using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: data access goes through
//! [`SqlxRepository`], which translates declared entity metadata and
//! collection filters into runtime-built queries. Transaction boundaries
//! stay with the caller: a repository is constructed against a
//! [`UnitOfWork`] the caller opened and will commit or roll back.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use crudkit_sqlx::{create_pool, DatabaseConfig, SqlxRepository, UnitOfWork};
//!
//! let pool = create_pool(&DatabaseConfig::from_env()?).await?;
//! let uow = Arc::new(UnitOfWork::begin(&pool).await?);
//! let repo = SqlxRepository::<Author>::new(Arc::clone(&uow));
//! let author = repo.add(Author::named("Agatha Christie")).await?;
//! uow.commit().await?;
//! ```

pub mod error;
pub mod pool;
pub mod repository;
pub mod uow;

pub use pool::{create_pool, DatabaseConfig, DatabasePool};
pub use repository::SqlxRepository;
pub use uow::UnitOfWork;
