//! Film module: films, users, reviews and the engagement state around them.
//!
//! # Layers
//!
//! - **reconcile**: folds fan-out join rows back into nested films
//! - **repo**: `FilmRepository` over SQLite (`SqlRepository`) or a key-value
//!   store (`KvRepository`, redb or in-memory)
//! - **service**: `FilmService` with entity CRUD, the engagement ledger
//!   (friends, likes, review votes, cascade cleanup) and ranking queries
//!
//! # Usage
//!
//! ```ignore
//! use film::{FilmConfig, FilmService};
//!
//! let svc = FilmService::with_sql(sql, FilmConfig::default())?;
//! let top = svc.popular_films(Some(10))?;
//! ```

pub mod identity;
pub mod locks;
pub mod model;
pub mod reconcile;
pub mod repo;
pub mod service;

pub use repo::{FilmRepository, FilmScope, KvRepository, Relation, RepoError, SqlRepository};
pub use service::ranking::FilmSort;
pub use service::{EntityKind, FilmConfig, FilmError, FilmService};
