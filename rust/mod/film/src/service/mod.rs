pub mod catalog;
pub mod directors;
pub mod films;
pub mod ledger;
pub mod ranking;
pub mod reviews;
pub mod users;

#[cfg(test)]
pub(crate) mod testutil;

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use filmrate_kv::KVStore;
use filmrate_sql::SQLStore;

use crate::locks::KeyedLocks;
use crate::model::{Director, Film, Review, User};
use crate::reconcile::{films_from_rows, ReconcileError};
use crate::repo::{FilmRepository, FilmScope, KvRepository, RepoError, SqlRepository};

/// What a `NotFound` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Film,
    User,
    Review,
    Director,
    Genre,
    Mpa,
    /// A known director with no films.
    DirectorFilms,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Film => "film",
            EntityKind::User => "user",
            EntityKind::Review => "review",
            EntityKind::Director => "director",
            EntityKind::Genre => "genre",
            EntityKind::Mpa => "mpa rating",
            EntityKind::DirectorFilms => "films of director",
        };
        f.write_str(name)
    }
}

/// Film service error type.
#[derive(Debug, Error)]
pub enum FilmError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage: {0}")]
    Storage(String),

    #[error("internal: {0}")]
    Internal(String),
}

impl FilmError {
    pub fn not_found(kind: EntityKind, id: i64) -> Self {
        tracing::warn!(%kind, id, "entity not found");
        FilmError::NotFound { kind, id }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        tracing::warn!(%reason, "rejected request");
        FilmError::InvalidInput(reason)
    }
}

impl From<RepoError> for FilmError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict(m) => FilmError::invalid(m),
            // Referenced records are checked up front, so this is a race.
            RepoError::Dangling(m) | RepoError::Storage(m) => FilmError::Storage(m),
            RepoError::Corrupt(m) => FilmError::Internal(m),
        }
    }
}

impl From<ReconcileError> for FilmError {
    fn from(e: ReconcileError) -> Self {
        FilmError::Internal(e.to_string())
    }
}

impl From<FilmError> for filmrate_core::ServiceError {
    fn from(e: FilmError) -> Self {
        use filmrate_core::ServiceError;
        match e {
            FilmError::NotFound { .. } => ServiceError::NotFound(e.to_string()),
            FilmError::InvalidInput(m) => ServiceError::Validation(m),
            FilmError::Storage(m) => ServiceError::Storage(m),
            FilmError::Internal(m) => ServiceError::Internal(m),
        }
    }
}

fn first_film_day() -> NaiveDate {
    // First public film screening.
    NaiveDate::from_ymd_opt(1895, 12, 28).unwrap_or(NaiveDate::MIN)
}

/// Configuration for the film service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilmConfig {
    /// Result size of `popular_films` when no count is given.
    pub popular_default_count: i64,
    /// Result size of `reviews` when no count is given.
    pub reviews_default_count: i64,
    /// Films released before this date are rejected.
    pub earliest_release_date: NaiveDate,
}

impl Default for FilmConfig {
    fn default() -> Self {
        Self {
            popular_default_count: 10,
            reviews_default_count: 10,
            earliest_release_date: first_film_day(),
        }
    }
}

/// The film service. Holds the repository, configuration and the per-slot
/// locks that serialise review vote transitions.
pub struct FilmService {
    pub(crate) repo: Arc<dyn FilmRepository>,
    pub(crate) config: FilmConfig,
    pub(crate) vote_locks: KeyedLocks<(i64, i64)>,
}

impl FilmService {
    pub fn new(repo: Arc<dyn FilmRepository>, config: FilmConfig) -> Arc<Self> {
        Arc::new(Self {
            repo,
            config,
            vote_locks: KeyedLocks::new(),
        })
    }

    /// Service over a relational store, creating the schema if needed.
    pub fn with_sql(sql: Arc<dyn SQLStore>, config: FilmConfig) -> Result<Arc<Self>, FilmError> {
        Ok(Self::new(Arc::new(SqlRepository::new(sql)?), config))
    }

    /// Service over a key-value store.
    pub fn with_kv(kv: Arc<dyn KVStore>, config: FilmConfig) -> Result<Arc<Self>, FilmError> {
        Ok(Self::new(Arc::new(KvRepository::new(kv)?), config))
    }

    pub fn config(&self) -> &FilmConfig {
        &self.config
    }

    // ── Lookup helpers ──

    pub(crate) fn require_user(&self, id: i64) -> Result<User, FilmError> {
        self.repo
            .get_user(id)?
            .ok_or_else(|| FilmError::not_found(EntityKind::User, id))
    }

    pub(crate) fn require_film(&self, id: i64) -> Result<(), FilmError> {
        if self.repo.film_exists(id)? {
            Ok(())
        } else {
            Err(FilmError::not_found(EntityKind::Film, id))
        }
    }

    pub(crate) fn require_review(&self, id: i64) -> Result<Review, FilmError> {
        self.repo
            .get_review(id)?
            .ok_or_else(|| FilmError::not_found(EntityKind::Review, id))
    }

    pub(crate) fn require_director(&self, id: i64) -> Result<Director, FilmError> {
        self.repo
            .get_director(id)?
            .ok_or_else(|| FilmError::not_found(EntityKind::Director, id))
    }

    /// Fetch the fan-out rows for `scope` and reconcile them into films.
    pub(crate) fn load_films(&self, scope: &FilmScope) -> Result<Vec<Film>, FilmError> {
        let rows = self.repo.film_rows(scope)?;
        Ok(films_from_rows(&rows)?)
    }
}

/// Resolve an optional result size. Non-positive sizes are rejected.
pub(crate) fn resolve_count(count: Option<i64>, default: i64) -> Result<usize, FilmError> {
    let count = count.unwrap_or(default);
    if count <= 0 {
        return Err(FilmError::invalid(format!("count must be positive, got {}", count)));
    }
    usize::try_from(count).map_err(|_| FilmError::invalid(format!("count {} is too large", count)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_service_codes() {
        let e: filmrate_core::ServiceError = FilmError::NotFound {
            kind: EntityKind::DirectorFilms,
            id: 7,
        }
        .into();
        assert_eq!(e.error_code(), filmrate_core::error::error_code::NOT_FOUND);
        assert_eq!(e.to_string(), "films of director 7 not found");

        let e: filmrate_core::ServiceError = FilmError::InvalidInput("self-friend".into()).into();
        assert_eq!(e.status_code(), 400);

        let e: FilmError = RepoError::Corrupt("bad".into()).into();
        assert!(matches!(e, FilmError::Internal(_)));
    }

    #[test]
    fn only_uniqueness_conflicts_are_caller_errors() {
        let e: FilmError = RepoError::Conflict("email taken".into()).into();
        assert!(matches!(e, FilmError::InvalidInput(ref m) if m == "email taken"));

        let e: FilmError = RepoError::Dangling("FOREIGN KEY constraint failed".into()).into();
        assert!(matches!(e, FilmError::Storage(_)));
        let e: filmrate_core::ServiceError = e.into();
        assert_eq!(e.status_code(), 500);
    }

    #[test]
    fn counts_must_be_positive() {
        assert_eq!(resolve_count(None, 10).unwrap(), 10);
        assert_eq!(resolve_count(Some(3), 10).unwrap(), 3);
        assert!(matches!(resolve_count(Some(0), 10), Err(FilmError::InvalidInput(_))));
        assert!(matches!(resolve_count(Some(-2), 10), Err(FilmError::InvalidInput(_))));
    }

    #[test]
    fn config_defaults_and_partial_overrides() {
        let cfg = FilmConfig::default();
        assert_eq!(cfg.earliest_release_date.to_string(), "1895-12-28");
        let cfg: FilmConfig = serde_json::from_str(r#"{"popular_default_count": 5}"#).unwrap();
        assert_eq!(cfg.popular_default_count, 5);
        assert_eq!(cfg.reviews_default_count, 10);
    }
}
