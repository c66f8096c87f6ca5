//! Storage seam for the film module.
//!
//! `FilmRepository` is implemented twice: `SqlRepository` over a relational
//! `SQLStore`, and `KvRepository` over a `KVStore`. Both hand out film data
//! as fan-out rows of the same column shape (see `reconcile::film_columns`),
//! so reconciliation and everything above it does not care which one runs.

pub mod kv;
pub mod schema;
pub mod sql;

use std::collections::BTreeSet;

use filmrate_kv::KVError;
use filmrate_sql::{Row, SQLError};
use thiserror::Error;

use crate::model::{
    Director, FilmInput, Genre, Mpa, Review, ReviewEdit, ReviewInput, User, UserInput, VoteKind,
};

pub use kv::KvRepository;
pub use sql::SqlRepository;

#[derive(Debug, Error)]
pub enum RepoError {
    /// A uniqueness or check constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A reference points at a missing record, or the write would leave one
    /// that does.
    #[error("dangling reference: {0}")]
    Dangling(String),

    #[error("storage: {0}")]
    Storage(String),

    /// Stored data could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<SQLError> for RepoError {
    fn from(e: SQLError) -> Self {
        match e {
            SQLError::Constraint(m) => RepoError::Conflict(m),
            SQLError::ForeignKey(m) => RepoError::Dangling(m),
            other => RepoError::Storage(other.to_string()),
        }
    }
}

impl From<KVError> for RepoError {
    fn from(e: KVError) -> Self {
        match e {
            KVError::Serialization(m) => RepoError::Corrupt(m),
            KVError::Storage(m) => RepoError::Storage(m),
        }
    }
}

/// Which films a fan-out query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilmScope {
    All,
    Ids(Vec<i64>),
    /// Films the director is linked to.
    Director(i64),
}

/// A directed membership relation between two ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// user -> friend. Not reciprocal.
    Friend,
    /// film -> user who liked it.
    Like,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Friend => "friend",
            Relation::Like => "like",
        }
    }
}

/// Persistence for films, users, reviews, directors, catalogs and the
/// engagement relations between them.
///
/// Methods that update or delete by id return whether the record existed.
/// Deletes remove the record plus what it owns (a film's genre and director
/// links, a director's film links, a review's votes) in one commit; the
/// service layer cascades everything else first.
pub trait FilmRepository: Send + Sync {
    // films

    fn insert_film(&self, input: &FilmInput) -> Result<i64, RepoError>;

    /// Overwrite scalar fields and replace genre and director links.
    fn update_film(&self, id: i64, input: &FilmInput) -> Result<bool, RepoError>;

    fn delete_film(&self, id: i64) -> Result<bool, RepoError>;

    fn film_exists(&self, id: i64) -> Result<bool, RepoError>;

    /// Fan-out rows for the films in `scope`, ordered by film id. Genres and
    /// directors appear in link order.
    fn film_rows(&self, scope: &FilmScope) -> Result<Vec<Row>, RepoError>;

    // users

    fn insert_user(&self, input: &UserInput) -> Result<i64, RepoError>;

    fn get_user(&self, id: i64) -> Result<Option<User>, RepoError>;

    /// All users ordered by id.
    fn list_users(&self) -> Result<Vec<User>, RepoError>;

    fn find_user_by_email(&self, email: &str) -> Result<Option<i64>, RepoError>;

    fn update_user(&self, id: i64, input: &UserInput) -> Result<bool, RepoError>;

    fn delete_user(&self, id: i64) -> Result<bool, RepoError>;

    // reviews

    fn insert_review(&self, input: &ReviewInput) -> Result<i64, RepoError>;

    fn get_review(&self, id: i64) -> Result<Option<Review>, RepoError>;

    /// Reviews of one film, or of every film, in id order.
    fn list_reviews(&self, film_id: Option<i64>) -> Result<Vec<Review>, RepoError>;

    fn reviews_by_user(&self, user_id: i64) -> Result<Vec<Review>, RepoError>;

    /// Change content and polarity; score, author and film are untouched.
    fn update_review(&self, id: i64, edit: &ReviewEdit) -> Result<bool, RepoError>;

    /// Delete a review and every vote on it in one commit. Returns the
    /// number of votes dropped, or `None` when the review did not exist.
    fn delete_review(&self, id: i64) -> Result<Option<u64>, RepoError>;

    // directors

    fn insert_director(&self, name: &str) -> Result<i64, RepoError>;

    fn get_director(&self, id: i64) -> Result<Option<Director>, RepoError>;

    fn list_directors(&self) -> Result<Vec<Director>, RepoError>;

    fn update_director(&self, id: i64, name: &str) -> Result<bool, RepoError>;

    fn delete_director(&self, id: i64) -> Result<bool, RepoError>;

    // catalogs

    fn get_genre(&self, id: i64) -> Result<Option<Genre>, RepoError>;

    fn list_genres(&self) -> Result<Vec<Genre>, RepoError>;

    fn get_mpa(&self, id: i64) -> Result<Option<Mpa>, RepoError>;

    fn list_mpa(&self) -> Result<Vec<Mpa>, RepoError>;

    // edges

    /// Returns true when the edge was not present before.
    fn add_edge(&self, rel: Relation, source: i64, target: i64) -> Result<bool, RepoError>;

    /// Returns true when the edge was present.
    fn remove_edge(&self, rel: Relation, source: i64, target: i64) -> Result<bool, RepoError>;

    fn targets(&self, rel: Relation, source: i64) -> Result<BTreeSet<i64>, RepoError>;

    fn sources(&self, rel: Relation, target: i64) -> Result<BTreeSet<i64>, RepoError>;

    // votes

    fn vote(&self, review_id: i64, user_id: i64) -> Result<Option<VoteKind>, RepoError>;

    /// `(review_id, kind)` for every vote the user holds, by review id.
    fn votes_by_user(&self, user_id: i64) -> Result<Vec<(i64, VoteKind)>, RepoError>;

    /// Set the vote slot to `to` and add `delta` to the review's score in
    /// one atomic write. Returns false, writing nothing, when the review is
    /// gone by the time the write lands.
    fn commit_vote(
        &self,
        review_id: i64,
        user_id: i64,
        to: Option<VoteKind>,
        delta: i64,
    ) -> Result<bool, RepoError>;
}
