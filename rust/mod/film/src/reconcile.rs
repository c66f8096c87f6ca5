//! Row stream reconciliation.
//!
//! A query that joins a parent table against several one-to-many child
//! tables at once returns one row per combination of children: a film with
//! 3 genres, 2 directors and 4 likes comes back as 24 rows. This module
//! folds such a row stream back into one entity per parent, each carrying
//! one deduplicated, insertion-ordered collection per child group.
//!
//! Reconciliation is pure: it reads an already-fetched batch of rows and
//! performs no I/O, so the same input always yields the same output no
//! matter which storage backend produced the rows.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use filmrate_sql::Row;
use thiserror::Error;

use crate::model::{Director, Film, Genre, Mpa};

/// The row stream violates the fan-out shape contract.
///
/// This is a query bug on the producing side, never a user error.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("row {row}: parent id column '{column}' is missing or not an integer")]
    MissingParentId { row: usize, column: &'static str },

    #[error("row {row}: cannot build parent {id}: {reason}")]
    BadParent { row: usize, id: i64, reason: String },
}

/// Column names of one child group inside a fan-out row.
#[derive(Debug, Clone, Copy)]
pub struct ChildGroup {
    pub id_column: &'static str,
    pub name_column: Option<&'static str>,
}

/// One child as read from a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    pub id: i64,
    pub name: Option<String>,
}

/// An insertion-ordered collection of children, unique by id.
#[derive(Debug, Clone, Default)]
pub struct OrderedChildren {
    items: Vec<Child>,
    seen: HashSet<i64>,
}

impl OrderedChildren {
    pub fn contains(&self, id: i64) -> bool {
        self.seen.contains(&id)
    }

    /// Append `child` unless a child with the same id is already present.
    /// Returns whether it was added.
    pub fn insert(&mut self, child: Child) -> bool {
        if !self.seen.insert(child.id) {
            return false;
        }
        self.items.push(child);
        true
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Child> {
        self.items.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.items.iter().map(|c| c.id)
    }

    pub fn into_vec(self) -> Vec<Child> {
        self.items
    }
}

/// A reconciled parent and its child groups, in the order the groups were
/// declared.
#[derive(Debug, Clone)]
pub struct Reconciled<P> {
    pub parent: P,
    pub groups: Vec<OrderedChildren>,
}

/// Fold a fan-out row stream into one entry per parent id.
///
/// Parents come out in first-seen order. The first row of each parent
/// builds it through `build_parent`; later rows only contribute children.
/// Rows whose child id column is NULL contribute nothing to that group.
pub fn reconcile<P, F>(
    rows: &[Row],
    parent_id_column: &'static str,
    groups: &[ChildGroup],
    mut build_parent: F,
) -> Result<Vec<Reconciled<P>>, ReconcileError>
where
    F: FnMut(&Row) -> Result<P, String>,
{
    let mut entries: Vec<Reconciled<P>> = Vec::new();
    let mut index: HashMap<i64, usize> = HashMap::new();

    for (row_no, row) in rows.iter().enumerate() {
        let id = row
            .get_i64(parent_id_column)
            .ok_or(ReconcileError::MissingParentId {
                row: row_no,
                column: parent_id_column,
            })?;

        let slot = match index.get(&id) {
            Some(&slot) => slot,
            None => {
                let parent = build_parent(row).map_err(|reason| ReconcileError::BadParent {
                    row: row_no,
                    id,
                    reason,
                })?;
                entries.push(Reconciled {
                    parent,
                    groups: vec![OrderedChildren::default(); groups.len()],
                });
                index.insert(id, entries.len() - 1);
                entries.len() - 1
            }
        };

        let entry = &mut entries[slot];
        for (group, children) in groups.iter().zip(entry.groups.iter_mut()) {
            let Some(child_id) = row.get_i64(group.id_column) else {
                continue;
            };
            if children.contains(child_id) {
                continue;
            }
            let name = group
                .name_column
                .and_then(|col| row.get_str(col))
                .map(str::to_string);
            children.insert(Child { id: child_id, name });
        }
    }

    Ok(entries)
}

/// Column names of the film fan-out shape. Every repository backend emits
/// rows with exactly these columns.
pub mod film_columns {
    pub const ID: &str = "id";
    pub const NAME: &str = "name";
    pub const DESCRIPTION: &str = "description";
    pub const RELEASE_DATE: &str = "release_date";
    pub const DURATION: &str = "duration";
    pub const MPA_ID: &str = "mpa_id";
    pub const MPA_NAME: &str = "mpa_name";
    pub const GENRE_ID: &str = "genre_id";
    pub const GENRE_NAME: &str = "genre_name";
    pub const DIRECTOR_ID: &str = "director_id";
    pub const DIRECTOR_NAME: &str = "director_name";
    pub const LIKER_ID: &str = "liker_id";
}

/// Child groups of the film shape: genres, directors, likers.
pub const FILM_GROUPS: [ChildGroup; 3] = [
    ChildGroup {
        id_column: film_columns::GENRE_ID,
        name_column: Some(film_columns::GENRE_NAME),
    },
    ChildGroup {
        id_column: film_columns::DIRECTOR_ID,
        name_column: Some(film_columns::DIRECTOR_NAME),
    },
    ChildGroup {
        id_column: film_columns::LIKER_ID,
        name_column: None,
    },
];

/// Storage format of `release_date`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

struct FilmHead {
    id: i64,
    name: String,
    description: String,
    release_date: NaiveDate,
    duration: i64,
    mpa: Mpa,
}

fn film_head(row: &Row) -> Result<FilmHead, String> {
    use film_columns as c;

    let text = |col: &str| {
        row.get_str(col)
            .map(str::to_string)
            .ok_or_else(|| format!("column '{}' missing", col))
    };
    let int = |col: &str| row.get_i64(col).ok_or_else(|| format!("column '{}' missing", col));

    let release_date = NaiveDate::parse_from_str(&text(c::RELEASE_DATE)?, DATE_FORMAT)
        .map_err(|e| format!("bad release_date: {}", e))?;

    Ok(FilmHead {
        id: int(c::ID)?,
        name: text(c::NAME)?,
        description: row.get_str(c::DESCRIPTION).unwrap_or_default().to_string(),
        release_date,
        duration: int(c::DURATION)?,
        mpa: Mpa {
            id: int(c::MPA_ID)?,
            name: text(c::MPA_NAME)?,
        },
    })
}

/// Reconcile film fan-out rows into films, in first-seen order.
pub fn films_from_rows(rows: &[Row]) -> Result<Vec<Film>, ReconcileError> {
    let entries = reconcile(rows, film_columns::ID, &FILM_GROUPS, film_head)?;

    Ok(entries
        .into_iter()
        .map(|entry| {
            let mut groups = entry.groups.into_iter();
            let genres = groups.next().unwrap_or_default();
            let directors = groups.next().unwrap_or_default();
            let likers = groups.next().unwrap_or_default();
            let head = entry.parent;

            Film {
                id: head.id,
                name: head.name,
                description: head.description,
                release_date: head.release_date,
                duration: head.duration,
                mpa: head.mpa,
                genres: genres
                    .into_vec()
                    .into_iter()
                    .map(|c| Genre {
                        id: c.id,
                        name: c.name.unwrap_or_default(),
                    })
                    .collect(),
                directors: directors
                    .into_vec()
                    .into_iter()
                    .map(|c| Director {
                        id: c.id,
                        name: c.name.unwrap_or_default(),
                    })
                    .collect(),
                likes: likers.ids().collect::<BTreeSet<i64>>(),
            }
        })
        .collect())
}
