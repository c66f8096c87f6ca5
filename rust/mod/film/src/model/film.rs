use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Director, Genre, Mpa};

/// A film with its reconciled child collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub id: i64,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub release_date: NaiveDate,

    /// Running time in minutes.
    pub duration: i64,

    pub mpa: Mpa,

    /// Unique by id, in first-seen order.
    #[serde(default)]
    pub genres: Vec<Genre>,

    /// Unique by id, in first-seen order.
    #[serde(default)]
    pub directors: Vec<Director>,

    /// Ids of users who liked the film.
    #[serde(default)]
    pub likes: BTreeSet<i64>,
}

impl Film {
    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    pub fn has_director(&self, director_id: i64) -> bool {
        self.directors.iter().any(|d| d.id == director_id)
    }
}

/// Writable film fields. Used for create, and as the merge-patch base on
/// update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmInput {
    pub name: String,

    #[serde(default)]
    pub description: String,

    pub release_date: NaiveDate,

    pub duration: i64,

    pub mpa_id: i64,

    #[serde(default)]
    pub genre_ids: Vec<i64>,

    #[serde(default)]
    pub director_ids: Vec<i64>,
}

impl FilmInput {
    /// Drop repeated genre and director ids, keeping the first occurrence.
    pub fn dedup_links(&mut self) {
        dedup_keep_first(&mut self.genre_ids);
        dedup_keep_first(&mut self.director_ids);
    }
}

impl From<&Film> for FilmInput {
    fn from(film: &Film) -> Self {
        Self {
            name: film.name.clone(),
            description: film.description.clone(),
            release_date: film.release_date,
            duration: film.duration,
            mpa_id: film.mpa.id,
            genre_ids: film.genres.iter().map(|g| g.id).collect(),
            director_ids: film.directors.iter().map(|d| d.id).collect(),
        }
    }
}

fn dedup_keep_first(ids: &mut Vec<i64>) {
    let mut seen = BTreeSet::new();
    ids.retain(|id| seen.insert(*id));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_links_keeps_first_seen_order() {
        let mut input = FilmInput {
            name: "Heat".into(),
            description: String::new(),
            release_date: NaiveDate::from_ymd_opt(1995, 12, 15).unwrap(),
            duration: 170,
            mpa_id: 4,
            genre_ids: vec![4, 2, 4, 6, 2],
            director_ids: vec![9, 9],
        };
        input.dedup_links();
        assert_eq!(input.genre_ids, vec![4, 2, 6]);
        assert_eq!(input.director_ids, vec![9]);
    }
}
