use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use filmrate_sql::{Row, SQLStore, Statement, Value};

use crate::model::{
    Director, FilmInput, Genre, Mpa, Review, ReviewEdit, ReviewInput, User, UserInput, VoteKind,
};
use crate::reconcile::DATE_FORMAT;
use crate::repo::{schema, FilmRepository, FilmScope, Relation, RepoError};

/// One row per (film, genre link, director link, like). Column aliases match
/// `reconcile::film_columns`.
const FILM_ROWS_SELECT: &str = "
    SELECT f.id AS id, f.name AS name, f.description AS description,
           f.release_date AS release_date, f.duration AS duration,
           m.id AS mpa_id, m.name AS mpa_name,
           g.id AS genre_id, g.name AS genre_name,
           d.id AS director_id, d.name AS director_name,
           l.user_id AS liker_id
    FROM films f
    JOIN mpa m ON m.id = f.mpa_id
    LEFT JOIN film_genres fg ON fg.film_id = f.id
    LEFT JOIN genres g ON g.id = fg.genre_id
    LEFT JOIN film_directors fd ON fd.film_id = f.id
    LEFT JOIN directors d ON d.id = fd.director_id
    LEFT JOIN likes l ON l.film_id = f.id";

const FILM_ROWS_ORDER: &str = "ORDER BY f.id, fg.position, fd.position, l.user_id";

const REVIEW_COLUMNS: &str = "id, content, is_positive, user_id, film_id, useful";

/// `FilmRepository` over a relational store. Ids come from AUTOINCREMENT.
pub struct SqlRepository {
    sql: Arc<dyn SQLStore>,
}

impl SqlRepository {
    /// Wrap `sql`, creating the schema if needed.
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Self, RepoError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Self { sql })
    }

    fn exists(&self, table: &str, id: i64) -> Result<bool, RepoError> {
        let rows = self
            .sql
            .query(&format!("SELECT 1 AS hit FROM {} WHERE id = ?1", table), &[id.into()])?;
        Ok(!rows.is_empty())
    }

    fn link_statements(id: i64, input: &FilmInput) -> Vec<Statement> {
        let mut stmts = Vec::with_capacity(input.genre_ids.len() + input.director_ids.len());
        for (pos, genre_id) in input.genre_ids.iter().enumerate() {
            stmts.push(Statement::new(
                "INSERT OR IGNORE INTO film_genres (film_id, genre_id, position) VALUES (?1, ?2, ?3)",
                vec![id.into(), (*genre_id).into(), (pos as i64).into()],
            ));
        }
        for (pos, director_id) in input.director_ids.iter().enumerate() {
            stmts.push(Statement::new(
                "INSERT OR IGNORE INTO film_directors (film_id, director_id, position) VALUES (?1, ?2, ?3)",
                vec![id.into(), (*director_id).into(), (pos as i64).into()],
            ));
        }
        stmts
    }

    fn named(&self, table: &str, id: i64) -> Result<Option<(i64, String)>, RepoError> {
        let rows = self
            .sql
            .query(&format!("SELECT id, name FROM {} WHERE id = ?1", table), &[id.into()])?;
        rows.first().map(named_from_row).transpose()
    }

    fn all_named(&self, table: &str) -> Result<Vec<(i64, String)>, RepoError> {
        let rows = self
            .sql
            .query(&format!("SELECT id, name FROM {} ORDER BY id", table), &[])?;
        rows.iter().map(named_from_row).collect()
    }

    fn ids(&self, sql: &str, id: i64, column: &str) -> Result<BTreeSet<i64>, RepoError> {
        let rows = self.sql.query(sql, &[id.into()])?;
        rows.iter().map(|r| req_i64(r, column)).collect()
    }

    fn reviews_where(&self, clause: &str, params: &[Value]) -> Result<Vec<Review>, RepoError> {
        let rows = self.sql.query(
            &format!("SELECT {} FROM reviews {} ORDER BY id", REVIEW_COLUMNS, clause),
            params,
        )?;
        rows.iter().map(review_from_row).collect()
    }
}

fn req_i64(row: &Row, column: &str) -> Result<i64, RepoError> {
    row.get_i64(column)
        .ok_or_else(|| RepoError::Corrupt(format!("column '{}' is not an integer", column)))
}

fn req_str<'a>(row: &'a Row, column: &str) -> Result<&'a str, RepoError> {
    row.get_str(column)
        .ok_or_else(|| RepoError::Corrupt(format!("column '{}' is not text", column)))
}

fn date_value(date: NaiveDate) -> Value {
    Value::Text(date.format(DATE_FORMAT).to_string())
}

fn req_date(row: &Row, column: &str) -> Result<NaiveDate, RepoError> {
    let text = req_str(row, column)?;
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| RepoError::Corrupt(format!("column '{}': {}", column, e)))
}

fn named_from_row(row: &Row) -> Result<(i64, String), RepoError> {
    Ok((req_i64(row, "id")?, req_str(row, "name")?.to_string()))
}

fn user_from_row(row: &Row) -> Result<User, RepoError> {
    Ok(User {
        id: req_i64(row, "id")?,
        email: req_str(row, "email")?.to_string(),
        login: req_str(row, "login")?.to_string(),
        name: req_str(row, "name")?.to_string(),
        birthday: req_date(row, "birthday")?,
        friends: BTreeSet::new(),
    })
}

fn review_from_row(row: &Row) -> Result<Review, RepoError> {
    Ok(Review {
        id: req_i64(row, "id")?,
        content: req_str(row, "content")?.to_string(),
        is_positive: row
            .get_bool("is_positive")
            .ok_or_else(|| RepoError::Corrupt("column 'is_positive' is not a flag".into()))?,
        user_id: req_i64(row, "user_id")?,
        film_id: req_i64(row, "film_id")?,
        useful: req_i64(row, "useful")?,
    })
}

fn vote_from_row(row: &Row) -> Result<VoteKind, RepoError> {
    req_str(row, "type")?.parse().map_err(RepoError::Corrupt)
}

/// Table and column names of an edge relation: (table, source, target).
fn edge_table(rel: Relation) -> (&'static str, &'static str, &'static str) {
    match rel {
        Relation::Friend => ("friends", "user_id", "friend_id"),
        Relation::Like => ("likes", "film_id", "user_id"),
    }
}

impl FilmRepository for SqlRepository {
    fn insert_film(&self, input: &FilmInput) -> Result<i64, RepoError> {
        let id = self.sql.insert(
            "INSERT INTO films (name, description, release_date, duration, mpa_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            &[
                input.name.as_str().into(),
                input.description.as_str().into(),
                date_value(input.release_date),
                input.duration.into(),
                input.mpa_id.into(),
            ],
        )?;

        let links = Self::link_statements(id, input);
        if let Err(e) = self.sql.exec_batch(&links) {
            // Links failed as a unit; drop the bare film row with them.
            if let Err(cleanup) = self.sql.exec("DELETE FROM films WHERE id = ?1", &[id.into()]) {
                tracing::warn!(film_id = id, error = %cleanup, "failed to remove unlinked film");
            }
            return Err(e.into());
        }
        Ok(id)
    }

    fn update_film(&self, id: i64, input: &FilmInput) -> Result<bool, RepoError> {
        if !self.film_exists(id)? {
            return Ok(false);
        }

        let mut stmts = vec![
            Statement::new(
                "UPDATE films SET name = ?1, description = ?2, release_date = ?3, duration = ?4, mpa_id = ?5
                 WHERE id = ?6",
                vec![
                    input.name.as_str().into(),
                    input.description.as_str().into(),
                    date_value(input.release_date),
                    input.duration.into(),
                    input.mpa_id.into(),
                    id.into(),
                ],
            ),
            Statement::new("DELETE FROM film_genres WHERE film_id = ?1", vec![id.into()]),
            Statement::new("DELETE FROM film_directors WHERE film_id = ?1", vec![id.into()]),
        ];
        stmts.extend(Self::link_statements(id, input));
        self.sql.exec_batch(&stmts)?;
        Ok(true)
    }

    fn delete_film(&self, id: i64) -> Result<bool, RepoError> {
        let stmts = [
            Statement::new("DELETE FROM film_genres WHERE film_id = ?1", vec![id.into()]),
            Statement::new("DELETE FROM film_directors WHERE film_id = ?1", vec![id.into()]),
            Statement::new("DELETE FROM films WHERE id = ?1", vec![id.into()]),
        ];
        // Links cannot outlive their film, so nothing changes unless it existed.
        Ok(self.sql.exec_batch(&stmts)? > 0)
    }

    fn film_exists(&self, id: i64) -> Result<bool, RepoError> {
        self.exists("films", id)
    }

    fn film_rows(&self, scope: &FilmScope) -> Result<Vec<Row>, RepoError> {
        let (clause, params): (String, Vec<Value>) = match scope {
            FilmScope::All => (String::new(), Vec::new()),
            FilmScope::Ids(ids) if ids.is_empty() => return Ok(Vec::new()),
            FilmScope::Ids(ids) => {
                let marks: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
                (
                    format!("WHERE f.id IN ({})", marks.join(", ")),
                    ids.iter().map(|id| Value::Integer(*id)).collect(),
                )
            }
            FilmScope::Director(director_id) => (
                "WHERE f.id IN (SELECT film_id FROM film_directors WHERE director_id = ?1)".to_string(),
                vec![Value::Integer(*director_id)],
            ),
        };

        let sql = format!("{} {} {}", FILM_ROWS_SELECT, clause, FILM_ROWS_ORDER);
        Ok(self.sql.query(&sql, &params)?)
    }

    fn insert_user(&self, input: &UserInput) -> Result<i64, RepoError> {
        Ok(self.sql.insert(
            "INSERT INTO users (email, login, name, birthday) VALUES (?1, ?2, ?3, ?4)",
            &[
                input.email.as_str().into(),
                input.login.as_str().into(),
                input.name.as_str().into(),
                date_value(input.birthday),
            ],
        )?)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>, RepoError> {
        let rows = self.sql.query(
            "SELECT id, email, login, name, birthday FROM users WHERE id = ?1",
            &[id.into()],
        )?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let mut user = user_from_row(row)?;
        user.friends = self.targets(Relation::Friend, id)?;
        Ok(Some(user))
    }

    fn list_users(&self) -> Result<Vec<User>, RepoError> {
        let rows = self
            .sql
            .query("SELECT id, email, login, name, birthday FROM users ORDER BY id", &[])?;

        let mut friends: BTreeMap<i64, BTreeSet<i64>> = BTreeMap::new();
        for row in self.sql.query("SELECT user_id, friend_id FROM friends", &[])? {
            friends
                .entry(req_i64(&row, "user_id")?)
                .or_default()
                .insert(req_i64(&row, "friend_id")?);
        }

        rows.iter()
            .map(|row| -> Result<User, RepoError> {
                let mut user = user_from_row(row)?;
                user.friends = friends.remove(&user.id).unwrap_or_default();
                Ok(user)
            })
            .collect()
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<i64>, RepoError> {
        let rows = self
            .sql
            .query("SELECT id FROM users WHERE email = ?1", &[email.into()])?;
        rows.first().map(|r| req_i64(r, "id")).transpose()
    }

    fn update_user(&self, id: i64, input: &UserInput) -> Result<bool, RepoError> {
        let affected = self.sql.exec(
            "UPDATE users SET email = ?1, login = ?2, name = ?3, birthday = ?4 WHERE id = ?5",
            &[
                input.email.as_str().into(),
                input.login.as_str().into(),
                input.name.as_str().into(),
                date_value(input.birthday),
                id.into(),
            ],
        )?;
        Ok(affected > 0)
    }

    fn delete_user(&self, id: i64) -> Result<bool, RepoError> {
        Ok(self.sql.exec("DELETE FROM users WHERE id = ?1", &[id.into()])? > 0)
    }

    fn insert_review(&self, input: &ReviewInput) -> Result<i64, RepoError> {
        Ok(self.sql.insert(
            "INSERT INTO reviews (content, is_positive, user_id, film_id, useful)
             VALUES (?1, ?2, ?3, ?4, 0)",
            &[
                input.content.as_str().into(),
                input.is_positive.into(),
                input.user_id.into(),
                input.film_id.into(),
            ],
        )?)
    }

    fn get_review(&self, id: i64) -> Result<Option<Review>, RepoError> {
        Ok(self
            .reviews_where("WHERE id = ?1", &[id.into()])?
            .into_iter()
            .next())
    }

    fn list_reviews(&self, film_id: Option<i64>) -> Result<Vec<Review>, RepoError> {
        match film_id {
            Some(film_id) => self.reviews_where("WHERE film_id = ?1", &[film_id.into()]),
            None => self.reviews_where("", &[]),
        }
    }

    fn reviews_by_user(&self, user_id: i64) -> Result<Vec<Review>, RepoError> {
        self.reviews_where("WHERE user_id = ?1", &[user_id.into()])
    }

    fn update_review(&self, id: i64, edit: &ReviewEdit) -> Result<bool, RepoError> {
        let affected = self.sql.exec(
            "UPDATE reviews SET content = ?1, is_positive = ?2 WHERE id = ?3",
            &[edit.content.as_str().into(), edit.is_positive.into(), id.into()],
        )?;
        Ok(affected > 0)
    }

    fn delete_review(&self, id: i64) -> Result<Option<u64>, RepoError> {
        let stmts = [
            Statement::new("DELETE FROM review_votes WHERE review_id = ?1", vec![id.into()]),
            Statement::new("DELETE FROM reviews WHERE id = ?1", vec![id.into()]),
        ];
        // Votes cannot outlive their review: zero rows means no review.
        Ok(self.sql.exec_batch(&stmts)?.checked_sub(1))
    }

    fn insert_director(&self, name: &str) -> Result<i64, RepoError> {
        Ok(self
            .sql
            .insert("INSERT INTO directors (name) VALUES (?1)", &[name.into()])?)
    }

    fn get_director(&self, id: i64) -> Result<Option<Director>, RepoError> {
        Ok(self
            .named("directors", id)?
            .map(|(id, name)| Director { id, name }))
    }

    fn list_directors(&self) -> Result<Vec<Director>, RepoError> {
        Ok(self
            .all_named("directors")?
            .into_iter()
            .map(|(id, name)| Director { id, name })
            .collect())
    }

    fn update_director(&self, id: i64, name: &str) -> Result<bool, RepoError> {
        let affected = self.sql.exec(
            "UPDATE directors SET name = ?1 WHERE id = ?2",
            &[name.into(), id.into()],
        )?;
        Ok(affected > 0)
    }

    fn delete_director(&self, id: i64) -> Result<bool, RepoError> {
        let stmts = [
            Statement::new("DELETE FROM film_directors WHERE director_id = ?1", vec![id.into()]),
            Statement::new("DELETE FROM directors WHERE id = ?1", vec![id.into()]),
        ];
        let existed = self.exists("directors", id)?;
        self.sql.exec_batch(&stmts)?;
        Ok(existed)
    }

    fn get_genre(&self, id: i64) -> Result<Option<Genre>, RepoError> {
        Ok(self.named("genres", id)?.map(|(id, name)| Genre { id, name }))
    }

    fn list_genres(&self) -> Result<Vec<Genre>, RepoError> {
        Ok(self
            .all_named("genres")?
            .into_iter()
            .map(|(id, name)| Genre { id, name })
            .collect())
    }

    fn get_mpa(&self, id: i64) -> Result<Option<Mpa>, RepoError> {
        Ok(self.named("mpa", id)?.map(|(id, name)| Mpa { id, name }))
    }

    fn list_mpa(&self) -> Result<Vec<Mpa>, RepoError> {
        Ok(self
            .all_named("mpa")?
            .into_iter()
            .map(|(id, name)| Mpa { id, name })
            .collect())
    }

    fn add_edge(&self, rel: Relation, source: i64, target: i64) -> Result<bool, RepoError> {
        let (table, src, dst) = edge_table(rel);
        let affected = self.sql.exec(
            &format!("INSERT OR IGNORE INTO {} ({}, {}) VALUES (?1, ?2)", table, src, dst),
            &[source.into(), target.into()],
        )?;
        Ok(affected > 0)
    }

    fn remove_edge(&self, rel: Relation, source: i64, target: i64) -> Result<bool, RepoError> {
        let (table, src, dst) = edge_table(rel);
        let affected = self.sql.exec(
            &format!("DELETE FROM {} WHERE {} = ?1 AND {} = ?2", table, src, dst),
            &[source.into(), target.into()],
        )?;
        Ok(affected > 0)
    }

    fn targets(&self, rel: Relation, source: i64) -> Result<BTreeSet<i64>, RepoError> {
        let (table, src, dst) = edge_table(rel);
        self.ids(
            &format!("SELECT {dst} FROM {table} WHERE {src} = ?1"),
            source,
            dst,
        )
    }

    fn sources(&self, rel: Relation, target: i64) -> Result<BTreeSet<i64>, RepoError> {
        let (table, src, dst) = edge_table(rel);
        self.ids(
            &format!("SELECT {src} FROM {table} WHERE {dst} = ?1"),
            target,
            src,
        )
    }

    fn vote(&self, review_id: i64, user_id: i64) -> Result<Option<VoteKind>, RepoError> {
        let rows = self.sql.query(
            "SELECT type FROM review_votes WHERE review_id = ?1 AND user_id = ?2",
            &[review_id.into(), user_id.into()],
        )?;
        rows.first().map(vote_from_row).transpose()
    }

    fn votes_by_user(&self, user_id: i64) -> Result<Vec<(i64, VoteKind)>, RepoError> {
        let rows = self.sql.query(
            "SELECT review_id, type FROM review_votes WHERE user_id = ?1 ORDER BY review_id",
            &[user_id.into()],
        )?;
        rows.iter()
            .map(|r| -> Result<_, RepoError> { Ok((req_i64(r, "review_id")?, vote_from_row(r)?)) })
            .collect()
    }

    fn commit_vote(
        &self,
        review_id: i64,
        user_id: i64,
        to: Option<VoteKind>,
        delta: i64,
    ) -> Result<bool, RepoError> {
        let slot = match to {
            Some(kind) => Statement::new(
                "INSERT INTO review_votes (review_id, user_id, type)
                 SELECT ?1, ?2, ?3 WHERE EXISTS (SELECT 1 FROM reviews WHERE id = ?1)
                 ON CONFLICT (review_id, user_id) DO UPDATE SET type = excluded.type",
                vec![review_id.into(), user_id.into(), kind.as_str().into()],
            ),
            None => Statement::new(
                "DELETE FROM review_votes WHERE review_id = ?1 AND user_id = ?2",
                vec![review_id.into(), user_id.into()],
            ),
        };
        // Relative update: concurrent voters on one review commute.
        let score = Statement::new(
            "UPDATE reviews SET useful = useful + ?1 WHERE id = ?2",
            vec![delta.into(), review_id.into()],
        );
        // The score row is always touched when the review exists.
        Ok(self.sql.exec_batch(&[slot, score])? > 0)
    }
}
