use filmrate_sql::{SQLStore, Statement, Value};

use crate::model::{GENRE_SEED, MPA_SEED};
use crate::repo::RepoError;

/// Create the relational schema and seed the catalogs. Idempotent.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), RepoError> {
    let statements = [
        // Catalogs: fixed ids, seeded below
        "CREATE TABLE IF NOT EXISTS mpa (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",
        "CREATE TABLE IF NOT EXISTS genres (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )",

        "CREATE TABLE IF NOT EXISTS directors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        )",

        "CREATE TABLE IF NOT EXISTS films (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            release_date TEXT NOT NULL,
            duration INTEGER NOT NULL,
            mpa_id INTEGER NOT NULL REFERENCES mpa(id)
        )",

        // Film links keep their submission order in `position`
        "CREATE TABLE IF NOT EXISTS film_genres (
            film_id INTEGER NOT NULL REFERENCES films(id),
            genre_id INTEGER NOT NULL REFERENCES genres(id),
            position INTEGER NOT NULL,
            PRIMARY KEY (film_id, genre_id)
        )",
        "CREATE TABLE IF NOT EXISTS film_directors (
            film_id INTEGER NOT NULL REFERENCES films(id),
            director_id INTEGER NOT NULL REFERENCES directors(id),
            position INTEGER NOT NULL,
            PRIMARY KEY (film_id, director_id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_film_directors_director ON film_directors(director_id)",

        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            login TEXT NOT NULL,
            name TEXT NOT NULL,
            birthday TEXT NOT NULL
        )",

        // Directed: (user_id -> friend_id)
        "CREATE TABLE IF NOT EXISTS friends (
            user_id INTEGER NOT NULL REFERENCES users(id),
            friend_id INTEGER NOT NULL REFERENCES users(id),
            PRIMARY KEY (user_id, friend_id),
            CHECK (user_id <> friend_id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_friends_friend ON friends(friend_id)",

        "CREATE TABLE IF NOT EXISTS likes (
            film_id INTEGER NOT NULL REFERENCES films(id),
            user_id INTEGER NOT NULL REFERENCES users(id),
            PRIMARY KEY (film_id, user_id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_likes_user ON likes(user_id)",

        "CREATE TABLE IF NOT EXISTS reviews (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            is_positive INTEGER NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id),
            film_id INTEGER NOT NULL REFERENCES films(id),
            useful INTEGER NOT NULL DEFAULT 0
        )",
        "CREATE INDEX IF NOT EXISTS idx_reviews_film ON reviews(film_id)",
        "CREATE INDEX IF NOT EXISTS idx_reviews_user ON reviews(user_id)",

        "CREATE TABLE IF NOT EXISTS review_votes (
            review_id INTEGER NOT NULL REFERENCES reviews(id),
            user_id INTEGER NOT NULL REFERENCES users(id),
            type TEXT NOT NULL CHECK (type IN ('LIKE', 'DISLIKE')),
            PRIMARY KEY (review_id, user_id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_review_votes_user ON review_votes(user_id)",
    ];

    for stmt in &statements {
        sql.exec(stmt, &[])?;
    }

    let mut seeds = Vec::with_capacity(GENRE_SEED.len() + MPA_SEED.len());
    for (id, name) in GENRE_SEED {
        seeds.push(Statement::new(
            "INSERT OR IGNORE INTO genres (id, name) VALUES (?1, ?2)",
            vec![Value::Integer(*id), Value::from(*name)],
        ));
    }
    for (id, name) in MPA_SEED {
        seeds.push(Statement::new(
            "INSERT OR IGNORE INTO mpa (id, name) VALUES (?1, ?2)",
            vec![Value::Integer(*id), Value::from(*name)],
        ));
    }
    sql.exec_batch(&seeds)?;

    tracing::debug!("film schema ready");
    Ok(())
}
