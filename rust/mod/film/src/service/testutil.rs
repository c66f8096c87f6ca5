use std::sync::Arc;

use chrono::NaiveDate;
use filmrate_kv::MemoryKV;
use filmrate_sql::sqlite::SqliteStore;

use crate::model::{FilmInput, ReviewInput, UserInput};
use crate::service::{FilmConfig, FilmService};

/// One fresh service per storage backend. Scenarios run against each.
pub fn backends() -> Vec<(&'static str, Arc<FilmService>)> {
    let sql = FilmService::with_sql(
        Arc::new(SqliteStore::open_in_memory().unwrap()),
        FilmConfig::default(),
    )
    .unwrap();
    let kv = FilmService::with_kv(Arc::new(MemoryKV::new()), FilmConfig::default()).unwrap();
    vec![("sqlite", sql), ("memory", kv)]
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn user_input(login: &str) -> UserInput {
    UserInput {
        email: format!("{}@example.com", login),
        login: login.to_string(),
        name: String::new(),
        birthday: date(1990, 6, 1),
    }
}

pub fn film_input(name: &str, year: i32) -> FilmInput {
    FilmInput {
        name: name.to_string(),
        description: format!("about {}", name),
        release_date: date(year, 1, 15),
        duration: 110,
        mpa_id: 1,
        genre_ids: vec![],
        director_ids: vec![],
    }
}

pub fn add_user(svc: &FilmService, login: &str) -> i64 {
    svc.create_user(user_input(login)).unwrap().id
}

pub fn add_film(svc: &FilmService, name: &str) -> i64 {
    svc.create_film(film_input(name, 2000)).unwrap().id
}

pub fn add_review(svc: &FilmService, film_id: i64, user_id: i64) -> i64 {
    svc.create_review(ReviewInput {
        content: "worth a watch".to_string(),
        is_positive: true,
        user_id,
        film_id,
    })
    .unwrap()
    .id
}
