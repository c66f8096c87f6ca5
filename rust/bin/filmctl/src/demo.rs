//! A small dataset for trying the queries against an empty store.

use chrono::NaiveDate;
use film::model::{DirectorInput, FilmInput, ReviewInput, UserInput};
use film::{FilmError, FilmService};
use serde::Serialize;
use tracing::info;

/// Ids assigned while seeding. All empty when the store already held the
/// dataset.
#[derive(Debug, Default, Serialize)]
pub struct Seeded {
    pub already_present: bool,
    pub users: Vec<i64>,
    pub directors: Vec<i64>,
    pub films: Vec<i64>,
    pub reviews: Vec<i64>,
}

fn day(y: i32, m: u32, d: u32) -> Result<NaiveDate, FilmError> {
    NaiveDate::from_ymd_opt(y, m, d)
        .ok_or_else(|| FilmError::invalid(format!("bad demo date {}-{}-{}", y, m, d)))
}

fn demo_email(login: &str) -> String {
    format!("{}@films.test", login)
}

const USERS: [(&str, &str, (i32, u32, u32)); 4] = [
    ("ada", "Ada", (1990, 12, 10)),
    ("brian", "", (1985, 3, 2)),
    ("chloe", "Chloe", (2001, 7, 21)),
    ("dmitri", "Dmitri", (1978, 1, 30)),
];

/// Write the dataset unless a previous run already did. The first demo
/// user marks a seeded store.
pub fn seed(svc: &FilmService) -> Result<Seeded, FilmError> {
    let marker = demo_email(USERS[0].0);
    if svc.list_users()?.iter().any(|u| u.email == marker) {
        info!("Demo dataset already present, skipping");
        return Ok(Seeded {
            already_present: true,
            ..Default::default()
        });
    }

    let mut out = Seeded::default();
    for (login, name, (y, m, d)) in USERS {
        let user = svc.create_user(UserInput {
            email: demo_email(login),
            login: login.into(),
            name: name.into(),
            birthday: day(y, m, d)?,
        })?;
        out.users.push(user.id);
    }

    for name in ["Christopher Nolan", "Hayao Miyazaki"] {
        out.directors.push(svc.create_director(DirectorInput { name: name.into() })?.id);
    }
    let (nolan, miyazaki) = (out.directors[0], out.directors[1]);

    let films = [
        ("Memento", (2000, 9, 5), 113, 4, vec![4], vec![nolan]),
        ("Spirited Away", (2001, 7, 20), 125, 1, vec![3], vec![miyazaki]),
        ("Inception", (2010, 7, 8), 148, 3, vec![4, 6], vec![nolan]),
        ("My Neighbor Totoro", (1988, 4, 16), 86, 1, vec![3, 2], vec![miyazaki]),
        ("Nanook of the North", (1922, 6, 11), 79, 1, vec![5], vec![]),
    ];
    for (name, (y, m, d), duration, mpa_id, genre_ids, director_ids) in films {
        let film = svc.create_film(FilmInput {
            name: name.into(),
            description: String::new(),
            release_date: day(y, m, d)?,
            duration,
            mpa_id,
            genre_ids,
            director_ids,
        })?;
        out.films.push(film.id);
    }

    let u = &out.users;
    let f = &out.films;
    for (film, users) in [(f[0], &u[..3]), (f[1], &u[..]), (f[2], &u[1..3]), (f[3], &u[2..])] {
        for user in users {
            svc.like(film, *user)?;
        }
    }
    for (a, b) in [(u[0], u[2]), (u[1], u[2]), (u[0], u[3]), (u[1], u[3]), (u[2], u[0])] {
        svc.add_friend(a, b)?;
    }

    for (film, user, positive, text) in [
        (f[0], u[0], true, "Backwards done right."),
        (f[0], u[1], false, "Too clever by half."),
        (f[1], u[2], true, "Still the best."),
    ] {
        let review = svc.create_review(ReviewInput {
            content: text.into(),
            is_positive: positive,
            user_id: user,
            film_id: film,
        })?;
        out.reviews.push(review.id);
    }
    let r = &out.reviews;
    svc.like_review(r[0], u[2])?;
    svc.like_review(r[0], u[3])?;
    svc.dislike_review(r[1], u[0])?;

    info!(
        users = out.users.len(),
        films = out.films.len(),
        reviews = out.reviews.len(),
        "Demo dataset seeded"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use film::FilmConfig;
    use filmrate_kv::MemoryKV;
    use std::sync::Arc;

    #[test]
    fn seeded_dataset_answers_queries() {
        let svc = FilmService::with_kv(Arc::new(MemoryKV::new()), FilmConfig::default()).unwrap();
        let ids = seed(&svc).unwrap();

        let top = svc.popular_films(Some(1)).unwrap();
        assert_eq!(top[0].id, ids.films[1]);

        let reviews = svc.reviews(Some(ids.films[0]), None).unwrap();
        assert_eq!(reviews[0].useful, 2);
        assert_eq!(reviews[1].useful, -1);

        let common = svc.common_friends(ids.users[0], ids.users[1]).unwrap();
        assert_eq!(common.len(), 2);
        assert_eq!(svc.get_user(ids.users[1]).unwrap().name, "brian");
    }

    #[test]
    fn seeding_twice_leaves_one_copy() {
        let svc = FilmService::with_kv(Arc::new(MemoryKV::new()), FilmConfig::default()).unwrap();
        let first = seed(&svc).unwrap();
        assert!(!first.already_present);

        let second = seed(&svc).unwrap();
        assert!(second.already_present);
        assert!(second.films.is_empty());
        assert_eq!(svc.list_users().unwrap().len(), 4);
        assert_eq!(svc.list_films().unwrap().len(), 5);
    }
}
