use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::model::{Film, Review, User};
use crate::repo::{FilmScope, Relation};
use crate::service::{resolve_count, EntityKind, FilmError, FilmService};

/// Ordering of a director's filmography.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilmSort {
    /// Release date ascending.
    Year,
    /// Like count descending.
    Likes,
}

impl FromStr for FilmSort {
    type Err = FilmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "year" => Ok(FilmSort::Year),
            "likes" => Ok(FilmSort::Likes),
            other => Err(FilmError::invalid(format!(
                "unknown sort key '{}', expected year|likes",
                other
            ))),
        }
    }
}

impl fmt::Display for FilmSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FilmSort::Year => "year",
            FilmSort::Likes => "likes",
        })
    }
}

/// Most likes first; equal counts by ascending id.
fn by_likes(a: &Film, b: &Film) -> Ordering {
    b.like_count()
        .cmp(&a.like_count())
        .then_with(|| a.id.cmp(&b.id))
}

fn by_release(a: &Film, b: &Film) -> Ordering {
    a.release_date
        .cmp(&b.release_date)
        .then_with(|| a.id.cmp(&b.id))
}

impl FilmService {
    /// The `count` most liked films. Defaults to the configured size.
    pub fn popular_films(&self, count: Option<i64>) -> Result<Vec<Film>, FilmError> {
        let count = resolve_count(count, self.config.popular_default_count)?;
        let mut films = self.load_films(&FilmScope::All)?;
        films.sort_by(by_likes);
        films.truncate(count);
        Ok(films)
    }

    /// Films the director worked on, sorted by `sort_by` (`year` or `likes`).
    pub fn director_films(&self, director_id: i64, sort_by: &str) -> Result<Vec<Film>, FilmError> {
        let sort: FilmSort = sort_by.parse()?;
        self.require_director(director_id)?;

        let mut films = self.load_films(&FilmScope::Director(director_id))?;
        if films.is_empty() {
            return Err(FilmError::not_found(EntityKind::DirectorFilms, director_id));
        }

        match sort {
            FilmSort::Year => films.sort_by(by_release),
            FilmSort::Likes => films.sort_by(by_likes),
        }
        Ok(films)
    }

    /// Films both users liked, most liked first.
    pub fn common_films(&self, user_id: i64, other_id: i64) -> Result<Vec<Film>, FilmError> {
        self.require_user(user_id)?;
        self.require_user(other_id)?;

        let mine = self.repo.sources(Relation::Like, user_id)?;
        let theirs = self.repo.sources(Relation::Like, other_id)?;
        let shared: Vec<i64> = mine.intersection(&theirs).copied().collect();
        if shared.is_empty() {
            return Ok(Vec::new());
        }

        let mut films = self.load_films(&FilmScope::Ids(shared))?;
        films.sort_by(by_likes);
        Ok(films)
    }

    /// Users both users point a friendship edge at, by id.
    pub fn common_friends(&self, user_id: i64, other_id: i64) -> Result<Vec<User>, FilmError> {
        let mut users = Vec::new();
        for id in self.common_friend_ids(user_id, other_id)? {
            // A friend deleted between the two reads is simply skipped.
            if let Some(user) = self.repo.get_user(id)? {
                users.push(user);
            }
        }
        Ok(users)
    }

    /// The user's friends as full records, by id.
    pub fn friends(&self, user_id: i64) -> Result<Vec<User>, FilmError> {
        let mut users = Vec::new();
        for id in self.friends_of(user_id)? {
            if let Some(user) = self.repo.get_user(id)? {
                users.push(user);
            }
        }
        Ok(users)
    }

    /// Reviews of one film (or of every film), most useful first, equal
    /// scores by ascending id.
    pub fn reviews(&self, film_id: Option<i64>, count: Option<i64>) -> Result<Vec<Review>, FilmError> {
        let count = resolve_count(count, self.config.reviews_default_count)?;
        if let Some(film_id) = film_id {
            self.require_film(film_id)?;
        }

        let mut reviews = self.repo.list_reviews(film_id)?;
        reviews.sort_by(|a, b| b.useful.cmp(&a.useful).then_with(|| a.id.cmp(&b.id)));
        reviews.truncate(count);
        Ok(reviews)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DirectorInput;
    use crate::service::testutil::*;

    #[test]
    fn popular_breaks_ties_by_id() {
        for (backend, svc) in backends() {
            let a = add_film(&svc, "A");
            let b = add_film(&svc, "B");
            let c = add_film(&svc, "C");
            let users: Vec<i64> = (0..3).map(|i| add_user(&svc, &format!("u{}", i))).collect();
            for u in &users {
                svc.like(a, *u).unwrap();
                svc.like(c, *u).unwrap();
            }
            svc.like(b, users[0]).unwrap();

            let top: Vec<i64> = svc.popular_films(Some(2)).unwrap().iter().map(|f| f.id).collect();
            assert_eq!(top, vec![a, c], "{}", backend);

            let all: Vec<i64> = svc.popular_films(None).unwrap().iter().map(|f| f.id).collect();
            assert_eq!(all, vec![a, c, b]);

            assert!(matches!(svc.popular_films(Some(0)), Err(FilmError::InvalidInput(_))));
            assert!(matches!(svc.popular_films(Some(-1)), Err(FilmError::InvalidInput(_))));
        }
    }

    #[test]
    fn director_films_sorting() {
        for (backend, svc) in backends() {
            let d = svc.create_director(DirectorInput { name: "Nolan".into() }).unwrap().id;
            let other = svc.create_director(DirectorInput { name: "Other".into() }).unwrap().id;
            let mut ids = Vec::new();
            for (name, year) in [("late", 2006), ("early", 2002), ("middle", 2004)] {
                let mut input = film_input(name, year);
                input.director_ids = vec![other, d];
                ids.push(svc.create_film(input).unwrap().id);
            }
            svc.create_film(film_input("unrelated", 2003)).unwrap();
            let u = add_user(&svc, "u");
            svc.like(ids[0], u).unwrap();

            let years: Vec<i32> = svc
                .director_films(d, "year")
                .unwrap()
                .iter()
                .map(|f| chrono::Datelike::year(&f.release_date))
                .collect();
            assert_eq!(years, vec![2002, 2004, 2006], "{}", backend);

            let by_likes: Vec<i64> = svc.director_films(d, "likes").unwrap().iter().map(|f| f.id).collect();
            assert_eq!(by_likes, vec![ids[0], ids[1], ids[2]]);

            // Every director of a matching film is kept.
            let films = svc.director_films(d, "year").unwrap();
            assert_eq!(films[0].directors.len(), 2);
            assert!(films.iter().all(|f| f.has_director(d) && f.has_director(other)));

            assert!(matches!(svc.director_films(d, "bogus"), Err(FilmError::InvalidInput(_))));
        }
    }

    #[test]
    fn director_films_not_found_cases() {
        for (_, svc) in backends() {
            assert!(matches!(
                svc.director_films(77, "year"),
                Err(FilmError::NotFound { kind: EntityKind::Director, id: 77 })
            ));
            let idle = svc.create_director(DirectorInput { name: "Idle".into() }).unwrap().id;
            assert!(matches!(
                svc.director_films(idle, "likes"),
                Err(FilmError::NotFound { kind: EntityKind::DirectorFilms, .. })
            ));
        }
    }

    #[test]
    fn common_films_are_reconstructed_and_ordered() {
        for (_, svc) in backends() {
            let a = add_user(&svc, "a");
            let b = add_user(&svc, "b");
            let c = add_user(&svc, "c");
            let f1 = add_film(&svc, "one");
            let f2 = add_film(&svc, "two");
            let f3 = add_film(&svc, "three");
            for f in [f1, f2, f3] {
                svc.like(f, a).unwrap();
            }
            for f in [f1, f2] {
                svc.like(f, b).unwrap();
            }
            svc.like(f2, c).unwrap();

            let shared = svc.common_films(a, b).unwrap();
            assert_eq!(shared.iter().map(|f| f.id).collect::<Vec<_>>(), vec![f2, f1]);
            assert_eq!(shared[0].like_count(), 3);
            assert!(svc.common_films(b, c).unwrap().iter().all(|f| f.id == f2));
            assert!(matches!(svc.common_films(a, 404), Err(FilmError::NotFound { .. })));
        }
    }

    #[test]
    fn common_friends_as_users() {
        for (_, svc) in backends() {
            let a = add_user(&svc, "a");
            let b = add_user(&svc, "b");
            let x = add_user(&svc, "x");
            let y = add_user(&svc, "y");
            svc.add_friend(a, y).unwrap();
            svc.add_friend(a, x).unwrap();
            svc.add_friend(b, x).unwrap();
            svc.add_friend(b, y).unwrap();
            svc.add_friend(x, a).unwrap();

            let logins: Vec<String> = svc
                .common_friends(a, b)
                .unwrap()
                .into_iter()
                .map(|u| u.login)
                .collect();
            assert_eq!(logins, vec!["x", "y"]);
            assert_eq!(svc.friends(a).unwrap().len(), 2);
            assert!(svc.common_friends(a, x).unwrap().is_empty());
        }
    }

    #[test]
    fn reviews_rank_by_usefulness() {
        for (backend, svc) in backends() {
            let voters: Vec<i64> = (0..3).map(|i| add_user(&svc, &format!("v{}", i))).collect();
            let f = add_film(&svc, "f");
            let g = add_film(&svc, "g");
            let r1 = add_review(&svc, f, voters[0]);
            let r2 = add_review(&svc, f, voters[1]);
            let r3 = add_review(&svc, f, voters[2]);
            let other = add_review(&svc, g, voters[0]);

            svc.like_review(r2, voters[0]).unwrap();
            svc.dislike_review(r1, voters[1]).unwrap();

            let ids: Vec<i64> = svc.reviews(Some(f), None).unwrap().iter().map(|r| r.id).collect();
            assert_eq!(ids, vec![r2, r3, r1], "{}", backend);

            let top: Vec<i64> = svc.reviews(None, Some(2)).unwrap().iter().map(|r| r.id).collect();
            assert_eq!(top, vec![r2, r3]);
            assert_eq!(svc.reviews(None, None).unwrap().len(), 4);
            assert!(svc.reviews(Some(g), None).unwrap().iter().all(|r| r.id == other));

            assert!(matches!(svc.reviews(Some(f), Some(0)), Err(FilmError::InvalidInput(_))));
            assert!(matches!(svc.reviews(Some(999), None), Err(FilmError::NotFound { .. })));
        }
    }
}
