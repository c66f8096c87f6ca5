use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use filmrate_kv::KVStore;
use filmrate_sql::{Row, Value};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::identity::IdentityAllocator;
use crate::model::{
    Director, FilmInput, Genre, Mpa, Review, ReviewEdit, ReviewInput, User, UserInput, VoteKind,
    GENRE_SEED, MPA_SEED,
};
use crate::reconcile::{film_columns as c, DATE_FORMAT};
use crate::repo::{FilmRepository, FilmScope, Relation, RepoError};

// Record kinds. Keys are `film:{kind}:{id:020}`.
const FILM: &str = "film";
const USER: &str = "user";
const REVIEW: &str = "review";
const DIRECTOR: &str = "director";
const GENRE: &str = "genre";
const MPA: &str = "mpa";
const EMAIL: &str = "email";

// Pair kinds. Keys are `film:{kind}:{a:020}:{b:020}`, each relation stored
// forward and reversed so both directions are a prefix scan.
const FRIEND: &str = "friend";
const FRIEND_IN: &str = "friend_in";
const LIKE: &str = "like";
const LIKED: &str = "liked";
const VOTE: &str = "vote";
const VOTED: &str = "voted";

fn key(kind: &str, id: i64) -> String {
    format!("film:{}:{:020}", kind, id)
}

fn pair_key(kind: &str, a: i64, b: i64) -> String {
    format!("film:{}:{:020}:{:020}", kind, a, b)
}

fn prefix(kind: &str) -> String {
    format!("film:{}:", kind)
}

fn pair_prefix(kind: &str, a: i64) -> String {
    format!("film:{}:{:020}:", kind, a)
}

fn email_key(email: &str) -> String {
    format!("film:{}:{}", EMAIL, email)
}

/// Trailing id segment of a key.
fn tail_id(key: &str) -> Result<i64, RepoError> {
    key.rsplit(':')
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| RepoError::Corrupt(format!("bad key '{}'", key)))
}

fn edge_kinds(rel: Relation) -> (&'static str, &'static str) {
    match rel {
        Relation::Friend => (FRIEND, FRIEND_IN),
        Relation::Like => (LIKE, LIKED),
    }
}

fn encode<T: Serialize>(doc: &T) -> Result<Vec<u8>, RepoError> {
    serde_json::to_vec(doc).map_err(|e| RepoError::Corrupt(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, RepoError> {
    serde_json::from_slice(bytes).map_err(|e| RepoError::Corrupt(e.to_string()))
}

fn decode_vote(bytes: &[u8]) -> Result<VoteKind, RepoError> {
    std::str::from_utf8(bytes)
        .map_err(|e| RepoError::Corrupt(e.to_string()))?
        .parse()
        .map_err(RepoError::Corrupt)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FilmDoc {
    id: i64,
    name: String,
    description: String,
    release_date: NaiveDate,
    duration: i64,
    mpa_id: i64,
    genre_ids: Vec<i64>,
    director_ids: Vec<i64>,
}

impl FilmDoc {
    fn new(id: i64, input: &FilmInput) -> Self {
        let mut input = input.clone();
        input.dedup_links();
        Self {
            id,
            name: input.name,
            description: input.description,
            release_date: input.release_date,
            duration: input.duration,
            mpa_id: input.mpa_id,
            genre_ids: input.genre_ids,
            director_ids: input.director_ids,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserDoc {
    id: i64,
    email: String,
    login: String,
    name: String,
    birthday: NaiveDate,
}

impl UserDoc {
    fn new(id: i64, input: &UserInput) -> Self {
        Self {
            id,
            email: input.email.clone(),
            login: input.login.clone(),
            name: input.name.clone(),
            birthday: input.birthday,
        }
    }

    fn into_user(self, friends: BTreeSet<i64>) -> User {
        User {
            id: self.id,
            email: self.email,
            login: self.login,
            name: self.name,
            birthday: self.birthday,
            friends,
        }
    }
}

/// `FilmRepository` over a key-value store.
///
/// Records are JSON documents. Every mutation runs under one write lock and
/// lands through a single `write_batch`, so readers never see half of one.
/// Ids come from per-kind `IdentityAllocator`s seeded from the stored keys.
pub struct KvRepository {
    kv: Arc<dyn KVStore>,
    write: Mutex<()>,
    film_ids: IdentityAllocator,
    user_ids: IdentityAllocator,
    review_ids: IdentityAllocator,
    director_ids: IdentityAllocator,
}

impl KvRepository {
    /// Wrap `kv`, seeding the catalogs on first use.
    pub fn new(kv: Arc<dyn KVStore>) -> Result<Self, RepoError> {
        let mut seeds: Vec<(String, Vec<u8>)> = Vec::new();
        for (id, name) in GENRE_SEED {
            let k = key(GENRE, *id);
            if kv.get(&k)?.is_none() {
                seeds.push((k, encode(&Genre { id: *id, name: name.to_string() })?));
            }
        }
        for (id, name) in MPA_SEED {
            let k = key(MPA, *id);
            if kv.get(&k)?.is_none() {
                seeds.push((k, encode(&Mpa { id: *id, name: name.to_string() })?));
            }
        }
        if !seeds.is_empty() {
            let sets: Vec<(&str, &[u8])> =
                seeds.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
            kv.batch_set(&sets)?;
            tracing::debug!(count = seeds.len(), "seeded film catalogs");
        }

        let allocator = |kind: &str| -> Result<IdentityAllocator, RepoError> {
            let ids = kv
                .scan(&prefix(kind))?
                .iter()
                .map(|(k, _)| tail_id(k))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(IdentityAllocator::seeded(ids))
        };

        Ok(Self {
            film_ids: allocator(FILM)?,
            user_ids: allocator(USER)?,
            review_ids: allocator(REVIEW)?,
            director_ids: allocator(DIRECTOR)?,
            write: Mutex::new(()),
            kv,
        })
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn doc<T: DeserializeOwned>(&self, kind: &str, id: i64) -> Result<Option<T>, RepoError> {
        self.kv.get(&key(kind, id))?.map(|b| decode(&b)).transpose()
    }

    fn docs<T: DeserializeOwned>(&self, kind: &str) -> Result<Vec<T>, RepoError> {
        self.kv
            .scan(&prefix(kind))?
            .iter()
            .map(|(_, v)| decode(v))
            .collect()
    }

    fn has(&self, kind: &str, id: i64) -> Result<bool, RepoError> {
        Ok(self.kv.get(&key(kind, id))?.is_some())
    }

    fn require(&self, kind: &str, id: i64) -> Result<(), RepoError> {
        if self.has(kind, id)? {
            Ok(())
        } else {
            Err(RepoError::Dangling(format!("{} {} does not exist", kind, id)))
        }
    }

    /// Second ids of every pair under `film:{kind}:{a}:`.
    fn pair_tails(&self, kind: &str, a: i64) -> Result<BTreeSet<i64>, RepoError> {
        self.kv
            .scan(&pair_prefix(kind, a))?
            .iter()
            .map(|(k, _)| tail_id(k))
            .collect()
    }

    fn check_film_refs(&self, input: &FilmInput) -> Result<(), RepoError> {
        self.require(MPA, input.mpa_id)?;
        for id in &input.genre_ids {
            self.require(GENRE, *id)?;
        }
        for id in &input.director_ids {
            self.require(DIRECTOR, *id)?;
        }
        Ok(())
    }

    fn put<T: Serialize>(&self, kind: &str, id: i64, doc: &T) -> Result<(), RepoError> {
        self.kv.set(&key(kind, id), &encode(doc)?)?;
        Ok(())
    }

    fn remove(&self, kind: &str, id: i64) -> Result<bool, RepoError> {
        let k = key(kind, id);
        if self.kv.get(&k)?.is_none() {
            return Ok(false);
        }
        self.kv.delete(&k)?;
        Ok(true)
    }

    /// The cartesian rows a LEFT JOIN of this film against its genres,
    /// directors and likes would produce.
    fn fan_out(&self, doc: &FilmDoc, rows: &mut Vec<Row>) -> Result<(), RepoError> {
        let mpa: Mpa = self.doc(MPA, doc.mpa_id)?.ok_or_else(|| {
            RepoError::Corrupt(format!("film {} references missing mpa {}", doc.id, doc.mpa_id))
        })?;

        let mut genres = Vec::new();
        for id in &doc.genre_ids {
            if let Some(g) = self.doc::<Genre>(GENRE, *id)? {
                genres.push(Some(g));
            }
        }
        let mut directors = Vec::new();
        for id in &doc.director_ids {
            if let Some(d) = self.doc::<Director>(DIRECTOR, *id)? {
                directors.push(Some(d));
            }
        }
        let likers: Vec<Option<i64>> = self.pair_tails(LIKE, doc.id)?.into_iter().map(Some).collect();

        let genres = null_if_empty(genres);
        let directors = null_if_empty(directors);
        let likers = null_if_empty(likers);

        let release_date = doc.release_date.format(DATE_FORMAT).to_string();
        for genre in &genres {
            for director in &directors {
                for liker in &likers {
                    rows.push(Row::from_pairs([
                        (c::ID, Value::Integer(doc.id)),
                        (c::NAME, Value::from(doc.name.as_str())),
                        (c::DESCRIPTION, Value::from(doc.description.as_str())),
                        (c::RELEASE_DATE, Value::from(release_date.as_str())),
                        (c::DURATION, Value::Integer(doc.duration)),
                        (c::MPA_ID, Value::Integer(mpa.id)),
                        (c::MPA_NAME, Value::from(mpa.name.as_str())),
                        (c::GENRE_ID, genre.as_ref().map(|g| g.id).into()),
                        (c::GENRE_NAME, genre.as_ref().map(|g| g.name.as_str()).into()),
                        (c::DIRECTOR_ID, director.as_ref().map(|d| d.id).into()),
                        (c::DIRECTOR_NAME, director.as_ref().map(|d| d.name.as_str()).into()),
                        (c::LIKER_ID, (*liker).into()),
                    ]));
                }
            }
        }
        Ok(())
    }

    fn store_user(&self, doc: &UserDoc, old_email: Option<&str>) -> Result<(), RepoError> {
        if let Some(owner) = self.find_user_by_email(&doc.email)? {
            if owner != doc.id {
                return Err(RepoError::Conflict(format!(
                    "UNIQUE constraint: email '{}' belongs to user {}",
                    doc.email, owner
                )));
            }
        }

        let user_key = key(USER, doc.id);
        let index_key = email_key(&doc.email);
        let body = encode(doc)?;
        let id_bytes = doc.id.to_string().into_bytes();
        let stale = old_email
            .filter(|old| *old != doc.email)
            .map(email_key);

        let sets = [(user_key.as_str(), body.as_slice()), (index_key.as_str(), id_bytes.as_slice())];
        let deletes: Vec<&str> = stale.iter().map(String::as_str).collect();
        self.kv.write_batch(&sets, &deletes)?;
        Ok(())
    }
}

/// An empty child group joins as a single NULL.
fn null_if_empty<T>(mut group: Vec<Option<T>>) -> Vec<Option<T>> {
    if group.is_empty() {
        group.push(None);
    }
    group
}

impl FilmRepository for KvRepository {
    fn insert_film(&self, input: &FilmInput) -> Result<i64, RepoError> {
        let _w = self.lock();
        self.check_film_refs(input)?;
        let id = self.film_ids.next_id();
        self.put(FILM, id, &FilmDoc::new(id, input))?;
        Ok(id)
    }

    fn update_film(&self, id: i64, input: &FilmInput) -> Result<bool, RepoError> {
        let _w = self.lock();
        if !self.has(FILM, id)? {
            return Ok(false);
        }
        self.check_film_refs(input)?;
        self.put(FILM, id, &FilmDoc::new(id, input))?;
        Ok(true)
    }

    fn delete_film(&self, id: i64) -> Result<bool, RepoError> {
        let _w = self.lock();
        let liked = !self.pair_tails(LIKE, id)?.is_empty();
        if liked || self.docs::<Review>(REVIEW)?.iter().any(|r| r.film_id == id) {
            return Err(RepoError::Dangling(format!("film {} is still referenced", id)));
        }
        self.remove(FILM, id)
    }

    fn film_exists(&self, id: i64) -> Result<bool, RepoError> {
        self.has(FILM, id)
    }

    fn film_rows(&self, scope: &FilmScope) -> Result<Vec<Row>, RepoError> {
        let docs: Vec<FilmDoc> = match scope {
            FilmScope::All => self.docs(FILM)?,
            FilmScope::Ids(ids) => {
                let wanted: BTreeSet<i64> = ids.iter().copied().collect();
                let mut docs = Vec::with_capacity(wanted.len());
                for id in wanted {
                    if let Some(doc) = self.doc(FILM, id)? {
                        docs.push(doc);
                    }
                }
                docs
            }
            FilmScope::Director(director_id) => self
                .docs::<FilmDoc>(FILM)?
                .into_iter()
                .filter(|d| d.director_ids.contains(director_id))
                .collect(),
        };

        let mut rows = Vec::new();
        for doc in &docs {
            self.fan_out(doc, &mut rows)?;
        }
        Ok(rows)
    }

    fn insert_user(&self, input: &UserInput) -> Result<i64, RepoError> {
        let _w = self.lock();
        if self.find_user_by_email(&input.email)?.is_some() {
            return Err(RepoError::Conflict(format!(
                "UNIQUE constraint: email '{}' already in use",
                input.email
            )));
        }
        let id = self.user_ids.next_id();
        self.store_user(&UserDoc::new(id, input), None)?;
        Ok(id)
    }

    fn get_user(&self, id: i64) -> Result<Option<User>, RepoError> {
        match self.doc::<UserDoc>(USER, id)? {
            Some(doc) => Ok(Some(doc.into_user(self.pair_tails(FRIEND, id)?))),
            None => Ok(None),
        }
    }

    fn list_users(&self) -> Result<Vec<User>, RepoError> {
        self.docs::<UserDoc>(USER)?
            .into_iter()
            .map(|doc| -> Result<User, RepoError> {
                let friends = self.pair_tails(FRIEND, doc.id)?;
                Ok(doc.into_user(friends))
            })
            .collect()
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<i64>, RepoError> {
        match self.kv.get(&email_key(email))? {
            Some(bytes) => std::str::from_utf8(&bytes)
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Some)
                .ok_or_else(|| RepoError::Corrupt(format!("bad email index for '{}'", email))),
            None => Ok(None),
        }
    }

    fn update_user(&self, id: i64, input: &UserInput) -> Result<bool, RepoError> {
        let _w = self.lock();
        let Some(current) = self.doc::<UserDoc>(USER, id)? else {
            return Ok(false);
        };
        self.store_user(&UserDoc::new(id, input), Some(&current.email))?;
        Ok(true)
    }

    fn delete_user(&self, id: i64) -> Result<bool, RepoError> {
        let _w = self.lock();
        let Some(current) = self.doc::<UserDoc>(USER, id)? else {
            return Ok(false);
        };
        self.kv
            .batch_delete(&[key(USER, id).as_str(), email_key(&current.email).as_str()])?;
        Ok(true)
    }

    fn insert_review(&self, input: &ReviewInput) -> Result<i64, RepoError> {
        let _w = self.lock();
        self.require(FILM, input.film_id)?;
        self.require(USER, input.user_id)?;
        let id = self.review_ids.next_id();
        let review = Review {
            id,
            content: input.content.clone(),
            is_positive: input.is_positive,
            user_id: input.user_id,
            film_id: input.film_id,
            useful: 0,
        };
        self.put(REVIEW, id, &review)?;
        Ok(id)
    }

    fn get_review(&self, id: i64) -> Result<Option<Review>, RepoError> {
        self.doc(REVIEW, id)
    }

    fn list_reviews(&self, film_id: Option<i64>) -> Result<Vec<Review>, RepoError> {
        let all: Vec<Review> = self.docs(REVIEW)?;
        Ok(match film_id {
            Some(film_id) => all.into_iter().filter(|r| r.film_id == film_id).collect(),
            None => all,
        })
    }

    fn reviews_by_user(&self, user_id: i64) -> Result<Vec<Review>, RepoError> {
        Ok(self
            .docs::<Review>(REVIEW)?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect())
    }

    fn update_review(&self, id: i64, edit: &ReviewEdit) -> Result<bool, RepoError> {
        let _w = self.lock();
        let Some(mut review) = self.doc::<Review>(REVIEW, id)? else {
            return Ok(false);
        };
        review.content = edit.content.clone();
        review.is_positive = edit.is_positive;
        self.put(REVIEW, id, &review)?;
        Ok(true)
    }

    fn delete_review(&self, id: i64) -> Result<Option<u64>, RepoError> {
        let _w = self.lock();
        if !self.has(REVIEW, id)? {
            return Ok(None);
        }
        let voters = self.pair_tails(VOTE, id)?;
        let mut keys = Vec::with_capacity(voters.len() * 2 + 1);
        keys.push(key(REVIEW, id));
        for user_id in &voters {
            keys.push(pair_key(VOTE, id, *user_id));
            keys.push(pair_key(VOTED, *user_id, id));
        }
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.kv.write_batch(&[], &refs)?;
        Ok(Some(voters.len() as u64))
    }

    fn insert_director(&self, name: &str) -> Result<i64, RepoError> {
        let _w = self.lock();
        let id = self.director_ids.next_id();
        self.put(DIRECTOR, id, &Director { id, name: name.to_string() })?;
        Ok(id)
    }

    fn get_director(&self, id: i64) -> Result<Option<Director>, RepoError> {
        self.doc(DIRECTOR, id)
    }

    fn list_directors(&self) -> Result<Vec<Director>, RepoError> {
        self.docs(DIRECTOR)
    }

    fn update_director(&self, id: i64, name: &str) -> Result<bool, RepoError> {
        let _w = self.lock();
        if !self.has(DIRECTOR, id)? {
            return Ok(false);
        }
        self.put(DIRECTOR, id, &Director { id, name: name.to_string() })?;
        Ok(true)
    }

    fn delete_director(&self, id: i64) -> Result<bool, RepoError> {
        let _w = self.lock();
        let director_key = key(DIRECTOR, id);
        if self.kv.get(&director_key)?.is_none() {
            return Ok(false);
        }

        let mut updated: Vec<(String, Vec<u8>)> = Vec::new();
        for mut doc in self.docs::<FilmDoc>(FILM)? {
            if doc.director_ids.contains(&id) {
                doc.director_ids.retain(|d| *d != id);
                updated.push((key(FILM, doc.id), encode(&doc)?));
            }
        }
        let sets: Vec<(&str, &[u8])> =
            updated.iter().map(|(k, v)| (k.as_str(), v.as_slice())).collect();
        self.kv.write_batch(&sets, &[director_key.as_str()])?;
        Ok(true)
    }

    fn get_genre(&self, id: i64) -> Result<Option<Genre>, RepoError> {
        self.doc(GENRE, id)
    }

    fn list_genres(&self) -> Result<Vec<Genre>, RepoError> {
        self.docs(GENRE)
    }

    fn get_mpa(&self, id: i64) -> Result<Option<Mpa>, RepoError> {
        self.doc(MPA, id)
    }

    fn list_mpa(&self) -> Result<Vec<Mpa>, RepoError> {
        self.docs(MPA)
    }

    fn add_edge(&self, rel: Relation, source: i64, target: i64) -> Result<bool, RepoError> {
        let _w = self.lock();
        match rel {
            Relation::Friend => {
                if source == target {
                    return Err(RepoError::Conflict(format!("user {} cannot befriend itself", source)));
                }
                self.require(USER, source)?;
                self.require(USER, target)?;
            }
            Relation::Like => {
                self.require(FILM, source)?;
                self.require(USER, target)?;
            }
        }

        let (forward, reverse) = edge_kinds(rel);
        let fwd = pair_key(forward, source, target);
        if self.kv.get(&fwd)?.is_some() {
            return Ok(false);
        }
        let rev = pair_key(reverse, target, source);
        self.kv
            .batch_set(&[(fwd.as_str(), &b""[..]), (rev.as_str(), &b""[..])])?;
        Ok(true)
    }

    fn remove_edge(&self, rel: Relation, source: i64, target: i64) -> Result<bool, RepoError> {
        let _w = self.lock();
        let (forward, reverse) = edge_kinds(rel);
        let fwd = pair_key(forward, source, target);
        if self.kv.get(&fwd)?.is_none() {
            return Ok(false);
        }
        let rev = pair_key(reverse, target, source);
        self.kv.batch_delete(&[fwd.as_str(), rev.as_str()])?;
        Ok(true)
    }

    fn targets(&self, rel: Relation, source: i64) -> Result<BTreeSet<i64>, RepoError> {
        self.pair_tails(edge_kinds(rel).0, source)
    }

    fn sources(&self, rel: Relation, target: i64) -> Result<BTreeSet<i64>, RepoError> {
        self.pair_tails(edge_kinds(rel).1, target)
    }

    fn vote(&self, review_id: i64, user_id: i64) -> Result<Option<VoteKind>, RepoError> {
        self.kv
            .get(&pair_key(VOTE, review_id, user_id))?
            .map(|b| decode_vote(&b))
            .transpose()
    }

    fn votes_by_user(&self, user_id: i64) -> Result<Vec<(i64, VoteKind)>, RepoError> {
        self.kv
            .scan(&pair_prefix(VOTED, user_id))?
            .iter()
            .map(|(k, v)| -> Result<_, RepoError> { Ok((tail_id(k)?, decode_vote(v)?)) })
            .collect()
    }

    fn commit_vote(
        &self,
        review_id: i64,
        user_id: i64,
        to: Option<VoteKind>,
        delta: i64,
    ) -> Result<bool, RepoError> {
        let _w = self.lock();
        let Some(mut review) = self.doc::<Review>(REVIEW, review_id)? else {
            return Ok(false);
        };
        self.require(USER, user_id)?;
        review.useful += delta;

        let review_key = key(REVIEW, review_id);
        let body = encode(&review)?;
        let fwd = pair_key(VOTE, review_id, user_id);
        let rev = pair_key(VOTED, user_id, review_id);

        match to {
            Some(kind) => {
                let tag = kind.as_str().as_bytes();
                self.kv.write_batch(
                    &[
                        (review_key.as_str(), body.as_slice()),
                        (fwd.as_str(), tag),
                        (rev.as_str(), tag),
                    ],
                    &[],
                )?;
            }
            None => {
                self.kv.write_batch(
                    &[(review_key.as_str(), body.as_slice())],
                    &[fwd.as_str(), rev.as_str()],
                )?;
            }
        }
        Ok(true)
    }
}
