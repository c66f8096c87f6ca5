use serde::{Deserialize, Serialize};

/// A film genre. Genres form a fixed catalog seeded with the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// An MPA age rating. Fixed catalog, seeded with the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mpa {
    pub id: i64,
    pub name: String,
}

/// A film director.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Director {
    pub id: i64,
    pub name: String,
}

/// Input for creating or renaming a director.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectorInput {
    pub name: String,
}

/// Genres present in a fresh store, in id order.
pub const GENRE_SEED: &[(i64, &str)] = &[
    (1, "Comedy"),
    (2, "Drama"),
    (3, "Cartoon"),
    (4, "Thriller"),
    (5, "Documentary"),
    (6, "Action"),
];

/// MPA ratings present in a fresh store, in id order.
pub const MPA_SEED: &[(i64, &str)] = &[
    (1, "G"),
    (2, "PG"),
    (3, "PG-13"),
    (4, "R"),
    (5, "NC-17"),
];
