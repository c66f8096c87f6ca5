use filmrate_core::merge_patch;

use crate::model::{Film, FilmInput};
use crate::repo::FilmScope;
use crate::service::{EntityKind, FilmError, FilmService};

impl FilmService {
    /// Create a film. Repeated genre and director ids collapse to one.
    pub fn create_film(&self, mut input: FilmInput) -> Result<Film, FilmError> {
        input.dedup_links();
        self.validate_film(&input)?;
        let id = self.repo.insert_film(&input)?;
        tracing::debug!(film_id = id, name = %input.name, "film created");
        self.get_film(id)
    }

    /// Get a film with its genres, directors and likes.
    pub fn get_film(&self, id: i64) -> Result<Film, FilmError> {
        self.load_films(&FilmScope::Ids(vec![id]))?
            .into_iter()
            .next()
            .ok_or_else(|| FilmError::not_found(EntityKind::Film, id))
    }

    /// All films, by id.
    pub fn list_films(&self) -> Result<Vec<Film>, FilmError> {
        self.load_films(&FilmScope::All)
    }

    /// Update a film with JSON merge-patch semantics over its writable
    /// fields. Patching `genre_ids` or `director_ids` replaces the links.
    pub fn update_film(&self, id: i64, patch: serde_json::Value) -> Result<Film, FilmError> {
        let current = self.get_film(id)?;

        let mut base = serde_json::to_value(FilmInput::from(&current))
            .map_err(|e| FilmError::Internal(e.to_string()))?;
        merge_patch(&mut base, &patch);
        let mut input: FilmInput =
            serde_json::from_value(base).map_err(|e| FilmError::invalid(e.to_string()))?;
        input.dedup_links();

        self.validate_film(&input)?;
        if !self.repo.update_film(id, &input)? {
            return Err(FilmError::not_found(EntityKind::Film, id));
        }
        tracing::debug!(film_id = id, "film updated");
        self.get_film(id)
    }

    /// Delete a film together with its likes, reviews and votes.
    pub fn delete_film(&self, id: i64) -> Result<(), FilmError> {
        self.purge_film(id)
    }

    fn validate_film(&self, input: &FilmInput) -> Result<(), FilmError> {
        if input.release_date < self.config.earliest_release_date {
            return Err(FilmError::invalid(format!(
                "release date {} is before {}",
                input.release_date, self.config.earliest_release_date
            )));
        }
        if self.repo.get_mpa(input.mpa_id)?.is_none() {
            return Err(FilmError::not_found(EntityKind::Mpa, input.mpa_id));
        }
        for id in &input.genre_ids {
            if self.repo.get_genre(*id)?.is_none() {
                return Err(FilmError::not_found(EntityKind::Genre, *id));
            }
        }
        for id in &input.director_ids {
            self.require_director(*id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DirectorInput;
    use crate::service::testutil::*;

    #[test]
    fn test_film_crud() {
        for (backend, svc) in backends() {
            let d = svc
                .create_director(DirectorInput { name: "Mann".into() })
                .unwrap();

            let mut input = film_input("Heat", 1995);
            input.genre_ids = vec![4, 2, 4];
            input.director_ids = vec![d.id, d.id];
            let film = svc.create_film(input).unwrap();
            assert_eq!(film.genres.iter().map(|g| g.id).collect::<Vec<_>>(), vec![4, 2], "{}", backend);
            assert_eq!(film.genres[0].name, "Thriller");
            assert_eq!(film.directors.len(), 1);
            assert_eq!(film.mpa.name, "G");

            let updated = svc
                .update_film(film.id, serde_json::json!({"name": "Heat (1995)", "genre_ids": [6]}))
                .unwrap();
            assert_eq!(updated.name, "Heat (1995)");
            assert_eq!(updated.genres.iter().map(|g| g.id).collect::<Vec<_>>(), vec![6]);
            assert_eq!(updated.directors.len(), 1, "{}: untouched links stay", backend);
            assert_eq!(updated.release_date, film.release_date);

            assert_eq!(svc.list_films().unwrap().len(), 1);
            svc.delete_film(film.id).unwrap();
            assert!(matches!(
                svc.get_film(film.id),
                Err(FilmError::NotFound { kind: EntityKind::Film, .. })
            ));
        }
    }

    #[test]
    fn release_date_has_a_floor() {
        for (_, svc) in backends() {
            let mut input = film_input("Workers Leaving", 1895);
            input.release_date = date(1895, 12, 27);
            assert!(matches!(svc.create_film(input.clone()), Err(FilmError::InvalidInput(_))));
            input.release_date = date(1895, 12, 28);
            assert!(svc.create_film(input).is_ok());
        }
    }

    #[test]
    fn references_must_exist() {
        for (_, svc) in backends() {
            let mut input = film_input("x", 2000);
            input.mpa_id = 42;
            assert!(matches!(
                svc.create_film(input),
                Err(FilmError::NotFound { kind: EntityKind::Mpa, id: 42 })
            ));

            let mut input = film_input("x", 2000);
            input.genre_ids = vec![1, 99];
            assert!(matches!(
                svc.create_film(input),
                Err(FilmError::NotFound { kind: EntityKind::Genre, id: 99 })
            ));

            let mut input = film_input("x", 2000);
            input.director_ids = vec![5];
            assert!(matches!(
                svc.create_film(input),
                Err(FilmError::NotFound { kind: EntityKind::Director, id: 5 })
            ));
            assert!(svc.list_films().unwrap().is_empty());
        }
    }

    #[test]
    fn update_checks_the_patched_result() {
        for (_, svc) in backends() {
            let id = add_film(&svc, "x");
            assert!(matches!(
                svc.update_film(id, serde_json::json!({"release_date": "1700-01-01"})),
                Err(FilmError::InvalidInput(_))
            ));
            assert!(matches!(
                svc.update_film(id, serde_json::json!({"duration": "long"})),
                Err(FilmError::InvalidInput(_))
            ));
            assert!(matches!(
                svc.update_film(999, serde_json::json!({})),
                Err(FilmError::NotFound { .. })
            ));
            assert_eq!(svc.get_film(id).unwrap().release_date, date(2000, 1, 15));
        }
    }
}
