use crate::model::{Genre, Mpa};
use crate::service::{EntityKind, FilmError, FilmService};

impl FilmService {
    pub fn get_genre(&self, id: i64) -> Result<Genre, FilmError> {
        self.repo
            .get_genre(id)?
            .ok_or_else(|| FilmError::not_found(EntityKind::Genre, id))
    }

    pub fn list_genres(&self) -> Result<Vec<Genre>, FilmError> {
        Ok(self.repo.list_genres()?)
    }

    pub fn get_mpa(&self, id: i64) -> Result<Mpa, FilmError> {
        self.repo
            .get_mpa(id)?
            .ok_or_else(|| FilmError::not_found(EntityKind::Mpa, id))
    }

    pub fn list_mpa(&self) -> Result<Vec<Mpa>, FilmError> {
        Ok(self.repo.list_mpa()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GENRE_SEED, MPA_SEED};
    use crate::service::testutil::*;

    #[test]
    fn catalogs_are_seeded_in_id_order() {
        for (backend, svc) in backends() {
            let genres = svc.list_genres().unwrap();
            let names: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
            let seeded: Vec<&str> = GENRE_SEED.iter().map(|(_, n)| *n).collect();
            assert_eq!(names, seeded, "{}", backend);

            assert_eq!(svc.list_mpa().unwrap().len(), MPA_SEED.len());
            assert_eq!(svc.get_mpa(5).unwrap().name, "NC-17");
            assert_eq!(svc.get_genre(3).unwrap().name, "Cartoon");
            assert!(matches!(
                svc.get_genre(0),
                Err(FilmError::NotFound { kind: EntityKind::Genre, id: 0 })
            ));
        }
    }
}
