use crate::model::{Director, DirectorInput};
use crate::service::{EntityKind, FilmError, FilmService};

impl FilmService {
    pub fn create_director(&self, input: DirectorInput) -> Result<Director, FilmError> {
        let id = self.repo.insert_director(&input.name)?;
        tracing::debug!(director_id = id, name = %input.name, "director created");
        self.require_director(id)
    }

    pub fn get_director(&self, id: i64) -> Result<Director, FilmError> {
        self.require_director(id)
    }

    pub fn list_directors(&self) -> Result<Vec<Director>, FilmError> {
        Ok(self.repo.list_directors()?)
    }

    pub fn update_director(&self, id: i64, input: DirectorInput) -> Result<Director, FilmError> {
        if !self.repo.update_director(id, &input.name)? {
            return Err(FilmError::not_found(EntityKind::Director, id));
        }
        tracing::debug!(director_id = id, "director renamed");
        self.require_director(id)
    }

    /// Delete a director. Their films stay, minus the link.
    pub fn delete_director(&self, id: i64) -> Result<(), FilmError> {
        if !self.repo.delete_director(id)? {
            return Err(FilmError::not_found(EntityKind::Director, id));
        }
        tracing::debug!(director_id = id, "director deleted");
        Ok(())
    }
}
