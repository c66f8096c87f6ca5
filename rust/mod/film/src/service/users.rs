use chrono::Utc;
use filmrate_core::merge_patch;

use crate::model::{User, UserInput};
use crate::service::{EntityKind, FilmError, FilmService};

impl FilmService {
    /// Register a user. An empty name falls back to the login.
    pub fn create_user(&self, mut input: UserInput) -> Result<User, FilmError> {
        self.validate_user(&input, None)?;
        input.name = input.display_name();
        let id = self.repo.insert_user(&input)?;
        tracing::debug!(user_id = id, login = %input.login, "user created");
        self.require_user(id)
    }

    /// Get a user with their outgoing friend ids.
    pub fn get_user(&self, id: i64) -> Result<User, FilmError> {
        self.require_user(id)
    }

    pub fn list_users(&self) -> Result<Vec<User>, FilmError> {
        Ok(self.repo.list_users()?)
    }

    /// Update a user with JSON merge-patch semantics.
    pub fn update_user(&self, id: i64, patch: serde_json::Value) -> Result<User, FilmError> {
        let current = self.require_user(id)?;

        let mut base = serde_json::to_value(UserInput::from(&current))
            .map_err(|e| FilmError::Internal(e.to_string()))?;
        merge_patch(&mut base, &patch);
        let mut input: UserInput =
            serde_json::from_value(base).map_err(|e| FilmError::invalid(e.to_string()))?;

        self.validate_user(&input, Some(id))?;
        input.name = input.display_name();
        if !self.repo.update_user(id, &input)? {
            return Err(FilmError::not_found(EntityKind::User, id));
        }
        tracing::debug!(user_id = id, "user updated");
        self.require_user(id)
    }

    /// Delete a user and everything that hangs off them.
    pub fn delete_user(&self, id: i64) -> Result<(), FilmError> {
        self.purge_user(id)
    }

    fn validate_user(&self, input: &UserInput, own_id: Option<i64>) -> Result<(), FilmError> {
        if input.birthday > Utc::now().date_naive() {
            return Err(FilmError::invalid(format!(
                "birthday {} is in the future",
                input.birthday
            )));
        }
        match self.repo.find_user_by_email(&input.email)? {
            Some(owner) if Some(owner) != own_id => Err(FilmError::invalid(format!(
                "email already in use: {}",
                input.email
            ))),
            _ => Ok(()),
        }
    }
}
