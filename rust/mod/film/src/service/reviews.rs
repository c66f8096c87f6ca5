use crate::model::{Review, ReviewEdit, ReviewInput};
use crate::service::{EntityKind, FilmError, FilmService};

impl FilmService {
    /// Post a review. The usefulness score starts at zero.
    pub fn create_review(&self, input: ReviewInput) -> Result<Review, FilmError> {
        self.require_film(input.film_id)?;
        self.require_user(input.user_id)?;
        let id = self.repo.insert_review(&input)?;
        tracing::debug!(review_id = id, film_id = input.film_id, user_id = input.user_id, "review created");
        self.require_review(id)
    }

    pub fn get_review(&self, id: i64) -> Result<Review, FilmError> {
        self.require_review(id)
    }

    /// Edit content and polarity. Score, author and film never change here.
    pub fn update_review(&self, id: i64, edit: ReviewEdit) -> Result<Review, FilmError> {
        if !self.repo.update_review(id, &edit)? {
            return Err(FilmError::not_found(EntityKind::Review, id));
        }
        tracing::debug!(review_id = id, "review updated");
        self.require_review(id)
    }

    /// Delete a review and its votes.
    pub fn delete_review(&self, id: i64) -> Result<(), FilmError> {
        self.purge_review(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testutil::*;

    #[test]
    fn test_review_crud() {
        for (_, svc) in backends() {
            let u = add_user(&svc, "critic");
            let voter = add_user(&svc, "voter");
            let f = add_film(&svc, "Blade Runner");

            let review = svc
                .create_review(ReviewInput {
                    content: "rain".into(),
                    is_positive: true,
                    user_id: u,
                    film_id: f,
                })
                .unwrap();
            assert_eq!(review.useful, 0);

            svc.like_review(review.id, voter).unwrap();
            let edited = svc
                .update_review(
                    review.id,
                    ReviewEdit {
                        content: "tears in rain".into(),
                        is_positive: false,
                    },
                )
                .unwrap();
            assert_eq!(edited.content, "tears in rain");
            assert!(!edited.is_positive);
            assert_eq!(edited.useful, 1);
            assert_eq!(edited.user_id, u);
            assert_eq!(edited.film_id, f);

            svc.delete_review(review.id).unwrap();
            assert!(matches!(
                svc.get_review(review.id),
                Err(FilmError::NotFound { kind: EntityKind::Review, .. })
            ));
        }
    }

    #[test]
    fn review_needs_film_and_author() {
        for (_, svc) in backends() {
            let u = add_user(&svc, "u");
            let f = add_film(&svc, "f");
            let bad_film = ReviewInput {
                content: "?".into(),
                is_positive: true,
                user_id: u,
                film_id: f + 100,
            };
            assert!(matches!(
                svc.create_review(bad_film),
                Err(FilmError::NotFound { kind: EntityKind::Film, .. })
            ));
            let bad_user = ReviewInput {
                content: "?".into(),
                is_positive: true,
                user_id: u + 100,
                film_id: f,
            };
            assert!(matches!(
                svc.create_review(bad_user),
                Err(FilmError::NotFound { kind: EntityKind::User, .. })
            ));
            assert!(matches!(
                svc.update_review(77, ReviewEdit { content: "x".into(), is_positive: true }),
                Err(FilmError::NotFound { .. })
            ));
        }
    }
}
