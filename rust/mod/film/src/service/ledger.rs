//! Engagement ledger: friendship edges, film likes, review votes, and the
//! cascade cleanup that keeps them consistent when entities go away.

use std::collections::BTreeSet;

use crate::model::{vote_delta, Review, VoteAction};
use crate::repo::Relation;
use crate::service::{EntityKind, FilmError, FilmService};

impl FilmService {
    // ── Friendship ──

    /// Add the directed edge `user_id -> friend_id`. Idempotent.
    pub fn add_friend(&self, user_id: i64, friend_id: i64) -> Result<(), FilmError> {
        if user_id == friend_id {
            return Err(FilmError::invalid(format!(
                "self-friend: user {} cannot befriend themselves",
                user_id
            )));
        }
        self.require_user(user_id)?;
        self.require_user(friend_id)?;
        if self.repo.add_edge(Relation::Friend, user_id, friend_id)? {
            tracing::debug!(user_id, friend_id, "friend added");
        }
        Ok(())
    }

    /// Remove the directed edge `user_id -> friend_id`. Idempotent; the
    /// reverse edge is left alone.
    pub fn remove_friend(&self, user_id: i64, friend_id: i64) -> Result<(), FilmError> {
        self.require_user(user_id)?;
        self.require_user(friend_id)?;
        if self.repo.remove_edge(Relation::Friend, user_id, friend_id)? {
            tracing::debug!(user_id, friend_id, "friend removed");
        }
        Ok(())
    }

    /// Ids the user points a friendship edge at.
    pub fn friends_of(&self, user_id: i64) -> Result<BTreeSet<i64>, FilmError> {
        self.require_user(user_id)?;
        Ok(self.repo.targets(Relation::Friend, user_id)?)
    }

    /// `friends_of(a) ∩ friends_of(b)`.
    pub fn common_friend_ids(&self, a: i64, b: i64) -> Result<BTreeSet<i64>, FilmError> {
        let left = self.friends_of(a)?;
        let right = self.friends_of(b)?;
        Ok(left.intersection(&right).copied().collect())
    }

    // ── Film likes ──

    /// Record that `user_id` likes `film_id`. Idempotent.
    pub fn like(&self, film_id: i64, user_id: i64) -> Result<(), FilmError> {
        self.require_film(film_id)?;
        self.require_user(user_id)?;
        if self.repo.add_edge(Relation::Like, film_id, user_id)? {
            tracing::debug!(film_id, user_id, "film liked");
        }
        Ok(())
    }

    /// Withdraw a like. Idempotent.
    pub fn unlike(&self, film_id: i64, user_id: i64) -> Result<(), FilmError> {
        self.require_film(film_id)?;
        self.require_user(user_id)?;
        if self.repo.remove_edge(Relation::Like, film_id, user_id)? {
            tracing::debug!(film_id, user_id, "film unliked");
        }
        Ok(())
    }

    pub fn like_count(&self, film_id: i64) -> Result<usize, FilmError> {
        self.require_film(film_id)?;
        Ok(self.repo.targets(Relation::Like, film_id)?.len())
    }

    // ── Review votes ──

    pub fn like_review(&self, review_id: i64, user_id: i64) -> Result<Review, FilmError> {
        self.apply_vote(review_id, user_id, VoteAction::Like)
    }

    pub fn dislike_review(&self, review_id: i64, user_id: i64) -> Result<Review, FilmError> {
        self.apply_vote(review_id, user_id, VoteAction::Dislike)
    }

    pub fn remove_review_like(&self, review_id: i64, user_id: i64) -> Result<Review, FilmError> {
        self.apply_vote(review_id, user_id, VoteAction::RemoveLike)
    }

    pub fn remove_review_dislike(&self, review_id: i64, user_id: i64) -> Result<Review, FilmError> {
        self.apply_vote(review_id, user_id, VoteAction::RemoveDislike)
    }

    /// Move the (review, user) vote slot and the review's score in one step.
    ///
    /// The read of the current slot and the commit happen under the slot's
    /// lock; the commit itself is a single storage transaction.
    fn apply_vote(
        &self,
        review_id: i64,
        user_id: i64,
        action: VoteAction,
    ) -> Result<Review, FilmError> {
        self.require_review(review_id)?;
        self.require_user(user_id)?;

        self.vote_locks.with_key(&(review_id, user_id), || {
            let current = self.repo.vote(review_id, user_id)?;
            let target = match action.target(current) {
                Ok(target) => target,
                Err(reason) => {
                    // An empty slot may mean the review was purged meanwhile.
                    self.require_review(review_id)?;
                    return Err(FilmError::invalid(reason));
                }
            };
            let delta = vote_delta(current, target)
                .ok_or_else(|| FilmError::invalid("vote already recorded"))?;

            if !self.repo.commit_vote(review_id, user_id, target, delta)? {
                // Purged after the check above; the purge took every vote with it.
                return Err(FilmError::not_found(EntityKind::Review, review_id));
            }
            tracing::debug!(review_id, user_id, ?current, ?target, delta, "review vote changed");
            Ok::<(), FilmError>(())
        })?;

        self.require_review(review_id)
    }

    // ── Cascade cleanup ──

    /// Remove a review and every vote on it in one commit.
    pub fn purge_review(&self, review_id: i64) -> Result<(), FilmError> {
        let votes = self
            .repo
            .delete_review(review_id)?
            .ok_or_else(|| FilmError::not_found(EntityKind::Review, review_id))?;
        tracing::debug!(review_id, votes, "review purged");
        Ok(())
    }

    /// Remove a film with its likes, its reviews and their votes, and its
    /// genre and director links.
    pub fn purge_film(&self, film_id: i64) -> Result<(), FilmError> {
        self.require_film(film_id)?;

        for review in self.repo.list_reviews(Some(film_id))? {
            self.repo.delete_review(review.id)?;
        }
        for user_id in self.repo.targets(Relation::Like, film_id)? {
            self.repo.remove_edge(Relation::Like, film_id, user_id)?;
        }
        self.repo.delete_film(film_id)?;
        tracing::debug!(film_id, "film purged");
        Ok(())
    }

    /// Remove a user with their friendship edges in both directions, their
    /// likes, their votes (re-scoring the reviews they voted on) and their
    /// own reviews.
    pub fn purge_user(&self, user_id: i64) -> Result<(), FilmError> {
        self.require_user(user_id)?;

        let mut rescored = 0usize;
        for (review_id, _) in self.repo.votes_by_user(user_id)? {
            self.vote_locks.with_key(&(review_id, user_id), || {
                // Re-read under the lock: the slot may have moved since the scan.
                if let Some(kind) = self.repo.vote(review_id, user_id)? {
                    let delta = vote_delta(Some(kind), None).unwrap_or(0);
                    if self.repo.commit_vote(review_id, user_id, None, delta)? {
                        rescored += 1;
                    }
                }
                Ok::<(), FilmError>(())
            })?;
        }

        for review in self.repo.reviews_by_user(user_id)? {
            self.repo.delete_review(review.id)?;
        }

        for friend_id in self.repo.targets(Relation::Friend, user_id)? {
            self.repo.remove_edge(Relation::Friend, user_id, friend_id)?;
        }
        for follower_id in self.repo.sources(Relation::Friend, user_id)? {
            self.repo.remove_edge(Relation::Friend, follower_id, user_id)?;
        }
        for film_id in self.repo.sources(Relation::Like, user_id)? {
            self.repo.remove_edge(Relation::Like, film_id, user_id)?;
        }

        self.repo.delete_user(user_id)?;
        tracing::debug!(user_id, rescored, "user purged");
        Ok(())
    }
}
