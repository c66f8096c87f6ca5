use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A user's review of a film.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub content: String,
    pub is_positive: bool,
    pub user_id: i64,
    pub film_id: i64,

    /// Likes minus dislikes. Always equals the sum of the current votes.
    #[serde(default)]
    pub useful: i64,
}

/// Input for creating a review.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    pub content: String,
    pub is_positive: bool,
    pub user_id: i64,
    pub film_id: i64,
}

/// Fields of a review that may be edited after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewEdit {
    pub content: String,
    pub is_positive: bool,
}

/// The stored type of a review vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteKind {
    Like,
    Dislike,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Like => "LIKE",
            VoteKind::Dislike => "DISLIKE",
        }
    }

    /// Contribution of one vote of this kind to the usefulness score.
    pub fn weight(&self) -> i64 {
        match self {
            VoteKind::Like => 1,
            VoteKind::Dislike => -1,
        }
    }
}

impl fmt::Display for VoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIKE" => Ok(VoteKind::Like),
            "DISLIKE" => Ok(VoteKind::Dislike),
            other => Err(format!("unknown vote type '{}'", other)),
        }
    }
}

/// Score contribution of a vote slot. `None` is the empty slot.
pub fn slot_weight(slot: Option<VoteKind>) -> i64 {
    slot.map(|k| k.weight()).unwrap_or(0)
}

/// Change of the usefulness score when a slot moves from `from` to `to`.
///
/// Returns `None` when the move does not change the slot; such requests
/// are rejected rather than treated as no-ops.
pub fn vote_delta(from: Option<VoteKind>, to: Option<VoteKind>) -> Option<i64> {
    if from == to {
        return None;
    }
    Some(slot_weight(to) - slot_weight(from))
}

/// A vote operation requested by a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Like,
    Dislike,
    RemoveLike,
    RemoveDislike,
}

impl VoteAction {
    /// Resolve the slot state this action leads to from `current`.
    ///
    /// `Err` carries the rejection reason; the slot must stay untouched.
    pub fn target(self, current: Option<VoteKind>) -> Result<Option<VoteKind>, &'static str> {
        match (self, current) {
            (VoteAction::Like, Some(VoteKind::Like)) => Err("vote already recorded: review is already liked"),
            (VoteAction::Dislike, Some(VoteKind::Dislike)) => {
                Err("vote already recorded: review is already disliked")
            }
            (VoteAction::Like, _) => Ok(Some(VoteKind::Like)),
            (VoteAction::Dislike, _) => Ok(Some(VoteKind::Dislike)),
            (VoteAction::RemoveLike, Some(VoteKind::Like)) => Ok(None),
            (VoteAction::RemoveLike, _) => Err("no like to remove"),
            (VoteAction::RemoveDislike, Some(VoteKind::Dislike)) => Ok(None),
            (VoteAction::RemoveDislike, _) => Err("no dislike to remove"),
        }
    }
}
