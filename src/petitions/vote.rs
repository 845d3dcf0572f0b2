//! Vote state machine for petitions.
//!
//! A voter holds no vote, an upvote or a downvote on a petition. Repeating the
//! current direction withdraws the vote; the opposite direction flips it.

use derive_more::Display;
use serde::Serialize;
use std::str::FromStr;

/// Direction requested by a voter.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    #[display(fmt = "up")]
    Up,
    #[display(fmt = "down")]
    Down,
}

impl VoteDirection {
    /// Storage representation: true for up.
    pub fn as_vote_type(self) -> bool {
        matches!(self, VoteDirection::Up)
    }

    pub fn from_vote_type(vote_type: bool) -> Self {
        if vote_type {
            VoteDirection::Up
        } else {
            VoteDirection::Down
        }
    }
}

impl FromStr for VoteDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(VoteDirection::Up),
            "down" => Ok(VoteDirection::Down),
            other => Err(format!("Invalid vote type '{}', expected 'up' or 'down'", other)),
        }
    }
}

/// A voter's standing on one petition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteState {
    #[default]
    #[serde(rename = "none")]
    NoVote,
    Up,
    Down,
}

impl From<VoteDirection> for VoteState {
    fn from(direction: VoteDirection) -> Self {
        match direction {
            VoteDirection::Up => VoteState::Up,
            VoteDirection::Down => VoteState::Down,
        }
    }
}

impl From<Option<bool>> for VoteState {
    fn from(vote_type: Option<bool>) -> Self {
        match vote_type {
            None => VoteState::NoVote,
            Some(vote_type) => VoteDirection::from_vote_type(vote_type).into(),
        }
    }
}

/// What a vote did to the stored row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteAction {
    /// No vote existed; one was recorded.
    Added,
    /// The same direction was cast again; the vote was withdrawn.
    Removed,
    /// The opposite direction was cast; the vote was flipped.
    Changed,
}

/// Applies `requested` to `current`, returning the new state and the action.
pub fn transition(current: VoteState, requested: VoteDirection) -> (VoteState, VoteAction) {
    match (current, requested) {
        (VoteState::NoVote, dir) => (dir.into(), VoteAction::Added),
        (VoteState::Up, VoteDirection::Up) | (VoteState::Down, VoteDirection::Down) => {
            (VoteState::NoVote, VoteAction::Removed)
        }
        (VoteState::Up, VoteDirection::Down) | (VoteState::Down, VoteDirection::Up) => {
            (requested.into(), VoteAction::Changed)
        }
    }
}

/// Up and down counts for one petition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
}

impl VoteTally {
    /// Upvotes minus downvotes.
    pub fn net(&self) -> i64 {
        self.upvotes - self.downvotes
    }

    pub fn record(&mut self, vote_type: bool, count: i64) {
        if vote_type {
            self.upvotes += count;
        } else {
            self.downvotes += count;
        }
    }
}
