use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Kind of content that carries a score and can be voted on or reported.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, Hash)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VotableType {
    Post,
    Comment,
}

impl VotableType {
    /// Table holding the target rows and their `score` column.
    pub fn table(self) -> &'static str {
        match self {
            VotableType::Post => "posts",
            VotableType::Comment => "comments",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VotableType::Post => "post",
            VotableType::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteValue {
    Up,
    Down,
}

impl VoteValue {
    pub fn as_i64(self) -> i64 {
        match self {
            VoteValue::Up => 1,
            VoteValue::Down => -1,
        }
    }
}

impl TryFrom<i64> for VoteValue {
    type Error = AppError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteValue::Up),
            -1 => Ok(VoteValue::Down),
            _ => Err(AppError::Validation("قيمة غير صحيحة".to_string())),
        }
    }
}

/// Raw vote value as sent by clients: `1`, `-1`, or the same as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VoteInput {
    Number(i64),
    Text(String),
}

impl TryFrom<VoteInput> for VoteValue {
    type Error = AppError;

    fn try_from(input: VoteInput) -> Result<Self, Self::Error> {
        match input {
            VoteInput::Number(value) => VoteValue::try_from(value),
            VoteInput::Text(text) => text
                .trim()
                .parse::<i64>()
                .map_err(|_| AppError::Validation("قيمة غير صحيحة".to_string()))
                .and_then(VoteValue::try_from),
        }
    }
}

// Vote request
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub value: VoteInput,
}

// Vote response
#[derive(Debug, Serialize, Deserialize)]
pub struct VoteResponse {
    pub score: i64,
}
