use thiserror::Error;

/// Error type for remote gateway operations.
///
/// Every failure is a displayable message: callers surface it to the user
/// and leave their own state untouched.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server rejected request: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::InvalidResponse(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Error type for like-toggle transitions.
#[derive(Error, Debug)]
pub enum ToggleError {
    #[error("a like request is already in progress")]
    Busy,

    #[error("recipe is already liked")]
    AlreadyLiked,

    #[error("recipe is not liked")]
    NotLiked,

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}
