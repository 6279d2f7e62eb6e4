pub mod password;
pub mod token;

pub use password::*;
pub use token::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token invalid or expired")]
    InvalidToken,

    #[error("Token issued for a different purpose")]
    WrongPurpose,

    #[error("Stored password hash is malformed")]
    MalformedHash,

    #[error("Token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}
