//! The single failure taxonomy shared by every stage of the toolchain:
//! `{io, lex, parse, resolve, codec, execute}`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{line}:{col}: unrecognized character {found:?}")]
    Lex { line: u32, col: u32, found: char },

    #[error("{line}:{col}: {message}")]
    Parse { line: u32, col: u32, message: String },

    #[error("unresolved label {label:?}")]
    Resolve { label: String },

    #[error("malformed image: {message}")]
    Codec { message: String },

    #[error("execution fault: {message}")]
    Execute { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
