use std::fmt;

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    NotConnected,
    AuthFailed(String),
    SessionExpired(String),
    PageNotFound(String),
    Timeout(String),
    UnknownProp(String),
    WriteRejected { prop: String, reason: String },
    CycleFailed,
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::NotConnected => write!(f, "not connected"),
            Error::AuthFailed(msg) => write!(f, "authentication failed: {msg}"),
            Error::SessionExpired(page) => {
                write!(f, "session expired fetching {page} (re-login did not help)")
            }
            Error::PageNotFound(page) => write!(f, "page not found: {page}"),
            Error::Timeout(page) => write!(f, "timeout fetching {page}"),
            Error::UnknownProp(prop) => write!(f, "unknown property: {prop}"),
            Error::WriteRejected { prop, reason } => {
                write!(f, "write to {prop} rejected: {reason}")
            }
            Error::CycleFailed => write!(f, "poll cycle failed: no page could be fetched"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
