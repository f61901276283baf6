use std::{error, fmt, io};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    WebApiError(String),
    StorageError(String),
    ConfigError(String),
    InvalidRating(u8),
    InvalidBinding { level: u8 },
    FetchAborted,
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WebApiError(err) | Self::StorageError(err) | Self::ConfigError(err) => {
                f.write_str(err)
            }
            Self::InvalidRating(value) => write!(f, "Invalid rating: {value}"),
            Self::InvalidBinding { level } => {
                write!(f, "Invalid playlist URL for {level}-star rating")
            }
            Self::FetchAborted => write!(f, "Track fetch aborted"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::StorageError(err.to_string())
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Error {
        Error::WebApiError(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::WebApiError(err.to_string())
    }
}
