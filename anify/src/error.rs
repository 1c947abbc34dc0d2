use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("{service} responded with {status}: {body}")]
    Upstream {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for Error {
    /// Request URLs carry the backend `apikey`, so they never reach the message
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.without_url())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
