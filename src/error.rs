use std::convert;
use std::error;
use std::fmt;
use std::io;
use std::num;
use std::str;

#[derive(Debug)]
pub enum Error {
    ParseError(String),
    ParseIntError(num::ParseIntError),
    Utf8Error(str::Utf8Error),
    IoError(io::Error),
    UnexpectedEof(String),
    SslError(String),
    UnsupportedScheme(String),
}

pub type Result<R> = std::result::Result<R, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(s) => write!(f, "parse error: {}", s),
            Error::ParseIntError(e) => write!(f, "invalid number: {}", e),
            Error::Utf8Error(e) => write!(f, "invalid utf-8: {}", e),
            Error::IoError(e) => write!(f, "{}", e),
            Error::UnexpectedEof(s) => write!(f, "unexpected end of stream: {}", s),
            Error::SslError(s) => write!(f, "tls error: {}", s),
            Error::UnsupportedScheme(s) => write!(f, "unsupported scheme '{}'", s),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::ParseError(_) => None,
            Error::IoError(e) => Some(e),
            Error::Utf8Error(e) => Some(e),
            Error::ParseIntError(e) => Some(e),
            Error::UnexpectedEof(_) => None,
            Error::SslError(_) => None,
            Error::UnsupportedScheme(_) => None,
        }
    }
}

impl convert::From<str::Utf8Error> for Error {
    fn from(e: str::Utf8Error) -> Self {
        Error::Utf8Error(e)
    }
}

impl convert::From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::IoError(e)
    }
}

impl convert::From<num::ParseIntError> for Error {
    fn from(e: num::ParseIntError) -> Self {
        Error::ParseIntError(e)
    }
}

impl convert::From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::ParseError(e.to_string())
    }
}

/// The two ways a fetch can fail. Neither is retried.
#[derive(Debug)]
pub enum FetchError {
    /// The request could not be issued or its response head never arrived. Covers URL parsing,
    /// DNS, TCP, TLS and malformed status lines.
    Request(Error),
    /// The response arrived but its body could not be drained.
    BodyRead(Error),
}

impl FetchError {
    pub fn inner(&self) -> &Error {
        match self {
            FetchError::Request(e) | FetchError::BodyRead(e) => e,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FetchError::Request(e) => write!(f, "request failed: {}", e),
            FetchError::BodyRead(e) => write!(f, "reading response body failed: {}", e),
        }
    }
}

impl error::Error for FetchError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.inner())
    }
}
