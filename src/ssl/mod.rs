//! TLS for `https` connections. The backend is picked with a cargo feature.
use crate::error;

#[derive(Debug)]
pub struct Error(String);

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for error::Error {
    fn from(e: Error) -> Self {
        error::Error::SslError(e.0)
    }
}

#[cfg(not(feature = "native-tls"))]
compile_error!("the `ssl` feature needs a TLS backend such as `ssl-native-tls`");

#[cfg(feature = "native-tls")]
#[path = "native_tls.rs"]
mod inner;

pub use inner::*;
