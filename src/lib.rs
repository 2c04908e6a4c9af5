//! A smoke test for outbound HTTP(S): one GET, the whole body read into memory, nothing retried.
//!
//! See the `client` module for the fetch itself.
//! See the `protocol` module for the HTTP/1.1 wire format.
//! See the `url` module for code representing urls.

pub mod client;

pub mod error;
pub mod protocol;
pub mod url;

#[cfg(feature = "ssl")]
pub mod ssl;
