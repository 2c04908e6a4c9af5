use crate::error::{Error, Result};
use std::fmt;
use std::str;
pub use url::Url;

#[derive(PartialEq, Debug, Clone)]
pub enum Scheme {
    Http,
    Https,
    Other(String),
}

impl Scheme {
    pub fn of(url: &Url) -> Self {
        match url.scheme().parse() {
            Ok(s) => s,
            Err(_) => Scheme::Other(url.scheme().into()),
        }
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            Scheme::Http => Some(80),
            Scheme::Https => Some(443),
            Scheme::Other(_) => None,
        }
    }
}

impl str::FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_lowercase().as_ref() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            s => Scheme::Other(s.into()),
        })
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Scheme::Http => write!(f, "http"),
            Scheme::Https => write!(f, "https"),
            Scheme::Other(s) => write!(f, "{}", s),
        }
    }
}

/// The host and port a connection for `url` should be opened to.
pub fn host_and_port(url: &Url) -> Result<(&str, u16)> {
    let scheme = Scheme::of(url);
    let host = url
        .host_str()
        .ok_or_else(|| Error::ParseError(format!("'{}' has no host", url)))?;
    let port = url
        .port()
        .or_else(|| scheme.default_port())
        .ok_or_else(|| Error::UnsupportedScheme(scheme.to_string()))?;
    Ok((host, port))
}

/// The request target sent on the request line: path plus query, never the fragment.
pub fn request_target(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().into(),
    }
}

/// The value of the `Host` header, which carries the port only when it isn't the default.
pub fn host_header(url: &Url) -> Result<String> {
    let (host, _) = host_and_port(url)?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_parse() {
        assert_eq!("http".parse::<Scheme>().unwrap(), Scheme::Http);
        assert_eq!("HTTPS".parse::<Scheme>().unwrap(), Scheme::Https);
        assert_eq!(
            "ftp".parse::<Scheme>().unwrap(),
            Scheme::Other("ftp".into())
        );
    }

    #[test]
    fn scheme_to_port() {
        let url = Url::parse("http://google.com").unwrap();
        assert_eq!(host_and_port(&url).unwrap(), ("google.com", 80));

        let url = Url::parse("https://www.google.com").unwrap();
        assert_eq!(host_and_port(&url).unwrap(), ("www.google.com", 443));

        let url = Url::parse("http://google.com:9090").unwrap();
        assert_eq!(host_and_port(&url).unwrap(), ("google.com", 9090));

        let url = Url::parse("derp://google.com").unwrap();
        assert!(host_and_port(&url).is_err());
    }

    #[test]
    fn target_keeps_query_drops_fragment() {
        let url = Url::parse("http://google.com").unwrap();
        assert_eq!(request_target(&url), "/");

        let url = Url::parse("http://google.com/a/b?foo=1#bar").unwrap();
        assert_eq!(request_target(&url), "/a/b?foo=1");
    }

    #[test]
    fn host_header_includes_explicit_port() {
        let url = Url::parse("https://www.google.com/").unwrap();
        assert_eq!(host_header(&url).unwrap(), "www.google.com");

        let url = Url::parse("http://localhost:8080/").unwrap();
        assert_eq!(host_header(&url).unwrap(), "localhost:8080");
    }
}
