//! A single-shot HTTP client.
//!
//! [`get`] opens one connection, sends one `GET`, and drains the whole response body into a
//! `String`. Nothing is retried and redirects are not followed. The connection is owned by the
//! response, so it is closed exactly once no matter which step fails.
//!
//! ```no_run
//! let body = http_smoke::client::get("https://www.google.com")?;
//! println!("{}", body);
//! # Ok::<(), http_smoke::error::FetchError>(())
//! ```
use crate::error::{Error, FetchError, Result};
use crate::protocol::{HttpMethod, HttpRequest, HttpResponse};
use crate::url::{self, Scheme, Url};
use log::debug;
use std::convert::TryInto;
use std::fmt::Display;
use std::io;
use std::net::TcpStream;

#[cfg(feature = "ssl")]
use crate::ssl::SslClientStream;

pub struct HttpRequestBuilder {
    request: HttpRequest,
}

impl HttpRequestBuilder {
    pub fn get<U: TryInto<Url>>(url: U) -> Result<Self>
    where
        <U as TryInto<Url>>::Error: Display,
    {
        HttpRequestBuilder::new(url, HttpMethod::Get)
    }

    pub fn new<U: TryInto<Url>>(url: U, method: HttpMethod) -> Result<Self>
    where
        <U as TryInto<Url>>::Error: Display,
    {
        let url = parse_url(url)?;
        let mut request = HttpRequest::new(method, url::request_target(&url));
        request.add_header("Host", url::host_header(&url)?);
        request.add_header("User-Agent", concat!("http_smoke/", env!("CARGO_PKG_VERSION")));
        request.add_header("Accept", "*/*");
        request.add_header("Connection", "close");
        Ok(HttpRequestBuilder { request })
    }

    /// Write the request to `socket` and read back the response head. The returned response
    /// owns `socket`.
    pub fn send<S: io::Read + io::Write>(self, mut socket: S) -> Result<HttpResponse<S>> {
        self.request.serialize(io::BufWriter::new(&mut socket))?;
        HttpResponse::deserialize(socket)
    }
}

fn parse_url<U: TryInto<Url>>(url: U) -> Result<Url>
where
    <U as TryInto<Url>>::Error: Display,
{
    url.try_into()
        .map_err(|e| Error::ParseError(e.to_string()))
}

/// Represents the ability to open a new abstract connection to the host named by a url.
pub trait StreamConnector {
    type Stream: io::Read + io::Write;

    fn connect(&self, url: &Url) -> Result<Self::Stream>;
}

/// Connects over TCP using the system resolver, adding TLS for `https` urls.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetConnector;

#[derive(Debug)]
pub enum NetStream {
    Plain(TcpStream),
    #[cfg(feature = "ssl")]
    Ssl(SslClientStream<TcpStream>),
}

impl io::Read for NetStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            NetStream::Plain(s) => io::Read::read(s, buf),
            #[cfg(feature = "ssl")]
            NetStream::Ssl(s) => io::Read::read(s, buf),
        }
    }
}

impl io::Write for NetStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            NetStream::Plain(s) => io::Write::write(s, buf),
            #[cfg(feature = "ssl")]
            NetStream::Ssl(s) => io::Write::write(s, buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            NetStream::Plain(s) => io::Write::flush(s),
            #[cfg(feature = "ssl")]
            NetStream::Ssl(s) => io::Write::flush(s),
        }
    }
}

impl StreamConnector for NetConnector {
    type Stream = NetStream;

    fn connect(&self, url: &Url) -> Result<NetStream> {
        let scheme = Scheme::of(url);
        match &scheme {
            Scheme::Http => {}
            #[cfg(feature = "ssl")]
            Scheme::Https => {}
            s => return Err(Error::UnsupportedScheme(s.to_string())),
        }

        let (host, port) = url::host_and_port(url)?;
        let addrs = url.socket_addrs(|| scheme.default_port())?;
        debug!("connecting to {}:{} ({} addresses)", host, port, addrs.len());
        let stream = TcpStream::connect(&addrs[..])?;

        match scheme {
            #[cfg(feature = "ssl")]
            Scheme::Https => Ok(NetStream::Ssl(SslClientStream::new(host, stream)?)),
            _ => Ok(NetStream::Plain(stream)),
        }
    }
}

/// An open connection. Dropping it closes the underlying stream.
pub struct Connection<S> {
    stream: S,
    peer: String,
}

impl<S> Connection<S> {
    fn new(stream: S, url: &Url) -> Self {
        let peer = match url::host_and_port(url) {
            Ok((host, port)) => format!("{}:{}", host, port),
            Err(_) => url.to_string(),
        };
        Connection { stream, peer }
    }
}

impl<S: io::Read> io::Read for Connection<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.stream, buf)
    }
}

impl<S: io::Write> io::Write for Connection<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut self.stream, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut self.stream)
    }
}

impl<S> Drop for Connection<S> {
    fn drop(&mut self) {
        debug!("closing connection to {}", self.peer);
    }
}

fn request<C: StreamConnector>(
    connector: &C,
    url: Url,
) -> Result<HttpResponse<Connection<C::Stream>>> {
    let stream = connector.connect(&url)?;
    let connection = Connection::new(stream, &url);
    let response = HttpRequestBuilder::get(url)?.send(connection)?;
    debug!(
        "{} {} (content length {:?})",
        response.version,
        response.status.code(),
        response.body.content_length()
    );
    Ok(response)
}

/// Fetch `url` through `connector` and return the whole response body as text.
///
/// Exactly one connection is requested from `connector`. The response status is not checked.
pub fn fetch<C: StreamConnector, U: TryInto<Url>>(
    connector: &C,
    url: U,
) -> std::result::Result<String, FetchError>
where
    <U as TryInto<Url>>::Error: Display,
{
    let url = parse_url(url).map_err(FetchError::Request)?;
    let mut response = request(connector, url).map_err(FetchError::Request)?;
    let body = response
        .body
        .read_to_end_string()
        .map_err(FetchError::BodyRead)?;
    debug!("read {} bytes of body", body.len());
    Ok(body)
}

/// Fetch `url` over the network. See [`fetch`].
pub fn get<U: TryInto<Url>>(url: U) -> std::result::Result<String, FetchError>
where
    <U as TryInto<Url>>::Error: Display,
{
    fetch(&NetConnector, url)
}
