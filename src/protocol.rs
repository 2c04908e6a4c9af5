use crate::error::{Error, Result};
use std::cmp;
use std::fmt;
use std::io::{self, Read, Write};
use std::str;

pub struct CrLfStream<R> {
    stream: R,
}

impl<R: io::Read> CrLfStream<R> {
    pub fn new(stream: R) -> Self {
        CrLfStream { stream }
    }

    pub fn into_inner(self) -> R {
        self.stream
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = 0;
        loop {
            return match self.stream.read(std::slice::from_mut(&mut byte)) {
                Ok(0) => Ok(None),
                Ok(_) => Ok(Some(byte)),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e.into()),
            };
        }
    }

    fn inner_next(&mut self) -> Result<Option<String>> {
        let mut line = Vec::new();
        while let Some(byte) = self.read_byte()? {
            line.push(byte);
            if line.ends_with(b"\r\n") {
                let before = &line[..(line.len() - 2)];
                if before.is_empty() {
                    return Ok(None);
                } else {
                    return Ok(Some(str::from_utf8(before)?.into()));
                }
            }
        }
        Err(Error::UnexpectedEof("Expected \\r\\n".into()))
    }

    pub fn expect_next(&mut self) -> Result<String> {
        self.inner_next()?
            .ok_or_else(|| Error::UnexpectedEof("Expected line".into()))
    }
}

impl<R: io::Read> Iterator for CrLfStream<R> {
    type Item = Result<String>;
    fn next(&mut self) -> Option<Result<String>> {
        self.inner_next().transpose()
    }
}


struct Parser<'a> {
    s: &'a str,
    position: usize,
}

impl<'a> Parser<'a> {
    fn new(s: &'a str) -> Self {
        Parser { s, position: 0 }
    }

    fn expect(&mut self, expected: &str) -> Result<()> {
        if self.position >= self.s.len() {
            return Err(Error::UnexpectedEof(format!("Expected {}", expected)));
        }

        let remaining = &self.s[self.position..];
        if !remaining.starts_with(expected) {
            let end = cmp::min(remaining.len(), expected.len());
            return Err(Error::ParseError(format!(
                "Expected '{}', got '{}'",
                expected,
                remaining.get(..end).unwrap_or(remaining)
            )));
        }
        self.position += expected.len();
        Ok(())
    }

    fn parse_digit(&mut self) -> Result<u32> {
        let c = self.s[self.position..]
            .chars()
            .next()
            .ok_or_else(|| Error::UnexpectedEof("Expected digit".into()))?;
        let digit = c
            .to_digit(10)
            .ok_or_else(|| Error::ParseError(format!("Expected digit, got '{}'", c)))?;
        self.position += c.len_utf8();
        Ok(digit)
    }

    fn parse_until(&mut self, div: &str) -> Result<&'a str> {
        if self.position >= self.s.len() {
            return Err(Error::UnexpectedEof(format!("Expected '{}'", div)));
        }

        let remaining = &self.s[self.position..];
        let pos = remaining.find(div).ok_or_else(|| {
            Error::ParseError(format!("Expected '{}' in '{}'", div, remaining))
        })?;
        self.position += pos;
        Ok(&remaining[..pos])
    }

    fn consume_whitespace(&mut self) {
        let remaining = &self.s[self.position..];
        self.position += remaining.len() - remaining.trim_start_matches(&[' ', '\t'][..]).len();
    }

    fn parse_token(&mut self) -> Result<&'a str> {
        if self.position >= self.s.len() {
            return Err(Error::UnexpectedEof("Expected token".into()));
        }

        let remaining = &self.s[self.position..];
        let token = remaining
            .split(|c| c == ' ' || c == '\t')
            .next()
            .unwrap_or(remaining);
        self.position += token.len();
        self.consume_whitespace();

        Ok(token)
    }

    fn parse_number(&mut self) -> Result<u32> {
        Ok(self.parse_token()?.parse()?)
    }

    fn parse_remaining(&mut self) -> &'a str {
        let remaining = self.s.get(self.position..).unwrap_or("");
        self.position = self.s.len();
        remaining
    }
}

#[cfg(test)]
mod parser_tests {
    use super::Parser;

    #[test]
    fn parse_empty() {
        let mut parser = Parser::new("");
        assert!(parser.expect("a").is_err());
        assert!(parser.parse_digit().is_err());
        assert!(parser.parse_token().is_err());
    }

    #[test]
    fn expect_failure() {
        let mut parser = Parser::new("abcdefg");
        parser.expect("abc").unwrap();
        assert!(parser.expect("deg").is_err());
        parser.expect("defg").unwrap();
        assert!(parser.expect("a").is_err());
    }

    #[test]
    fn parse_token_with_lots_of_space() {
        let mut parser = Parser::new("abc  \t    def");
        assert_eq!(parser.parse_token().unwrap(), "abc");
        assert_eq!(parser.parse_token().unwrap(), "def");
        assert!(parser.parse_token().is_err());
    }

    #[test]
    fn parse_until() {
        let mut parser = Parser::new("abc_def");
        assert_eq!(parser.parse_until("_").unwrap(), "abc");
        parser.expect("_").unwrap();
        assert!(parser.parse_until("_").is_err());
    }

    #[test]
    fn parse_number_failure() {
        let mut parser = Parser::new("123 abc");
        assert_eq!(parser.parse_number().unwrap(), 123);
        assert!(parser.parse_number().is_err());
    }

    #[test]
    fn parse_digit_rejects_letters() {
        let mut parser = Parser::new("1x");
        assert_eq!(parser.parse_digit().unwrap(), 1);
        assert!(parser.parse_digit().is_err());
    }

    #[test]
    fn parse_remaining_empty() {
        let mut parser = Parser::new("200 OK");
        parser.expect("200 OK").unwrap();
        assert_eq!(parser.parse_remaining(), "");
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HttpVersion {
    major: u32,
    minor: u32,
}

impl HttpVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        HttpVersion { major, minor }
    }
}

impl str::FromStr for HttpVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parser = Parser::new(s);
        parser.expect("HTTP/")?;

        let major = parser.parse_digit()?;
        parser.expect(".")?;
        let minor = parser.parse_digit()?;
        if !parser.parse_remaining().is_empty() {
            return Err(Error::ParseError(format!("Trailing data in version '{}'", s)));
        }
        Ok(HttpVersion::new(major, minor))
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod http_version_tests {
    use super::HttpVersion;
    use test_case::test_case;

    #[test]
    fn parse_success() {
        assert_eq!(
            "HTTP/1.1".parse::<HttpVersion>().unwrap(),
            HttpVersion::new(1, 1)
        );
        assert_eq!(
            "HTTP/1.0".parse::<HttpVersion>().unwrap(),
            HttpVersion::new(1, 0)
        );
    }

    #[test_case("HTTP/" ; "missing numbers")]
    #[test_case("HTTP/11.1" ; "two digit major")]
    #[test_case("HTTP/1" ; "missing minor")]
    #[test_case("HRRP/1.2" ; "bad prefix")]
    fn parse_error(input: &str) {
        assert!(input.parse::<HttpVersion>().is_err());
    }

    #[test]
    fn display() {
        assert_eq!(&HttpVersion::new(1, 1).to_string(), "HTTP/1.1");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    OK,
    MovedPermanently,
    Found,
    NotFound,
    InternalServerError,
    Unknown(u32),
}

impl HttpStatus {
    pub fn code(&self) -> u32 {
        match self {
            HttpStatus::OK => 200,
            HttpStatus::MovedPermanently => 301,
            HttpStatus::Found => 302,
            HttpStatus::NotFound => 404,
            HttpStatus::InternalServerError => 500,
            HttpStatus::Unknown(v) => *v,
        }
    }

    /// 1xx responses other than `101 Switching Protocols` precede the real response.
    pub fn is_interim(&self) -> bool {
        let code = self.code();
        (100..200).contains(&code) && code != 101
    }
}

impl str::FromStr for HttpStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parser = Parser::new(s);
        match parser.parse_number()? {
            200 => Ok(HttpStatus::OK),
            301 => Ok(HttpStatus::MovedPermanently),
            302 => Ok(HttpStatus::Found),
            404 => Ok(HttpStatus::NotFound),
            500 => Ok(HttpStatus::InternalServerError),
            v if (100..1000).contains(&v) => Ok(HttpStatus::Unknown(v)),
            v => Err(Error::ParseError(format!("Invalid status code {}", v))),
        }
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HttpStatus::OK => write!(f, "200 OK"),
            HttpStatus::MovedPermanently => write!(f, "301 Moved Permanently"),
            HttpStatus::Found => write!(f, "302 Found"),
            HttpStatus::NotFound => write!(f, "404 Not Found"),
            HttpStatus::InternalServerError => write!(f, "500 Internal Server Error"),
            HttpStatus::Unknown(v) => write!(f, "{}", v),
        }
    }
}


#[derive(Debug, PartialEq, Eq)]
struct HttpHeader {
    key: String,
    value: String,
}

impl HttpHeader {
    fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        HttpHeader {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl str::FromStr for HttpHeader {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parser = Parser::new(s);
        let key = parser.parse_until(":")?;
        parser.expect(":")?;
        let value = parser.parse_remaining().trim_matches(|c| c == ' ' || c == '\t');

        Ok(HttpHeader::new(key, value))
    }
}

#[cfg(test)]
mod http_header_tests {
    use super::HttpHeader;

    #[test]
    fn parse_success() {
        assert_eq!(
            "key: value".parse::<HttpHeader>().unwrap(),
            HttpHeader::new("key", "value")
        );
        assert_eq!(
            "key:value1 value2  ".parse::<HttpHeader>().unwrap(),
            HttpHeader::new("key", "value1 value2")
        );
    }

    #[test]
    fn parse_failure_no_value() {
        assert!("key".parse::<HttpHeader>().is_err());
    }
}

/// Header fields in the order they were added. Lookups ignore ASCII case.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    headers: Vec<HttpHeader>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|h| h.key.eq_ignore_ascii_case(key))
            .map(|h| h.value.as_str())
    }

    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let header = HttpHeader::new(key, value);
        self.headers
            .retain(|h| !h.key.eq_ignore_ascii_case(&header.key));
        self.headers.push(header);
    }

    fn deserialize<R: io::Read>(s: &mut CrLfStream<R>) -> Result<Self> {
        let mut headers = HttpHeaders::new();
        let mut pending: Option<String> = None;
        for line in s {
            let line = line?;
            if line.starts_with(' ') || line.starts_with('\t') {
                // obsolete line folding
                let prev = pending
                    .as_mut()
                    .ok_or_else(|| Error::ParseError("Continuation before any header".into()))?;
                prev.push(' ');
                prev.push_str(line.trim_start());
                continue;
            }
            if let Some(prev) = pending.replace(line) {
                headers.headers.push(prev.parse()?);
            }
        }
        if let Some(prev) = pending {
            headers.headers.push(prev.parse()?);
        }
        Ok(headers)
    }
}

impl fmt::Display for HttpHeaders {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for h in &self.headers {
            write!(f, "{}: {}\r\n", h.key, h.value)?;
        }
        Ok(())
    }
}


#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum HttpMethod {
    Get,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub uri: String,
    pub version: HttpVersion,
    pub headers: HttpHeaders,
}

impl fmt::Display for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}\r\n", self.method, self.uri, self.version)?;
        write!(f, "{}", self.headers)?;
        write!(f, "\r\n")?;
        Ok(())
    }
}

impl HttpRequest {
    pub fn new<S: Into<String>>(method: HttpMethod, uri: S) -> Self {
        HttpRequest {
            method,
            uri: uri.into(),
            version: HttpVersion::new(1, 1),
            headers: HttpHeaders::new(),
        }
    }

    pub fn add_header<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        self.headers.insert(key, value);
    }

    /// Write the request head to `w`. GET requests never carry a body.
    pub fn serialize<W: io::Write>(&self, mut w: W) -> Result<()> {
        write!(w, "{}", self)?;
        w.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod http_request_tests {
    use super::{HttpMethod, HttpRequest};

    #[test]
    fn serialize() {
        let mut request = HttpRequest::new(HttpMethod::Get, "/a/b");
        request.add_header("Host", "example.com");
        request.add_header("Accept", "*/*");

        let mut out = Vec::new();
        request.serialize(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "GET /a/b HTTP/1.1\r\nHost: example.com\r\nAccept: */*\r\n\r\n"
        );
    }
}

enum BodyFraming {
    Chunked { remaining_in_chunk: u64, done: bool },
    Limited { remaining: u64 },
    UntilClose,
}

/// A response body. Owns the stream it is read from, so dropping the body releases the
/// connection.
pub struct HttpBody<S> {
    stream: io::BufReader<S>,
    framing: BodyFraming,
}

impl<S: io::Read> HttpBody<S> {
    fn chunked(stream: io::BufReader<S>) -> Self {
        HttpBody {
            stream,
            framing: BodyFraming::Chunked {
                remaining_in_chunk: 0,
                done: false,
            },
        }
    }

    fn limited(stream: io::BufReader<S>, length: u64) -> Self {
        HttpBody {
            stream,
            framing: BodyFraming::Limited { remaining: length },
        }
    }

    fn until_close(stream: io::BufReader<S>) -> Self {
        HttpBody {
            stream,
            framing: BodyFraming::UntilClose,
        }
    }

    fn from_headers(stream: io::BufReader<S>, headers: &HttpHeaders) -> Result<Self> {
        if let Some(encoding) = headers.get("Transfer-Encoding") {
            let last = encoding.rsplit(',').next().unwrap_or("").trim();
            if last.eq_ignore_ascii_case("chunked") {
                return Ok(HttpBody::chunked(stream));
            }
            return Ok(HttpBody::until_close(stream));
        }

        if let Some(length) = headers.get("Content-Length") {
            let length = length.trim().parse()?;
            return Ok(HttpBody::limited(stream, length));
        }

        Ok(HttpBody::until_close(stream))
    }

    /// Bytes still expected when the server sent a `Content-Length`.
    pub fn content_length(&self) -> Option<u64> {
        match self.framing {
            BodyFraming::Limited { remaining } => Some(remaining),
            _ => None,
        }
    }

    /// Drain the whole body into memory and decode it as text. Invalid UTF-8 is replaced rather
    /// than rejected.
    pub fn read_to_end_string(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        drain(self, &mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read_chunk_size(&mut self) -> Result<u64> {
        let line = read_crlf_line(&mut self.stream)?;
        // chunk extensions come after ';'
        let size = line.split(';').next().unwrap_or("").trim();
        let invalid = || Error::ParseError(format!("Invalid chunk size '{}'", size));
        if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        u64::from_str_radix(size, 16).map_err(|_| invalid())
    }

    fn read_chunked(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            let (remaining_in_chunk, done) = match self.framing {
                BodyFraming::Chunked {
                    remaining_in_chunk,
                    done,
                } => (remaining_in_chunk, done),
                _ => unreachable!(),
            };

            if done || buf.is_empty() {
                return Ok(0);
            }

            if remaining_in_chunk > 0 {
                let max = cmp::min(buf.len() as u64, remaining_in_chunk) as usize;
                let n = io::Read::read(&mut self.stream, &mut buf[..max])?;
                if n == 0 {
                    return Err(Error::UnexpectedEof(format!(
                        "{} bytes missing from chunk",
                        remaining_in_chunk
                    )));
                }
                let remaining_in_chunk = remaining_in_chunk - n as u64;
                if remaining_in_chunk == 0 {
                    expect_crlf(&mut self.stream)?;
                }
                self.framing = BodyFraming::Chunked {
                    remaining_in_chunk,
                    done: false,
                };
                return Ok(n);
            }

            let size = self.read_chunk_size()?;
            if size == 0 {
                // trailers, then the terminating empty line
                for trailer in CrLfStream::new(&mut self.stream) {
                    trailer?;
                }
                self.framing = BodyFraming::Chunked {
                    remaining_in_chunk: 0,
                    done: true,
                };
            } else {
                self.framing = BodyFraming::Chunked {
                    remaining_in_chunk: size,
                    done: false,
                };
            }
        }
    }

    fn read_inner(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self.framing {
            BodyFraming::Chunked { .. } => self.read_chunked(buf),
            BodyFraming::Limited { remaining } => {
                if remaining == 0 || buf.is_empty() {
                    return Ok(0);
                }
                let max = cmp::min(buf.len() as u64, remaining) as usize;
                let n = io::Read::read(&mut self.stream, &mut buf[..max])?;
                if n == 0 {
                    return Err(Error::UnexpectedEof(format!(
                        "{} bytes missing from body",
                        remaining
                    )));
                }
                self.framing = BodyFraming::Limited {
                    remaining: remaining - n as u64,
                };
                Ok(n)
            }
            BodyFraming::UntilClose => Ok(io::Read::read(&mut self.stream, buf)?),
        }
    }
}

impl<S: io::Read> io::Read for HttpBody<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_inner(buf).map_err(|e| match e {
            Error::IoError(e) => e,
            Error::UnexpectedEof(s) => io::Error::new(io::ErrorKind::UnexpectedEof, s),
            e => io::Error::new(io::ErrorKind::InvalidData, e.to_string()),
        })
    }
}

fn drain<S: io::Read>(body: &mut HttpBody<S>, out: &mut Vec<u8>) -> Result<()> {
    let mut buf = [0u8; 8 * 1024];
    loop {
        match body.read_inner(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(Error::IoError(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

fn read_crlf_line<R: io::Read>(r: &mut R) -> Result<String> {
    CrLfStream::new(r)
        .next()
        .unwrap_or_else(|| Err(Error::ParseError("Expected chunk size".into())))
}

fn expect_crlf<R: io::Read>(r: &mut R) -> Result<()> {
    let mut crlf = [0u8; 2];
    r.read_exact(&mut crlf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::UnexpectedEof("Expected \\r\\n after chunk".into()),
        _ => e.into(),
    })?;
    if &crlf != b"\r\n" {
        return Err(Error::ParseError("Expected \\r\\n after chunk".into()));
    }
    Ok(())
}

pub struct HttpResponse<S> {
    pub version: HttpVersion,
    pub status: HttpStatus,
    pub headers: HttpHeaders,
    pub body: HttpBody<S>,
}

impl<S: io::Read> HttpResponse<S> {
    /// Read the status line and headers off `stream`. Interim 1xx heads are read and discarded
    /// until the final one arrives. The body is left unread.
    pub fn deserialize(stream: S) -> Result<Self> {
        let mut lines = CrLfStream::new(io::BufReader::new(stream));
        let (version, status, headers) = loop {
            let first_line = lines.expect_next()?;
            let mut parser = Parser::new(&first_line);

            let version: HttpVersion = parser.parse_token()?.parse()?;
            let status: HttpStatus = parser.parse_remaining().parse()?;
            let headers = HttpHeaders::deserialize(&mut lines)?;

            if !status.is_interim() {
                break (version, status, headers);
            }
            log::debug!("skipping interim response {}", status);
        };
        let body = HttpBody::from_headers(lines.into_inner(), &headers)?;

        Ok(HttpResponse {
            version,
            status,
            headers,
            body,
        })
    }
}

impl<S> fmt::Debug for HttpResponse<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("version", &self.version)
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish()
    }
}
