use super::{Error, Result};
use std::{fmt, io};

/// A client-side TLS session over `Stream`. The server certificate is checked against the
/// system trust store and must match `host`.
pub struct SslClientStream<Stream>(native_tls::TlsStream<Stream>);

impl<Stream: io::Read + io::Write + fmt::Debug + 'static> SslClientStream<Stream> {
    pub fn new(host: &str, stream: Stream) -> Result<Self> {
        let connector = native_tls::TlsConnector::builder().build()?;
        Ok(Self(connector.connect(host, stream)?))
    }
}

impl<Stream: io::Read + io::Write> io::Read for SslClientStream<Stream> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut self.0, buf)
    }

    fn read_vectored(&mut self, bufs: &mut [io::IoSliceMut<'_>]) -> io::Result<usize> {
        io::Read::read_vectored(&mut self.0, bufs)
    }
}

impl<Stream: io::Read + io::Write> io::Write for SslClientStream<Stream> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut self.0, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut self.0)
    }
}

impl<Stream: fmt::Debug> fmt::Debug for SslClientStream<Stream> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("SslClientStream").field(self.0.get_ref()).finish()
    }
}

// native-tls wants the stream to be 'static to hand it back inside the error
impl<Stream: fmt::Debug + 'static> From<native_tls::HandshakeError<Stream>> for Error {
    fn from(e: native_tls::HandshakeError<Stream>) -> Self {
        Self(e.to_string())
    }
}

impl From<native_tls::Error> for Error {
    fn from(e: native_tls::Error) -> Self {
        Self(e.to_string())
    }
}
