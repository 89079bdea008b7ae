//! Counted raw transfers.
//!
//! `read_exact`/`write_all` report failure without saying how far they got;
//! these loops return the byte count so callers can report short transfers.

use std::io::{ErrorKind, Read, Write};
use std::path::Path;

use crate::util::{Error, Result};

/// Read until `buf` is full or the source is exhausted.
///
/// Returns the number of bytes read.
pub fn read_counted<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Write all of `buf` unless the sink stops accepting bytes.
///
/// Returns the number of bytes written.
pub fn write_counted<W: Write>(writer: &mut W, buf: &[u8]) -> std::io::Result<usize> {
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    writer.flush()?;
    Ok(written)
}

/// Write all of `buf` to `writer`, failing with [`Error::ShortWrite`] if the
/// sink stops early. `path` names the destination in the error.
pub fn write_exact<W: Write>(writer: &mut W, buf: &[u8], path: &Path) -> Result<()> {
    let written = write_counted(writer, buf)?;
    if written < buf.len() {
        return Err(Error::ShortWrite {
            path: path.to_path_buf(),
            expected: buf.len() as u64,
            actual: written as u64,
        });
    }
    Ok(())
}

/// Sink that accepts at most `limit` bytes, three at a time.
#[cfg(test)]
pub(crate) struct Limited {
    pub data: Vec<u8>,
    pub limit: usize,
}

#[cfg(test)]
impl Limited {
    pub fn new(limit: usize) -> Self {
        Self {
            data: Vec::new(),
            limit,
        }
    }
}

#[cfg(test)]
impl Write for Limited {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = buf.len().min(self.limit - self.data.len()).min(3);
        self.data.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_counted_short_source() {
        let mut src: &[u8] = &[1, 2, 3];
        let mut buf = [0u8; 8];
        assert_eq!(read_counted(&mut src, &mut buf).unwrap(), 3);
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }

    #[test]
    fn test_read_counted_exact() {
        let mut src: &[u8] = &[9; 16];
        let mut buf = [0u8; 8];
        assert_eq!(read_counted(&mut src, &mut buf).unwrap(), 8);
        assert_eq!(src.len(), 8);
    }

    #[test]
    fn test_write_counted_short_sink() {
        let mut sink = Limited::new(5);
        assert_eq!(write_counted(&mut sink, &[7u8; 10]).unwrap(), 5);
        assert_eq!(sink.data, vec![7u8; 5]);

        let mut sink = Limited::new(64);
        assert_eq!(write_counted(&mut sink, &[7u8; 10]).unwrap(), 10);
    }

    #[test]
    fn test_write_exact_reports_short_write() {
        let path = Path::new("mesh.iwm/data/points.raw");
        let mut sink = Limited::new(7);
        let err = write_exact(&mut sink, &[1u8; 12], path).unwrap_err();
        assert!(matches!(
            err,
            Error::ShortWrite { ref path, expected: 12, actual: 7 } if path.ends_with("points.raw")
        ));

        let mut sink = Limited::new(12);
        write_exact(&mut sink, &[1u8; 12], path).unwrap();
        assert_eq!(sink.data.len(), 12);
    }
}
