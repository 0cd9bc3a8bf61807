//! Gzip decorator for any [`ReadWritable`].
//!
//! Inflates transparently on read and deflates on write. Closing a write
//! stream finalizes the gzip trailer first, then closes the delegate
//! stream, composing the two closes the way the delegate expects.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use runboard_core::{Error, Result};
use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::stream::{CacheKey, ReadWritable, Readable, WriteCloser};

/// A [`ReadWritable`] that gzips entries stored in its delegate.
#[derive(Clone)]
pub struct GzipReadWritable {
    delegate: Arc<dyn ReadWritable>,
}

impl GzipReadWritable {
    /// Wrap a delegate cache with transparent gzip (de)compression.
    pub fn new(delegate: Arc<dyn ReadWritable>) -> Self {
        GzipReadWritable { delegate }
    }
}

impl Readable for GzipReadWritable {
    fn new_read_closer(&self, key: &CacheKey) -> Result<Box<dyn Read + Send>> {
        let inner = self.delegate.new_read_closer(key)?;
        Ok(Box::new(GzDecoder::new(inner)))
    }
}

impl ReadWritable for GzipReadWritable {
    fn new_write_closer(&self, key: &CacheKey) -> Result<Box<dyn WriteCloser>> {
        let inner = self.delegate.new_write_closer(key)?;
        Ok(Box::new(GzipWriteCloser {
            encoder: Some(GzEncoder::new(inner, Compression::default())),
        }))
    }
}

struct GzipWriteCloser {
    // None once closed; the encoder owns the delegate until finish().
    encoder: Option<GzEncoder<Box<dyn WriteCloser>>>,
}

impl Write for GzipWriteCloser {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                Error::WriteAfterClose.to_string(),
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.encoder.as_mut() {
            Some(encoder) => encoder.flush(),
            None => Ok(()),
        }
    }
}

impl WriteCloser for GzipWriteCloser {
    fn close(&mut self) -> Result<()> {
        let encoder = match self.encoder.take() {
            Some(encoder) => encoder,
            None => return Ok(()),
        };
        let mut delegate = encoder.finish()?;
        delegate.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemCache;
    use proptest::prelude::*;

    fn gz_cache() -> (MemCache, GzipReadWritable) {
        let mem = MemCache::new();
        (mem.clone(), GzipReadWritable::new(Arc::new(mem)))
    }

    fn round_trip(gz: &GzipReadWritable, key: &CacheKey, data: &[u8]) -> Vec<u8> {
        let mut w = gz.new_write_closer(key).unwrap();
        w.write_all(data).unwrap();
        w.close().unwrap();

        let mut out = Vec::new();
        gz.new_read_closer(key).unwrap().read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn round_trips_bytes_unchanged() {
        let (_, gz) = gz_cache();
        let data = b"a moderately compressible payload payload payload".to_vec();
        assert_eq!(round_trip(&gz, &"k".into(), &data), data);
    }

    #[test]
    fn round_trips_empty_input() {
        let (_, gz) = gz_cache();
        assert_eq!(round_trip(&gz, &"k".into(), b""), b"");
    }

    #[test]
    fn stored_bytes_are_compressed() {
        let (mem, gz) = gz_cache();
        let data = vec![b'x'; 4096];
        round_trip(&gz, &"k".into(), &data);

        let mut raw = Vec::new();
        mem.new_read_closer(&"k".into())
            .unwrap()
            .read_to_end(&mut raw)
            .unwrap();
        assert!(raw.len() < data.len());
        // gzip magic
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn read_miss_passes_through() {
        let (_, gz) = gz_cache();
        assert!(gz.new_read_closer(&"absent".into()).err().unwrap().is_cache_miss());
    }

    #[test]
    fn write_after_close_errors() {
        let (_, gz) = gz_cache();
        let mut w = gz.new_write_closer(&"k".into()).unwrap();
        w.write_all(b"x").unwrap();
        w.close().unwrap();
        assert!(w.write_all(b"y").is_err());
        assert!(w.close().is_ok());
    }

    proptest! {
        #[test]
        fn round_trips_arbitrary_bytes(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
            let (_, gz) = gz_cache();
            prop_assert_eq!(round_trip(&gz, &"k".into(), &data), data);
        }
    }
}
