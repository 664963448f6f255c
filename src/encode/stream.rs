//! Lazy chunked encoder output.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::EncodeError;

/// Stops a [`ChunkStream`] from another thread or task.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Request that the stream stop before its next chunk.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

type Chunks<'a> = Box<dyn Iterator<Item = Result<String, EncodeError>> + Send + 'a>;

/// Finite, non-restartable sequence of text chunks.
///
/// Yields `Err(EncodeError::Stopped)` once after a stop request and
/// nothing after the first error.
pub struct ChunkStream<'a> {
    chunks: Chunks<'a>,
    stop: StopHandle,
    finished: bool,
}

impl<'a> ChunkStream<'a> {
    /// Wrap a chunk iterator.
    pub fn new<I>(chunks: I) -> Self
    where
        I: Iterator<Item = Result<String, EncodeError>> + Send + 'a,
    {
        Self {
            chunks: Box::new(chunks),
            stop: StopHandle::default(),
            finished: false,
        }
    }

    /// A stream that yields a single error.
    pub fn failed(err: EncodeError) -> Self {
        Self::new(std::iter::once(Err(err)))
    }

    /// Handle that stops this stream.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Stop this stream before its next chunk.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Whether a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Concatenate every chunk.
    pub fn into_string(self) -> Result<String, EncodeError> {
        let mut out = String::new();
        for chunk in self {
            out.push_str(&chunk?);
        }
        Ok(out)
    }

    /// Write every chunk to a writer, returning the number of bytes written.
    pub fn write_to<W: Write>(self, writer: &mut W) -> Result<u64, EncodeError> {
        let mut written = 0u64;
        for chunk in self {
            let chunk = chunk?;
            writer.write_all(chunk.as_bytes())?;
            written += chunk.len() as u64;
        }
        writer.flush()?;
        Ok(written)
    }
}

impl Iterator for ChunkStream<'_> {
    type Item = Result<String, EncodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if self.stop.is_stopped() {
            self.finished = true;
            return Some(Err(EncodeError::Stopped));
        }
        match self.chunks.next() {
            Some(Ok(chunk)) => Some(Ok(chunk)),
            Some(Err(err)) => {
                self.finished = true;
                Some(Err(err))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

impl std::fmt::Debug for ChunkStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStream")
            .field("stopped", &self.stop.is_stopped())
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers() -> ChunkStream<'static> {
        ChunkStream::new((0..5).map(|i| Ok(i.to_string())))
    }

    #[test]
    fn test_into_string() {
        assert_eq!(numbers().into_string().unwrap(), "01234");
    }

    #[test]
    fn test_stop_ends_stream() {
        let mut stream = numbers();
        assert_eq!(stream.next().unwrap().unwrap(), "0");

        stream.stop_handle().stop();
        assert!(matches!(stream.next(), Some(Err(EncodeError::Stopped))));
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_error_fuses_stream() {
        let chunks = vec![
            Ok("a".to_string()),
            Err(EncodeError::Stopped),
            Ok("b".to_string()),
        ];
        let mut stream = ChunkStream::new(chunks.into_iter());
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_write_to_counts_bytes() {
        let mut buf = Vec::new();
        let written = numbers().write_to(&mut buf).unwrap();
        assert_eq!(written, 5);
        assert_eq!(buf, b"01234");
    }
}
