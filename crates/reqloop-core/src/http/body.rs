//! Request payloads and their replay semantics.
//!
//! A retry resends the body from its first byte, so every payload says up
//! front whether it can be rewound. In-memory and seekable payloads can; a
//! one-shot reader cannot, and the executor refuses to retry with one.

use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// Anything that can be read and repositioned to its start.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

enum Source {
    Buffered(Cursor<Vec<u8>>),
    Seekable(Box<dyn ReadSeek>),
    Stream(Box<dyn Read + Send>),
}

/// Request entity plus its declared content length.
pub struct RequestBody {
    source: Source,
    content_length: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body is a one-shot stream and cannot be replayed")]
    NotReplayable,
    #[error("failed to rewind request body: {0}")]
    Rewind(#[from] io::Error),
}

impl RequestBody {
    /// In-memory payload; always replayable.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let content_length = Some(data.len() as u64);
        Self {
            source: Source::Buffered(Cursor::new(data)),
            content_length,
        }
    }

    /// Seekable payload (e.g. a file); replayable by seeking to the start.
    pub fn from_seekable<R>(reader: R, content_length: Option<u64>) -> Self
    where
        R: Read + Seek + Send + 'static,
    {
        Self {
            source: Source::Seekable(Box::new(reader)),
            content_length,
        }
    }

    /// One-shot payload; cannot be replayed on retry.
    pub fn from_stream<R>(reader: R, content_length: Option<u64>) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            source: Source::Stream(Box::new(reader)),
            content_length,
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    pub fn is_replayable(&self) -> bool {
        !matches!(self.source, Source::Stream(_))
    }

    /// Reposition the payload at its first byte.
    pub fn rewind(&mut self) -> Result<(), BodyError> {
        match &mut self.source {
            Source::Buffered(cursor) => {
                cursor.set_position(0);
                Ok(())
            }
            Source::Seekable(reader) => {
                reader.seek(SeekFrom::Start(0))?;
                Ok(())
            }
            Source::Stream(_) => Err(BodyError::NotReplayable),
        }
    }

    /// Whole payload when it is held in memory.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.source {
            Source::Buffered(cursor) => Some(cursor.get_ref().as_slice()),
            _ => None,
        }
    }
}

impl Read for RequestBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.source {
            Source::Buffered(cursor) => cursor.read(buf),
            Source::Seekable(reader) => reader.read(buf),
            Source::Stream(reader) => reader.read(buf),
        }
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.source {
            Source::Buffered(_) => "buffered",
            Source::Seekable(_) => "seekable",
            Source::Stream(_) => "stream",
        };
        f.debug_struct("RequestBody")
            .field("kind", &kind)
            .field("content_length", &self.content_length)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(body: &mut RequestBody) -> Vec<u8> {
        let mut out = Vec::new();
        body.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn buffered_body_replays_after_rewind() {
        let mut body = RequestBody::from_bytes(b"{\"name\":\"x\"}".to_vec());
        assert_eq!(body.content_length(), Some(12));
        assert!(body.is_replayable());
        let first = read_all(&mut body);
        assert!(read_all(&mut body).is_empty());
        body.rewind().unwrap();
        assert_eq!(read_all(&mut body), first);
    }

    #[test]
    fn seekable_body_replays_after_rewind() {
        let mut body = RequestBody::from_seekable(Cursor::new(b"abc".to_vec()), Some(3));
        assert_eq!(read_all(&mut body), b"abc");
        body.rewind().unwrap();
        assert_eq!(read_all(&mut body), b"abc");
        assert!(body.as_bytes().is_none());
    }

    #[test]
    fn stream_body_cannot_rewind() {
        let mut body = RequestBody::from_stream(io::repeat(b'x').take(4), None);
        assert!(!body.is_replayable());
        assert!(matches!(body.rewind(), Err(BodyError::NotReplayable)));
    }
}
