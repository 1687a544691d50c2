//! Byte sources and sinks a [`RecordStream`](crate::RecordStream) decodes
//! from and encodes into.
//!
//! Closing is a static capability: [`Source`] and [`Sink`] each provide a
//! no-op `close()` that handle-owning types override. Readers and writers
//! without a handle of their own can be wrapped in [`NoClose`].

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// A byte source a stream decodes records from.
pub trait Source: Read + Send {
    /// Release the underlying handle.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A byte sink a stream encodes records into.
pub trait Sink: Write + Send {
    /// Release the underlying handle.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Source for File {}

impl Sink for File {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_data()
    }
}

/// Sink appending to a file, which is opened on the first write.
///
/// Streams opened read-only never touch the file for writing.
#[derive(Debug)]
pub struct AppendFile {
    path: PathBuf,
    file: Option<File>,
}

impl AppendFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    fn file(&mut self) -> io::Result<&mut File> {
        let file = match self.file.take() {
            Some(file) => file,
            None => OpenOptions::new().append(true).open(&self.path)?,
        };
        Ok(self.file.insert(file))
    }
}

impl Write for AppendFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.file {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Sink for AppendFile {
    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(mut file) => Sink::close(&mut file),
            None => Ok(()),
        }
    }
}

/// Wraps a reader or writer that has nothing to release on close.
#[derive(Debug, Default)]
pub struct NoClose<T>(pub T);

impl<T: Read> Read for NoClose<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<T: Write> Write for NoClose<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<T: Read + Send> Source for NoClose<T> {}

impl<T: Write + Send> Sink for NoClose<T> {}

/// Shared in-memory FIFO of bytes.
///
/// Clones share storage: bytes written through any clone are appended to the
/// back and reads through any clone drain from the front. A stream created in
/// memory holds one clone as its source and another as its sink.
#[derive(Debug, Clone, Default)]
pub struct MemoryBuffer {
    bytes: Arc<Mutex<VecDeque<u8>>>,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer pre-filled with `bytes`.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        let buffer = Self::new();
        buffer
            .bytes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(bytes.as_ref());
        buffer
    }

    /// Number of unread bytes.
    pub fn len(&self) -> usize {
        self.lock().map(|bytes| bytes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, VecDeque<u8>>> {
        self.bytes
            .lock()
            .map_err(|_| io::Error::other("memory buffer lock poisoned"))
    }
}

impl Read for MemoryBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut bytes = self.lock()?;
        let n = buf.len().min(bytes.len());
        for (slot, byte) in buf.iter_mut().zip(bytes.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MemoryBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.extend(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Source for MemoryBuffer {}

impl Sink for MemoryBuffer {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_buffer_is_fifo() {
        let mut writer = MemoryBuffer::new();
        let mut reader = writer.clone();
        writer.write_all(b"abc").unwrap();
        writer.write_all(b"def").unwrap();

        let mut first = [0u8; 2];
        reader.read_exact(&mut first).unwrap();
        assert_eq!(&first, b"ab");

        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "cdef");
        assert!(writer.is_empty());
    }

    #[test]
    fn test_memory_buffer_from_bytes() {
        let buffer = MemoryBuffer::from_bytes("x,y\n");
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_no_close_is_noop() {
        let mut sink = NoClose(Vec::new());
        sink.write_all(b"data").unwrap();
        Sink::close(&mut sink).unwrap();
        assert_eq!(sink.0, b"data");

        let mut source = NoClose(&b"abc"[..]);
        Source::close(&mut source).unwrap();
        let mut out = String::new();
        source.read_to_string(&mut out).unwrap();
        assert_eq!(out, "abc");
    }

    #[test]
    fn test_append_file_opens_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.csv");
        let mut sink = AppendFile::new(&path);
        sink.flush().unwrap();
        Sink::close(&mut sink).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_append_file_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        std::fs::write(&path, "a\n").unwrap();
        let mut sink = AppendFile::new(&path);
        sink.write_all(b"b\n").unwrap();
        Sink::close(&mut sink).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_file_sink_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"a,b\n").unwrap();
        Sink::close(&mut file).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
    }
}
