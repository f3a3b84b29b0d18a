use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Error that occurs when opening a file fails.
#[derive(Debug, thiserror::Error)]
#[error("failed to open file `{path}`: {source}")]
pub struct FileOpenError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Opens a file at the given path and wraps it in a [`BufReader`].
///
/// # Errors
///
/// Returns a [`FileOpenError`] if the file cannot be opened.
///
/// # Example
/// ```no_run
/// # use nfs_collector::fsutil;
/// let reader = fsutil::open_file_reader("/proc/self/mountstats")?;
/// # Ok::<(), fsutil::FileOpenError>(())
/// ```
pub fn open_file_reader(path: impl AsRef<Path>) -> Result<BufReader<File>, FileOpenError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| FileOpenError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(BufReader::new(file))
}

/// Errors returned by [`BoundedLines::next_line`].
#[derive(Debug, thiserror::Error)]
pub enum LineReadError {
    #[error("failed to read line: {0}")]
    Io(#[from] io::Error),
    #[error("input exceeds {limit} bytes")]
    TooManyBytes { limit: u64 },
    #[error("input exceeds {limit} lines")]
    TooManyLines { limit: usize },
}

/// Upper bounds for a single pass over a pseudo-file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadLimits {
    pub max_bytes: u64,
    pub max_lines: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        Self {
            max_bytes: 16 * 1024 * 1024,
            max_lines: 1_000_000,
        }
    }
}

/// Line reader that refuses to consume more than [`ReadLimits`] allow.
///
/// Pseudo-files under `/proc` are generated on the fly and have no size
/// known in advance, so every pass is capped.
#[derive(Debug)]
pub struct BoundedLines<R> {
    reader: R,
    raw: Vec<u8>,
    buf: String,
    limits: ReadLimits,
    bytes_read: u64,
    line_no: usize,
}

impl<R: BufRead> BoundedLines<R> {
    pub fn new(reader: R, limits: ReadLimits) -> Self {
        Self {
            reader,
            raw: Vec::with_capacity(256),
            buf: String::with_capacity(256),
            limits,
            bytes_read: 0,
            line_no: 0,
        }
    }

    /// Returns the next line without its trailing newline, or `None` at end of input.
    ///
    /// Bytes that are not valid UTF-8 (the kernel does not escape them in
    /// mount paths) are replaced with `U+FFFD`.
    ///
    /// # Errors
    ///
    /// Returns [`LineReadError::Io`] if the underlying read fails and one of the
    /// limit variants once the configured caps are crossed.
    pub fn next_line(&mut self) -> Result<Option<&str>, LineReadError> {
        self.raw.clear();
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.raw)?;
        if n == 0 {
            return Ok(None);
        }

        self.bytes_read += n as u64;
        self.line_no += 1;
        if self.bytes_read > self.limits.max_bytes {
            return Err(LineReadError::TooManyBytes {
                limit: self.limits.max_bytes,
            });
        }
        if self.line_no > self.limits.max_lines {
            return Err(LineReadError::TooManyLines {
                limit: self.limits.max_lines,
            });
        }

        self.buf.push_str(&String::from_utf8_lossy(&self.raw));
        Ok(Some(self.buf.trim_end_matches(['\n', '\r'])))
    }
}
