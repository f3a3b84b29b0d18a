//! Line-oriented state machine for `/proc/self/mountstats`.
//!
//! The report is a sequence of device blocks. Only blocks for NFS mounts carry
//! statistics; every other filesystem contributes a single `device` line.
//!
//! ```text
//! device srv:/export mounted on /mnt/nfs with fstype nfs4 statvers=1.1
//! 	opts:	rw,vers=4.1,...
//! 	age:	7200
//! 	events:	<25 or more counters>
//! 	bytes:	<8 counters>
//! 	RPC iostats version: 1.1  p/v: 100003/4 (nfs)
//! 	xprt:	tcp <10 or more counters>
//! 	per-op statistics
//! 	        NULL: <8 or more counters>
//! 	        READ: <8 or more counters>
//! ```
//!
//! Lines are consumed one at a time with no lookahead. A completed block is
//! handed to a callback as soon as the next `device` line (or the end of the
//! input) is seen.

use std::io::BufRead;
use std::path::Path;

use crate::fsutil::{BoundedLines, LineReadError, ReadLimits};

use super::error::{Error, ParseError, Result};
use super::record::{MountRecord, PerOpStat, Transport, TransportKind};
use super::tokenizer::Cursor;

const DEVICE_TOKEN: &str = "device";
const FSTYPE_LITERAL: &str = " with fstype ";
const MOUNTED_ON_LITERAL: &str = " mounted on ";
const PER_OP_MARKER: &str = "per-op statistics";

/// Parser states. Every line is first checked for a `device` boundary
/// regardless of the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    AwaitingDevice,
    InDeviceHeader,
    InPerOpTable,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            State::AwaitingDevice => "awaiting_device",
            State::InDeviceHeader => "device_header",
            State::InPerOpTable => "per_op_table",
        };
        write!(f, "{name}")
    }
}

/// The three pieces of a `device` line this parser cares about.
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceLine<'a> {
    pub device: &'a str,
    pub mountpoint: &'a str,
    pub fstype: &'a str,
}

/// Returns `true` if `line` starts with the `device` token.
pub fn is_device_line(line: &str) -> bool {
    line.strip_prefix(DEVICE_TOKEN)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
}

/// Splits a `device` line into share, mount point and filesystem type.
///
/// The kernel prints `device <share> mounted on <path> with fstype <type> ...`,
/// but the two literals are located independently so either order parses.
///
/// # Errors
///
/// Returns [`ParseError::MissingLiteral`] if ` with fstype ` or ` mounted on `
/// is absent.
pub fn parse_device_line(line: &str) -> std::result::Result<DeviceLine<'_>, ParseError> {
    let rest = line
        .strip_prefix(DEVICE_TOKEN)
        .ok_or(ParseError::ExpectedDevice)?
        .trim_start_matches([' ', '\t']);
    // The search includes the leading blank, so look from one byte earlier.
    let haystack = &line[line.len() - rest.len() - 1..];
    let fstype_at = haystack
        .find(FSTYPE_LITERAL)
        .ok_or(ParseError::MissingLiteral {
            literal: FSTYPE_LITERAL,
        })?;
    let mounted_at = haystack
        .find(MOUNTED_ON_LITERAL)
        .ok_or(ParseError::MissingLiteral {
            literal: MOUNTED_ON_LITERAL,
        })?;

    let device = haystack[..fstype_at.min(mounted_at)].trim_matches([' ', '\t']);
    let mount_start = mounted_at + MOUNTED_ON_LITERAL.len();
    // The literals share a blank when the mount point is empty.
    let mountpoint = if mounted_at < fstype_at {
        haystack.get(mount_start..fstype_at).unwrap_or("")
    } else {
        &haystack[mount_start..]
    }
    .trim_matches([' ', '\t']);
    let fstype = Cursor::new(&haystack[fstype_at + FSTYPE_LITERAL.len()..])
        .peek_token()
        .unwrap_or("");

    Ok(DeviceLine {
        device,
        mountpoint,
        fstype,
    })
}

/// Returns `true` for `nfs`, `nfs2`, `nfs3` and `nfs4`.
pub fn is_nfs_fstype(fstype: &str) -> bool {
    matches!(fstype, "nfs" | "nfs2" | "nfs3" | "nfs4")
}

/// Incremental mountstats parser owning the accumulator for the current block.
#[derive(Debug)]
pub struct Parser {
    state: State,
    record: MountRecord,
    line_no: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self {
            state: State::AwaitingDevice,
            record: MountRecord::default(),
            line_no: 0,
        }
    }
}

impl Parser {
    pub fn state(&self) -> State {
        self.state
    }

    /// Number of lines fed so far.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    /// Feeds one line (without trailing newline).
    ///
    /// A `device` line finalizes any pending record through `on_record`
    /// before it is processed.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if the line violates the grammar for the
    /// current state. The parser keeps its state so the caller can report it;
    /// call [`Parser::abort`] before dropping or reusing it.
    pub fn feed_line<F>(&mut self, line: &str, on_record: &mut F) -> std::result::Result<(), ParseError>
    where
        F: FnMut(&MountRecord),
    {
        self.line_no += 1;

        if is_device_line(line) {
            self.finalize(on_record);
            self.state = State::AwaitingDevice;
        }

        match self.state {
            State::AwaitingDevice => self.on_awaiting_device(line),
            State::InDeviceHeader => self.on_device_header(line),
            State::InPerOpTable => self.on_per_op_line(line),
        }
    }

    /// Finalizes the pending record at end of input.
    pub fn finish<F>(&mut self, on_record: &mut F)
    where
        F: FnMut(&MountRecord),
    {
        self.finalize(on_record);
        self.state = State::AwaitingDevice;
    }

    /// Discards the in-progress record and returns to the initial state.
    pub fn abort(&mut self) {
        self.record.clear();
        self.state = State::AwaitingDevice;
    }

    fn finalize<F>(&mut self, on_record: &mut F)
    where
        F: FnMut(&MountRecord),
    {
        if !self.record.is_pending() {
            return;
        }
        self.record.log_dump();
        on_record(&self.record);
        self.record.clear();
    }

    fn on_awaiting_device(&mut self, line: &str) -> std::result::Result<(), ParseError> {
        if line.trim().is_empty() {
            return Ok(());
        }
        if !is_device_line(line) {
            return Err(ParseError::ExpectedDevice);
        }

        let parsed = parse_device_line(line)?;
        if !is_nfs_fstype(parsed.fstype) {
            log::trace!(
                "skipping non-NFS mount `{}` (fstype `{}`)",
                parsed.mountpoint,
                parsed.fstype
            );
            return Ok(());
        }
        if parsed.mountpoint.is_empty() {
            return Err(ParseError::MissingLiteral {
                literal: MOUNTED_ON_LITERAL,
            });
        }

        self.record.mountpoint = parsed.mountpoint.to_owned();
        self.record.device = parsed.device.to_owned();
        self.record.fstype = parsed.fstype.to_owned();
        self.state = State::InDeviceHeader;
        Ok(())
    }

    fn on_device_header(&mut self, line: &str) -> std::result::Result<(), ParseError> {
        let line = line.trim_start_matches([' ', '\t']);

        if let Some(rest) = line.strip_prefix("age:") {
            let age = Cursor::new(rest)
                .parse_signed()
                .map_err(|source| ParseError::Token {
                    section: "age",
                    source,
                })?
                .ok_or(ParseError::MissingAge)?;
            self.record.age = u64::try_from(age).map_err(|_| ParseError::NegativeAge(age))?;
        } else if let Some(rest) = line.strip_prefix("events:") {
            parse_counters("events", rest, &mut self.record.events)?;
        } else if let Some(rest) = line.strip_prefix("bytes:") {
            parse_counters("bytes", rest, &mut self.record.bytes)?;
        } else if let Some(rest) = line.strip_prefix("xprt:") {
            self.record.transport = parse_transport(rest)?;
        } else if line.starts_with(PER_OP_MARKER) {
            self.state = State::InPerOpTable;
        }
        Ok(())
    }

    fn on_per_op_line(&mut self, line: &str) -> std::result::Result<(), ParseError> {
        let line = line.trim_matches([' ', '\t']);
        if line.is_empty() {
            return Ok(());
        }

        let (name, rest) = line
            .split_once(':')
            .ok_or(ParseError::MissingOpSeparator)?;
        let name = name.trim_end_matches([' ', '\t']);
        if name.is_empty() {
            return Err(ParseError::MissingOpSeparator);
        }

        let mut counters = [0u64; 8];
        parse_counters("per-op", rest, &mut counters)?;
        self.record
            .per_op
            .push(PerOpStat {
                name: name.to_owned(),
                counters,
            })
            .map_err(ParseError::Allocation)
    }
}

fn parse_counters(
    section: &'static str,
    rest: &str,
    out: &mut [u64],
) -> std::result::Result<(), ParseError> {
    let found = Cursor::new(rest)
        .parse_unsigned_sequence(out)
        .map_err(|source| ParseError::Token { section, source })?;
    if found < out.len() {
        return Err(ParseError::FieldCount {
            section,
            expected: out.len(),
            found,
        });
    }
    Ok(())
}

fn parse_transport(rest: &str) -> std::result::Result<Transport, ParseError> {
    let mut cursor = Cursor::new(rest);
    let token = cursor.next_token().unwrap_or("");
    let kind = TransportKind::from_token(token)
        .ok_or_else(|| ParseError::UnknownTransport(token.to_owned()))?;

    let mut transport = Transport::zeroed(kind);
    parse_counters("xprt", cursor.rest(), transport.values_mut())?;
    Ok(transport)
}

/// Runs one full pass over a mountstats report.
///
/// Every completed NFS block is passed to `on_record`. On error the pending
/// block is discarded; blocks already handed out stay with the caller.
///
/// # Arguments
///
/// * `reader` - Buffered reader over the report.
/// * `origin` - Logical origin of the data, used in error messages.
/// * `limits` - Per-pass caps on bytes and lines read.
/// * `on_record` - Called once per finalized record.
///
/// # Returns
///
/// The number of NFS records finalized.
///
/// # Errors
///
/// - [`Error::ReadLine`] if reading from the source fails.
/// - [`Error::Parse`] for grammar violations, field count shortfalls,
///   allocation failures or exceeded limits.
pub fn parse_reader<R, F>(reader: R, origin: &Path, limits: ReadLimits, mut on_record: F) -> Result<usize>
where
    R: BufRead,
    F: FnMut(&MountRecord),
{
    let mut lines = BoundedLines::new(reader, limits);
    let mut parser = Parser::default();
    let mut finalized = 0usize;
    let mut counted = |record: &MountRecord| {
        finalized += 1;
        on_record(record);
    };

    loop {
        let line = match lines.next_line() {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(LineReadError::Io(source)) => {
                parser.abort();
                return Err(Error::ReadLine {
                    path: origin.to_path_buf(),
                    line: parser.line_no() + 1,
                    source,
                });
            }
            Err(limit) => {
                let state = parser.state();
                parser.abort();
                return Err(Error::Parse {
                    path: origin.to_path_buf(),
                    line: parser.line_no() + 1,
                    state,
                    raw: String::new(),
                    source: ParseError::Limit(limit),
                });
            }
        };

        if let Err(source) = parser.feed_line(line, &mut counted) {
            let state = parser.state();
            parser.abort();
            return Err(Error::Parse {
                path: origin.to_path_buf(),
                line: parser.line_no(),
                state,
                raw: line.to_owned(),
                source,
            });
        }
    }

    parser.finish(&mut counted);
    Ok(finalized)
}
