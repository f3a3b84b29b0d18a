//! Procedure call counters from `/proc/net/rpc/nfs` and `/proc/net/rpc/nfsd`.
//!
//! ```text
//! net 0 0 0 0
//! rpc 1363 0 0
//! proc2 18 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
//! proc3 22 0 28 0 4 12 0 311 0 0 0 0 0 0 0 0 0 0 3 2 1 0 0
//! ```
//!
//! Only the `proc2` and `proc3` rows are used. The first value after the row
//! label is the kernel's own procedure count and is skipped.

use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use crate::fsutil;
use crate::metrics::{MetricGroup, MetricSink};

pub const NFSV2_PROCEDURES: [&str; 18] = [
    "null",
    "getattr",
    "setattr",
    "root",
    "lookup",
    "readlink",
    "read",
    "wrcache",
    "write",
    "create",
    "remove",
    "rename",
    "link",
    "symlink",
    "mkdir",
    "rmdir",
    "readdir",
    "fsstat",
];

pub const NFSV3_PROCEDURES: [&str; 22] = [
    "null",
    "getattr",
    "setattr",
    "lookup",
    "access",
    "readlink",
    "read",
    "write",
    "create",
    "mkdir",
    "symlink",
    "mknod",
    "remove",
    "rmdir",
    "rename",
    "link",
    "readdir",
    "readdirplus",
    "fsstat",
    "fsinfo",
    "pathconf",
    "commit",
];

/// Which side of NFS a counter file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Server,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Client => "client",
            Side::Server => "server",
        }
    }
}

fn procedure_names(label: &str) -> Option<(u8, &'static [&'static str])> {
    match label {
        "proc2" => Some((2, &NFSV2_PROCEDURES)),
        "proc3" => Some((3, &NFSV3_PROCEDURES)),
        _ => None,
    }
}

/// Reads one counter file and dispatches an `nfs_procedure` group per procedure.
///
/// Malformed rows are logged and skipped; they never abort the read.
///
/// # Returns
///
/// The number of groups dispatched.
///
/// # Errors
///
/// Returns an `io::Error` if reading from `reader` fails.
pub fn read_procedures<R: BufRead>(
    reader: &mut R,
    origin: &Path,
    side: Side,
    host: &Arc<str>,
    timestamp: u64,
    sink: &mut impl MetricSink,
) -> std::io::Result<usize> {
    let mut line = String::new();
    let mut lineno = 0usize;
    let mut emitted = 0usize;

    while reader.read_line(&mut line)? != 0 {
        lineno += 1;
        if let Some((version, names, values)) = parse_row(&line, origin, lineno) {
            let instance = format!("v{version}{}", side.as_str());
            for (name, value) in names.iter().zip(values) {
                sink.dispatch(
                    MetricGroup::new(Arc::clone(host), instance.clone(), "nfs_procedure", timestamp)
                        .with_type_instance(*name)
                        .with_derives(&["value"], &[value]),
                );
                emitted += 1;
            }
        }
        line.clear();
    }

    Ok(emitted)
}

/// Splits a `procN` row into its version, procedure names and values.
fn parse_row(
    line: &str,
    origin: &Path,
    lineno: usize,
) -> Option<(u8, &'static [&'static str], Vec<u64>)> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return None;
    }
    let (version, names) = procedure_names(fields[0])?;

    let values = &fields[2..];
    if values.len() != names.len() {
        log::warn!(
            "{}:{lineno}: `{}` has {} values, expected {}",
            origin.display(),
            fields[0],
            values.len(),
            names.len()
        );
        return None;
    }

    match values.iter().map(|v| v.parse::<u64>()).collect::<Result<Vec<u64>, _>>() {
        Ok(parsed) => Some((version, names, parsed)),
        Err(err) => {
            log::warn!("{}:{lineno}: invalid value in `{}`: {err}", origin.display(), fields[0]);
            None
        }
    }
}

/// Reads the counter file at `path`. A missing file yields no groups.
pub fn collect(
    path: &Path,
    side: Side,
    host: &Arc<str>,
    timestamp: u64,
    sink: &mut impl MetricSink,
) -> usize {
    let mut reader = match fsutil::open_file_reader(path) {
        Ok(reader) => reader,
        Err(err) => {
            log::trace!("{err}");
            return 0;
        }
    };
    let mut staged: Vec<MetricGroup> = Vec::new();
    match read_procedures(&mut reader, path, side, host, timestamp, &mut staged) {
        Ok(n) => {
            for group in staged {
                sink.dispatch(group);
            }
            n
        }
        Err(err) => {
            log::error!("failed to read `{}`: {err}", path.display());
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::metrics::Value;

    const CLIENT: &str = "\
net 0 0 0 0
rpc 1363 0 0
proc2 18 0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16 17
proc3 22 0 28 0 4 12 0 311 0 0 0 0 0 0 0 0 0 0 3 2 1 0 9
proc4 59 0 0 0
";

    fn host() -> Arc<str> {
        Arc::from("h")
    }

    fn read(input: &str, side: Side) -> Vec<MetricGroup> {
        let mut out = Vec::new();
        let n = read_procedures(
            &mut input.as_bytes(),
            Path::new("/dummy"),
            side,
            &host(),
            5,
            &mut out,
        )
        .unwrap();
        assert_eq!(n, out.len());
        out
    }

    #[test]
    fn reads_v2_and_v3_rows() {
        let groups = read(CLIENT, Side::Client);
        assert_eq!(groups.len(), 18 + 22);

        let v2: Vec<&MetricGroup> = groups
            .iter()
            .filter(|g| g.plugin_instance == "v2client")
            .collect();
        assert_eq!(v2.len(), 18);
        assert_eq!(v2[7].type_instance.as_deref(), Some("wrcache"));
        assert_eq!(v2[7].value("value"), Some(Value::Derive(7)));

        let v3: Vec<&MetricGroup> = groups
            .iter()
            .filter(|g| g.plugin_instance == "v3client")
            .collect();
        assert_eq!(v3.len(), 22);
        assert_eq!(v3[6].type_instance.as_deref(), Some("read"));
        assert_eq!(v3[6].value("value"), Some(Value::Derive(311)));
        assert_eq!(v3[21].type_instance.as_deref(), Some("commit"));
        assert_eq!(v3[21].value("value"), Some(Value::Derive(9)));
        assert!(groups.iter().all(|g| g.type_ == "nfs_procedure"));
    }

    #[test]
    fn server_side_instance() {
        let groups = read("proc3 22 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0\n", Side::Server);
        assert_eq!(groups.len(), 22);
        assert!(groups.iter().all(|g| g.plugin_instance == "v3server"));
    }

    #[test]
    fn wrong_field_count_is_skipped() {
        let input = "proc2 18 1 2 3\nproc3 22 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0\n";
        assert!(read(input, Side::Client).is_empty());
    }

    #[test]
    fn invalid_value_skips_row_only() {
        let input = "\
proc2 18 0 1 2 3 4 5 6 7 8 9 10 11 12 x 14 15 16 17
proc3 22 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0
";
        let groups = read(input, Side::Client);
        assert_eq!(groups.len(), 22);
        assert!(groups.iter().all(|g| g.plugin_instance == "v3client"));
    }

    #[test]
    fn short_rows_are_ignored() {
        assert!(read("proc2\nproc3 22\n\n", Side::Client).is_empty());
    }

    #[test]
    fn missing_file_yields_nothing() {
        let mut out = Vec::new();
        let n = collect(
            Path::new("/definitely/does/not/exist"),
            Side::Client,
            &host(),
            1,
            &mut out,
        );
        assert_eq!(n, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn collect_from_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(CLIENT.as_bytes()).unwrap();
        let mut out = Vec::new();
        assert_eq!(collect(tmp.path(), Side::Client, &host(), 1, &mut out), 40);
        assert_eq!(out.len(), 40);
    }
}
