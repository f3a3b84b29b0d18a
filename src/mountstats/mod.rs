//! Per-mount NFS client statistics from `/proc/self/mountstats`.
//!
//! A pass reads the whole report, turns every NFS block into a
//! [`MountRecord`] and emits it through the configured [`MountTable`]
//! policies. Groups are only released to the caller's sink once the pass
//! completed; an aborted pass contributes nothing.
pub mod availability;
mod emit;
mod error;
mod parser;
mod record;
mod tokenizer;

use std::path::Path;

use crate::config::MountTable;
use crate::fsutil::{self, ReadLimits};
use crate::metrics::{MetricGroup, MetricSink};

pub use emit::{EmitContext, emit_record, filter_and_emit};
pub use error::{Error, ErrorKind, ParseError, Result};
pub use parser::{DeviceLine, Parser, State, is_device_line, is_nfs_fstype, parse_device_line, parse_reader};
pub use record::{MountRecord, PerOpStat, PerOpTable, Transport, TransportKind};
pub use tokenizer::{Cursor, TokenError};

/// Runs one complete pass over the report at `path`.
///
/// # Arguments
///
/// * `path` - Location of the mountstats report.
/// * `limits` - Per-pass caps on bytes and lines.
/// * `table` - Mount policies used to filter records.
/// * `ctx` - Host name and timestamp stamped on every group.
/// * `sink` - Receives the groups of a successful pass.
///
/// # Returns
///
/// The number of groups dispatched to `sink`.
///
/// # Errors
///
/// Any [`Error`] from opening or parsing the report. In that case nothing is
/// dispatched, including groups of blocks that parsed before the failure.
pub fn collect_pass(
    path: &Path,
    limits: ReadLimits,
    table: &MountTable,
    ctx: &EmitContext,
    sink: &mut impl MetricSink,
) -> Result<usize> {
    let reader = fsutil::open_file_reader(path)?;
    let mut staged: Vec<MetricGroup> = Vec::new();
    let records = parse_reader(reader, path, limits, |record| {
        filter_and_emit(record, table, ctx, &mut staged);
    })?;

    log::debug!(
        "mountstats pass over `{}`: {records} NFS mounts, {} groups",
        path.display(),
        staged.len()
    );
    let emitted = staged.len();
    for group in staged {
        sink.dispatch(group);
    }
    Ok(emitted)
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// A report with two non-NFS mounts followed by one NFSv4 mount.
    pub const SAMPLE_REPORT: &str = "\
device rootfs mounted on / with fstype rootfs
device proc mounted on /proc with fstype proc
device srv:/export mounted on /mnt/nfs with fstype nfs4 statvers=1.1
\topts:\trw,vers=4.1,rsize=1048576,wsize=1048576,namlen=255,acregmin=3,acregmax=60,hard,proto=tcp,timeo=600,retrans=2,sec=sys
\tage:\t7200
\tcaps:\tcaps=0x3ffdf,wtmult=512,dtsize=32768,bsize=0,namlen=255
\tsec:\tflavor=1,pseudoflavor=1
\tevents:\t101 102 103 104 105 106 107 108 109 110 111 112 113 114 115 116 117 118 119 120 121 122 123 124 125 126 127
\tbytes:\t1 2 3 4 5 6 7 8
\tRPC iostats version: 1.1  p/v: 100003/4 (nfs)
\txprt:\ttcp 0 1 1 0 10 100 100 0 50 0 2 0 5
\tper-op statistics
\t        NULL: 1 1 0 44 24 0 0 1 0
\t        READ: 5 5 0 700 9000 1 3 4 0
\t       WRITE: 10 2 0 512 600 5 7 1 0

";

    /// One NFS block with `ops` generated per-op rows named `OP0`, `OP1`, ...
    pub fn per_op_report(mountpoint: &str, ops: usize) -> String {
        let mut report = format!(
            "device srv:{mountpoint} mounted on {mountpoint} with fstype nfs statvers=1.1\n\tage:\t7200\n\tper-op statistics\n"
        );
        for i in 0..ops {
            report.push_str(&format!("\tOP{i}: {i} 0 0 0 0 0 0 0\n"));
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::io::Write;
    use std::sync::Arc;

    use tempfile::NamedTempFile;

    use super::fixtures::SAMPLE_REPORT;
    use super::*;
    use crate::config::{MountPolicy, PerOpFilter, WILDCARD};

    fn ctx() -> EmitContext {
        EmitContext {
            host: Arc::from("h"),
            timestamp: 1,
        }
    }

    fn table() -> MountTable {
        MountTable::new(BTreeMap::from([(
            WILDCARD.to_owned(),
            MountPolicy {
                min_age: 0,
                show: true,
                per_op: PerOpFilter::All,
            },
        )]))
    }

    fn report(contents: &str) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(contents.as_bytes()).unwrap();
        tmp
    }

    #[test]
    fn successful_pass_dispatches_everything() {
        let tmp = report(SAMPLE_REPORT);
        let mut out = Vec::new();
        let n = collect_pass(tmp.path(), ReadLimits::default(), &table(), &ctx(), &mut out).unwrap();
        assert_eq!(n, 7);
        assert_eq!(out.len(), 7);
        assert!(out.iter().all(|g| g.plugin_instance == "_mnt_nfs"));
    }

    #[test]
    fn failed_pass_dispatches_nothing() {
        let contents = format!("{SAMPLE_REPORT}device s:/b mounted on /b with fstype nfs\n\txprt:\tsctp 1\n");
        let tmp = report(&contents);
        let mut out = Vec::new();
        let err = collect_pass(tmp.path(), ReadLimits::default(), &table(), &ctx(), &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GrammarViolation);
        assert!(out.is_empty());
    }

    #[test]
    fn non_utf8_mount_path_does_not_abort_pass() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(b"device /dev/sdb1 mounted on /mnt/caf\xe9 with fstype ext4\n")
            .unwrap();
        tmp.write_all(SAMPLE_REPORT.as_bytes()).unwrap();

        let mut out = Vec::new();
        let n = collect_pass(tmp.path(), ReadLimits::default(), &table(), &ctx(), &mut out).unwrap();
        assert_eq!(n, 7);
        assert!(out.iter().all(|g| g.plugin_instance == "_mnt_nfs"));
    }

    #[test]
    fn missing_report() {
        let mut out = Vec::new();
        let err = collect_pass(
            Path::new("/definitely/does/not/exist"),
            ReadLimits::default(),
            &table(),
            &ctx(),
            &mut out,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingSource);
        assert!(out.is_empty());
    }
}
