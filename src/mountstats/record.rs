//! Accumulator for a single device block of `/proc/self/mountstats`.
//!
//! A [`MountRecord`] is owned by one parse pass, filled in line by line and
//! cleared with [`MountRecord::clear`] whenever a block has been finalized.

use std::collections::TryReserveError;

/// Names of the `events:` counters, in report order.
pub const EVENT_COUNTERS: [&str; 25] = [
    "inoderevalidates",
    "dentryrevalidates",
    "datainvalidates",
    "attrinvalidates",
    "vfsopen",
    "vfslookup",
    "vfspermission",
    "vfsupdatepage",
    "vfsreadpage",
    "vfsreadpages",
    "vfswritepage",
    "vfswritepages",
    "vfsreaddir",
    "vfssetattr",
    "vfsflush",
    "vfsfsync",
    "vfslock",
    "vfsrelease",
    "congestionwait",
    "setattrtrunc",
    "extendwrite",
    "sillyrenames",
    "shortreads",
    "shortwrites",
    "delay",
];

/// Names of the `bytes:` counters, in report order.
pub const BYTE_COUNTERS: [&str; 8] = [
    "normalreadbytes",
    "normalwritebytes",
    "directreadbytes",
    "directwritebytes",
    "serverreadbytes",
    "serverwritebytes",
    "readpages",
    "writepages",
];

/// See `net/sunrpc/xprtsock.c` in the Linux kernel sources.
pub const XPRT_UDP_COUNTERS: [&str; 7] = [
    "port",
    "bind_count",
    "rpcsends",
    "rpcreceives",
    "badxids",
    "inflightsends",
    "backlogutil",
];

pub const XPRT_TCP_COUNTERS: [&str; 10] = [
    "port",
    "bind_count",
    "connect_count",
    "connect_time",
    "idle_time",
    "rpcsends",
    "rpcreceives",
    "badxids",
    "inflightsends",
    "backlogutil",
];

pub const XPRT_RDMA_COUNTERS: [&str; 19] = [
    "port",
    "bind_count",
    "connect_count",
    "connect_time",
    "idle_time",
    "rpcsends",
    "rpcreceives",
    "badxids",
    "backlogutil",
    "read_chunks",
    "write_chunks",
    "reply_chunks",
    "total_rdma_req",
    "total_rdma_rep",
    "pullup",
    "fixup",
    "hardway",
    "failed_marshal",
    "bad_reply",
];

/// Names of the eight per-operation counters.
pub const PER_OP_COUNTERS: [&str; 8] = [
    "ops",
    "ntrans",
    "timeouts",
    "bytes_sent",
    "bytes_recv",
    "queue",
    "rtt",
    "execute",
];

/// Number of per-op entries the table grows by whenever it is full.
pub const PER_OP_CHUNK: usize = 50;

/// Transport protocol named on an `xprt:` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Tcp,
    Udp,
    Rdma,
}

impl TransportKind {
    /// Maps the protocol token of an `xprt:` line.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "tcp" => Some(Self::Tcp),
            "udp" => Some(Self::Udp),
            "rdma" => Some(Self::Rdma),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
            Self::Rdma => "rdma",
        }
    }

    /// Counter names for this protocol, which also fix the field count.
    pub fn counter_names(&self) -> &'static [&'static str] {
        match self {
            Self::Tcp => &XPRT_TCP_COUNTERS,
            Self::Udp => &XPRT_UDP_COUNTERS,
            Self::Rdma => &XPRT_RDMA_COUNTERS,
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RPC transport counters; the variant decides how many fields exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Tcp([u64; 10]),
    Udp([u64; 7]),
    Rdma([u64; 19]),
}

impl Default for Transport {
    fn default() -> Self {
        Transport::Tcp([0; 10])
    }
}

impl Transport {
    /// A zeroed transport of the given kind.
    pub fn zeroed(kind: TransportKind) -> Self {
        match kind {
            TransportKind::Tcp => Transport::Tcp([0; 10]),
            TransportKind::Udp => Transport::Udp([0; 7]),
            TransportKind::Rdma => Transport::Rdma([0; 19]),
        }
    }

    pub fn kind(&self) -> TransportKind {
        match self {
            Transport::Tcp(_) => TransportKind::Tcp,
            Transport::Udp(_) => TransportKind::Udp,
            Transport::Rdma(_) => TransportKind::Rdma,
        }
    }

    pub fn values(&self) -> &[u64] {
        match self {
            Transport::Tcp(v) => v,
            Transport::Udp(v) => v,
            Transport::Rdma(v) => v,
        }
    }

    pub fn values_mut(&mut self) -> &mut [u64] {
        match self {
            Transport::Tcp(v) => v,
            Transport::Udp(v) => v,
            Transport::Rdma(v) => v,
        }
    }
}

/// One row of the `per-op statistics` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerOpStat {
    pub name: String,
    pub counters: [u64; 8],
}

/// Append-only list of per-op rows that grows in [`PER_OP_CHUNK`] steps.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PerOpTable {
    entries: Vec<PerOpStat>,
}

impl PerOpTable {
    /// Appends a row, reserving another chunk first if the table is full.
    ///
    /// # Errors
    ///
    /// Returns the allocator error if the chunk cannot be reserved. The
    /// existing rows are left untouched.
    pub fn push(&mut self, entry: PerOpStat) -> Result<(), TryReserveError> {
        if self.entries.len() == self.entries.capacity() {
            self.entries.try_reserve_exact(PER_OP_CHUNK)?;
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PerOpStat> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a PerOpTable {
    type Item = &'a PerOpStat;
    type IntoIter = std::slice::Iter<'a, PerOpStat>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Everything gathered so far for one NFS mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRecord {
    /// Local mount point; empty while no block is pending.
    pub mountpoint: String,
    /// Remote share, e.g. `server:/export`. Only used for diagnostics.
    pub device: String,
    /// `nfs`, `nfs2`, `nfs3` or `nfs4`.
    pub fstype: String,
    /// Seconds since the filesystem was mounted.
    pub age: u64,
    pub events: [u64; 25],
    pub bytes: [u64; 8],
    pub transport: Transport,
    pub per_op: PerOpTable,
}

impl Default for MountRecord {
    fn default() -> Self {
        Self {
            mountpoint: String::new(),
            device: String::new(),
            fstype: String::new(),
            age: 0,
            events: [0; 25],
            bytes: [0; 8],
            transport: Transport::default(),
            per_op: PerOpTable::default(),
        }
    }
}

impl MountRecord {
    /// Returns `true` if a device block has been started and not yet finalized.
    pub fn is_pending(&self) -> bool {
        !self.mountpoint.is_empty()
    }

    /// Resets every field and releases the per-op storage.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Logs the full record at debug level.
    pub fn log_dump(&self) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        log::debug!(
            "mountstats record: mountpoint={}, device={}, fstype={}, age={}",
            self.mountpoint,
            self.device,
            self.fstype,
            self.age
        );
        for (name, value) in EVENT_COUNTERS.iter().zip(self.events) {
            log::debug!("  event ({name:>20}) : {value}");
        }
        for (name, value) in BYTE_COUNTERS.iter().zip(self.bytes) {
            log::debug!("  bytes ({name:>20}) : {value}");
        }
        let kind = self.transport.kind();
        for (name, value) in kind.counter_names().iter().zip(self.transport.values()) {
            log::debug!("  xprt {kind} ({name:>20}) : {value}");
        }
        for op in &self.per_op {
            log::debug!("  per op ({:>20}) : {:?}", op.name, op.counters);
        }
    }
}
