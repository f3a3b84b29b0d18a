use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, MountTable};
use crate::error::ResultOkLogExt;
use crate::fsutil::ReadLimits;
use crate::metrics::MetricGroup;
use crate::mountstats::{self, EmitContext};
use crate::rpc::{self, Side};

/// Runs the collection sources once per interval.
///
/// Everything here is fixed at start-up; a pass only borrows it.
#[derive(Debug)]
pub struct NfsCollector {
    host: Arc<str>,
    table: MountTable,
    limits: ReadLimits,
    mountstats_path: PathBuf,
    mountstats_available: bool,
    rpc_client_path: PathBuf,
    rpc_server_path: PathBuf,
}

impl NfsCollector {
    /// Builds a collector from the loaded configuration.
    ///
    /// If mountstats collection is enabled, the report is probed once here;
    /// when it cannot be opened every later pass skips it.
    pub fn new(config: &Config, host: impl Into<Arc<str>>) -> Self {
        let mountstats_available = config.collect_mountstats
            && mountstats::availability::probe(&config.mountstats_path, &config.osrelease_path);

        Self {
            host: host.into(),
            table: config.mount_table(),
            limits: config.read_limits(),
            mountstats_path: config.mountstats_path.clone(),
            mountstats_available,
            rpc_client_path: config.rpc_client_path.clone(),
            rpc_server_path: config.rpc_server_path.clone(),
        }
    }

    pub fn mountstats_available(&self) -> bool {
        self.mountstats_available
    }

    /// Collects one pass from every source into `out`.
    ///
    /// # Arguments
    ///
    /// * `timestamp` - UNIX time stamped on every group.
    /// * `out` - Receives the groups. Sources that fail add nothing.
    pub fn collect(&self, timestamp: u64, out: &mut Vec<MetricGroup>) {
        rpc::collect(&self.rpc_client_path, Side::Client, &self.host, timestamp, out);
        rpc::collect(&self.rpc_server_path, Side::Server, &self.host, timestamp, out);

        if !self.mountstats_available {
            return;
        }
        let ctx = EmitContext {
            host: Arc::clone(&self.host),
            timestamp,
        };
        mountstats::collect_pass(&self.mountstats_path, self.limits, &self.table, &ctx, out)
            .ok_log("mountstats pass aborted, no samples this interval");
    }
}
