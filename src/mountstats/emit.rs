//! Turns finalized [`MountRecord`]s into metric groups, honouring the
//! per-mount policy from the configuration.

use std::sync::Arc;

use crate::config::{MountPolicy, MountTable};
use crate::metrics::{MetricGroup, MetricSink, sanitize_instance};

use super::record::{BYTE_COUNTERS, EVENT_COUNTERS, MountRecord, PER_OP_COUNTERS, TransportKind};

/// Values shared by every group of one collection pass.
#[derive(Debug, Clone)]
pub struct EmitContext {
    pub host: Arc<str>,
    pub timestamp: u64,
}

fn transport_type(kind: TransportKind) -> &'static str {
    match kind {
        TransportKind::Tcp => "nfsclient_xprttcp",
        TransportKind::Udp => "nfsclient_xprtudp",
        TransportKind::Rdma => "nfsclient_xprtrdma",
    }
}

/// Emits the groups for one record under an already resolved policy.
///
/// Returns the number of groups dispatched; `0` means the record was
/// suppressed by `show` or `min_age`.
pub fn emit_record(
    record: &MountRecord,
    policy: &MountPolicy,
    ctx: &EmitContext,
    sink: &mut impl MetricSink,
) -> usize {
    if !policy.admits(record.age) {
        log::debug!(
            "suppressing `{}` (show={}, min_age={}, age={})",
            record.mountpoint,
            policy.show,
            policy.min_age,
            record.age
        );
        return 0;
    }

    let instance = sanitize_instance(&record.mountpoint);
    let group = |type_: &'static str| {
        MetricGroup::new(Arc::clone(&ctx.host), instance.clone(), type_, ctx.timestamp)
    };

    sink.dispatch(group("uptime").with_gauge("value", record.age as f64));
    sink.dispatch(group("nfsclient_events").with_derives(&EVENT_COUNTERS, &record.events));
    sink.dispatch(group("nfsclient_bytes").with_derives(&BYTE_COUNTERS, &record.bytes));

    let kind = record.transport.kind();
    sink.dispatch(
        group(transport_type(kind)).with_derives(kind.counter_names(), record.transport.values()),
    );
    let mut emitted = 4;

    if !policy.per_op.is_active() {
        return emitted;
    }
    for op in record.per_op.iter().filter(|op| policy.per_op.includes(&op.name)) {
        sink.dispatch(
            group("nfsclient_perop")
                .with_type_instance(op.name.as_str())
                .with_derives(&PER_OP_COUNTERS, &op.counters),
        );
        emitted += 1;
    }
    emitted
}

/// Resolves the policy for `record` in `table` and emits it.
pub fn filter_and_emit(
    record: &MountRecord,
    table: &MountTable,
    ctx: &EmitContext,
    sink: &mut impl MetricSink,
) -> usize {
    emit_record(record, table.resolve(&record.mountpoint), ctx, sink)
}
