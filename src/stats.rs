//! Aggregate transfer metrics.
//!
//! Per-port packet counts live on the ports themselves; these helpers
//! additionally feed process-wide counters to whatever `metrics` recorder
//! the embedding application installs. Without a recorder they are no-ops.

use metrics::counter;

pub(crate) fn record_push(bytes: usize) {
    counter!("crossbar_packets_pushed").increment(1);
    counter!("crossbar_bytes_pushed").increment(bytes as u64);
}

pub(crate) fn record_pull(bytes: usize) {
    counter!("crossbar_packets_pulled").increment(1);
    counter!("crossbar_bytes_pulled").increment(bytes as u64);
}
