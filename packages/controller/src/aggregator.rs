//! Per-phase tally of the workload groups bound to a queue.

use queue_core::{GroupPhase, QueueCounts, WorkloadGroupKey};

use crate::error::ControllerResult;
use crate::store::GroupIndex;

/// Groups bound to a queue at the time of one observation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    /// Every bound group, whatever its phase.
    pub keys: Vec<WorkloadGroupKey>,
    /// Tally of the counted phases.
    pub counts: QueueCounts,
}

/// Count phases into the four counted buckets. `Completed` is ignored.
pub fn count_phases(phases: impl IntoIterator<Item = GroupPhase>) -> QueueCounts {
    phases
        .into_iter()
        .fold(QueueCounts::default(), |mut counts, phase| {
            match phase {
                GroupPhase::Pending => counts.pending = counts.pending.saturating_add(1),
                GroupPhase::Running => counts.running = counts.running.saturating_add(1),
                GroupPhase::Unknown => counts.unknown = counts.unknown.saturating_add(1),
                GroupPhase::Inqueue => counts.inqueue = counts.inqueue.saturating_add(1),
                GroupPhase::Completed => {}
            }
            counts
        })
}

/// Read every group bound to `queue` and tally their phases.
///
/// Keys that do not parse are skipped. Any failure to list or resolve a
/// group aborts the whole aggregation, so partial counts never escape.
pub async fn aggregate<I: GroupIndex>(index: &I, queue: &str) -> ControllerResult<Aggregation> {
    let raw_keys = index.list_bound_group_keys(queue).await?;

    let mut keys = Vec::with_capacity(raw_keys.len());
    let mut phases = Vec::with_capacity(raw_keys.len());

    for raw in raw_keys {
        let key = match WorkloadGroupKey::parse(&raw) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!("Skipping group of queue {}: {}", queue, e);
                continue;
            }
        };

        let group = index.resolve_group(&key).await?;
        phases.push(group.phase);
        keys.push(key);
    }

    Ok(Aggregation {
        keys,
        counts: count_phases(phases),
    })
}
