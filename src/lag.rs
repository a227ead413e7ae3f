//! Unprocessed-event estimation for event-stream partitions.
//!
//! A partition's live sequence number and the consumer's persisted checkpoint
//! are updated independently, so their difference is only an estimate. The
//! functions here keep that estimate bounded: sequence numbers are treated as a
//! circular counter over `[0, i64::MAX]`, and distances implausibly close to the
//! counter's maximum are treated as a stale read rather than real backlog.
//!
//! Everything in this module is pure; providers fetch the inputs and call in.

use serde::{Deserialize, Serialize};

/// Offset the stream service reports for a partition that never received an event.
pub const EMPTY_PARTITION_OFFSET: &str = "-1";

/// Snapshot of a partition's runtime state, taken once per query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRuntimeState {
  /// Partition identifier.
  pub partition_id: String,
  /// Sequence number of the oldest event still retained.
  pub beginning_sequence_number: i64,
  /// Sequence number of the newest event.
  pub last_sequence_number: i64,
  /// Offset of the newest event, [`EMPTY_PARTITION_OFFSET`] when empty.
  pub last_enqueued_offset: String,
}

impl PartitionRuntimeState {
  /// Creates a snapshot of a partition holding events.
  pub fn new(
    partition_id: impl Into<String>,
    beginning_sequence_number: i64,
    last_sequence_number: i64,
    last_enqueued_offset: impl Into<String>,
  ) -> Self {
    Self {
      partition_id: partition_id.into(),
      beginning_sequence_number,
      last_sequence_number,
      last_enqueued_offset: last_enqueued_offset.into(),
    }
  }

  /// Creates a snapshot of a partition that never received an event.
  pub fn empty(partition_id: impl Into<String>) -> Self {
    Self::new(partition_id, 0, 0, EMPTY_PARTITION_OFFSET)
  }

  /// Returns true if no event was ever enqueued on the partition.
  pub fn is_empty(&self) -> bool {
    self.last_enqueued_offset == EMPTY_PARTITION_OFFSET
  }
}

/// Last position a consumer durably committed for a partition.
///
/// An empty `offset` means the partition was never checkpointed. That is not
/// the same as sequence number 0, which is a valid committed position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
  /// Committed offset, empty when nothing was committed yet.
  pub offset: String,
  /// Committed sequence number.
  pub sequence_number: i64,
}

impl Checkpoint {
  /// Creates a checkpoint at the given position.
  pub fn new(offset: impl Into<String>, sequence_number: i64) -> Self {
    Self {
      offset: offset.into(),
      sequence_number,
    }
  }

  /// The "never checkpointed" checkpoint.
  pub fn none() -> Self {
    Self::default()
  }

  /// Returns true if a position has been committed.
  pub fn is_committed(&self) -> bool {
    !self.offset.is_empty()
  }
}

/// Number of events enqueued on a partition after its checkpoint.
///
/// Returns 0 for empty partitions and for readings whose distance exceeds
/// `i64::MAX - stale_threshold`; such a distance only arises when the live
/// read is older than the checkpoint.
pub fn unprocessed_count(
  state: &PartitionRuntimeState,
  checkpoint: &Checkpoint,
  stale_threshold: i64,
) -> i64 {
  if state.is_empty() {
    return 0;
  }

  // Sequence numbers start at 0, so the first event alone is a count of 1.
  if !checkpoint.is_committed() {
    return state.last_sequence_number.saturating_add(1).max(0);
  }

  let count = if state.last_sequence_number >= checkpoint.sequence_number {
    state
      .last_sequence_number
      .saturating_sub(checkpoint.sequence_number)
  } else {
    // Either the counter wrapped, or the runtime read predates the checkpoint.
    // e.g. (i64::MAX - 15) checkpointed, 10 live => 15 + 10 = 25.
    i64::MAX
      .saturating_sub(checkpoint.sequence_number)
      .saturating_add(state.last_sequence_number)
  };

  if count > i64::MAX.saturating_sub(stale_threshold) {
    return 0;
  }

  count.max(0)
}

/// Approximate backlog of a partition whose checkpoint storage is missing.
///
/// `(0, 0)` is one event right after the partition was created; any other
/// `beginning == last` pair means nothing new arrived.
pub fn unprocessed_count_without_checkpoint(state: &PartitionRuntimeState) -> i64 {
  let begin = state.beginning_sequence_number;
  let last = state.last_sequence_number;
  if (begin == 0 && last == 0) || begin != last {
    return last.saturating_sub(begin).saturating_add(1).max(0);
  }
  0
}

/// Sums per-partition counts, clamping to `i64::MAX` on overflow.
pub fn total_unprocessed<I>(counts: I) -> i64
where
  I: IntoIterator<Item = i64>,
{
  counts
    .into_iter()
    .fold(0i64, |total, count| total.saturating_add(count.max(0)))
}

/// Caps a backlog at `partition_count * threshold`.
///
/// Replicas beyond the partition count receive no work, so the metric stops
/// growing once every partition has a full replica's worth of backlog.
/// A non-positive `threshold` disables the cap.
pub fn lag_related_to_partition_count(
  unprocessed_events: i64,
  partition_count: i64,
  threshold: i64,
) -> i64 {
  if threshold > 0 && unprocessed_events / threshold > partition_count {
    return partition_count.saturating_mul(threshold);
  }
  unprocessed_events
}
