//! Property-based test generators using proptest.

use marketsync_api::MarketplaceOrder;
use marketsync_core::{ConnectionId, EntityId, WorkQueue};
use proptest::prelude::*;

/// Strategy for entity ids drawn from a small universe, so generated
/// operation sequences revisit the same entities.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    (1u64..=20).prop_map(EntityId::new)
}

/// Strategy for connection ids.
pub fn connection_id_strategy() -> impl Strategy<Value = ConnectionId> {
    prop::string::string_regex("[a-z]{3,8}")
        .expect("valid regex")
        .prop_map(ConnectionId::new)
}

/// One step a queue caller can take.
#[derive(Debug, Clone)]
pub enum QueueOp {
    /// Record a change notification.
    Enqueue(EntityId),
    /// Claim a batch of up to the given size; the batch is held.
    Claim(usize),
    /// Acknowledge the most recently held batch as done.
    AckDone,
    /// Fail the most recently held batch, retryable or not.
    AckFailed(bool),
    /// Run the retention sweep.
    Sweep,
}

/// Strategy for a single queue operation.
pub fn queue_op_strategy() -> impl Strategy<Value = QueueOp> {
    prop_oneof![
        4 => entity_id_strategy().prop_map(QueueOp::Enqueue),
        2 => (1usize..=5).prop_map(QueueOp::Claim),
        2 => Just(QueueOp::AckDone),
        2 => any::<bool>().prop_map(QueueOp::AckFailed),
        1 => Just(QueueOp::Sweep),
    ]
}

/// Strategy for a sequence of queue operations.
pub fn queue_ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<QueueOp>> {
    prop::collection::vec(queue_op_strategy(), 0..max_len)
}

/// Applies a sequence of operations to a queue for one connection.
///
/// Claimed batches are held on a stack; `AckDone`/`AckFailed` acknowledge
/// the most recent one. Unacknowledged batches are simply left in flight,
/// like a drain that crashed.
pub fn apply_queue_ops(queue: &WorkQueue, connection: &ConnectionId, ops: &[QueueOp]) {
    let mut held = Vec::new();
    for op in ops {
        match op {
            QueueOp::Enqueue(entity) => {
                queue
                    .enqueue(connection, *entity)
                    .expect("enqueue never fails in memory or on a temp file");
            }
            QueueOp::Claim(max) => {
                if let Some(batch) = queue
                    .claim_batch(connection, *max)
                    .expect("claim never fails in memory or on a temp file")
                {
                    held.push(batch);
                }
            }
            QueueOp::AckDone => {
                if let Some(batch) = held.pop() {
                    queue.mark_done(&batch).expect("mark_done never fails here");
                }
            }
            QueueOp::AckFailed(retryable) => {
                if let Some(batch) = held.pop() {
                    queue
                        .mark_failed(&batch, *retryable)
                        .expect("mark_failed never fails here");
                }
            }
            QueueOp::Sweep => {
                queue.sweep().expect("sweep never fails here");
            }
        }
    }
}

/// Strategy for an order feed with strictly ascending positions and
/// unique external ids.
pub fn order_feed_strategy(max_len: usize) -> impl Strategy<Value = Vec<MarketplaceOrder>> {
    prop::collection::btree_set(1u64..=1_000, 0..max_len).prop_map(|positions| {
        positions
            .into_iter()
            .map(|position| MarketplaceOrder {
                position,
                external_id: format!("ORD-{position}"),
                buyer_name: "Generated Buyer".into(),
                currency: "EUR".into(),
                total_cents: position * 100,
                lines: Vec::new(),
            })
            .collect()
    })
}
