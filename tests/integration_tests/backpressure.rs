// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{sync::Arc, time::Duration};

use connsession::{queue::WriteQueue, timing_wheel::CoarseTimingWheel, SessionError};

/// A write queue with no consumer draining it reports `Blocked` once full,
/// rather than hanging forever (spec.md §4.C, property "offer never
/// blocks past its timeout").
#[tokio::test]
async fn offer_reports_blocked_once_the_queue_is_full() {
    let wheel: Arc<dyn connsession::timing_wheel::TimingWheel> = Arc::new(CoarseTimingWheel::new(
        Duration::from_millis(5),
        Duration::from_secs(5),
    ));
    let (queue, _rx) = WriteQueue::new(1, wheel);

    queue
        .offer(vec![0u8; 4], Some(Duration::from_millis(100)))
        .await
        .expect("first offer has room");

    let result = queue
        .offer(vec![1u8; 4], Some(Duration::from_millis(50)))
        .await;
    assert!(matches!(result, Err(SessionError::Blocked)));
}
