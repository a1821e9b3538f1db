use navtelemetry::kernel::location::{
    BufferCommand, LocationRingBuffer, LocationSample, LOCATION_BUFFER_MAX_SIZE,
};
use tokio::sync::oneshot;

fn fix(ts: i64) -> LocationSample {
    LocationSample::new(37.0 + ts as f64 * 1e-4, -122.0, ts)
}

#[test]
fn test_overflow_keeps_most_recent_in_order() {
    let mut buffer = LocationRingBuffer::default();
    assert_eq!(buffer.capacity(), LOCATION_BUFFER_MAX_SIZE);

    // 1. Push 45 fixes into a 40 slot buffer
    for ts in 1..=45 {
        let evicted = buffer.push(fix(ts));
        if ts <= 40 {
            assert!(evicted.is_none(), "No eviction before capacity is reached");
        } else {
            assert_eq!(evicted, Some(fix(ts - 40)), "Oldest fix must be evicted first");
        }
    }

    // 2. Only the last 40 survive, oldest first
    let stamps: Vec<i64> = buffer.to_vec().iter().map(|s| s.timestamp_millis).collect();
    assert_eq!(stamps, (6..=45).collect::<Vec<_>>());
    assert_eq!(buffer.latest(), Some(fix(45)));
}

#[test]
fn test_remove_and_clear() {
    let mut buffer = LocationRingBuffer::new(4);
    for ts in 1..=3 {
        buffer.apply(BufferCommand::Add(fix(ts)));
    }

    // REMOVE drops the oldest
    assert_eq!(buffer.apply(BufferCommand::Remove), Some(fix(1)));
    assert_eq!(buffer.len(), 2);

    // CLEAR empties
    buffer.apply(BufferCommand::Clear);
    assert!(buffer.is_empty());
    assert!(buffer.latest().is_none());

    // REMOVE on empty is a no-op
    assert_eq!(buffer.apply(BufferCommand::Remove), None);
}

#[test]
fn test_zero_capacity_is_clamped() {
    let mut buffer = LocationRingBuffer::new(0);
    assert_eq!(buffer.capacity(), 1);
    buffer.push(fix(1));
    buffer.push(fix(2));
    assert_eq!(buffer.to_vec(), vec![fix(2)]);
}

#[test]
fn test_read_command_replies_with_filtered_copy() {
    let mut buffer = LocationRingBuffer::new(10);
    for ts in 1..=6 {
        buffer.push(fix(ts));
    }

    let (tx, mut rx) = oneshot::channel();
    buffer.apply(BufferCommand::Read {
        predicate: Box::new(|s| s.timestamp_millis % 2 == 0),
        reply: tx,
    });

    let even = rx.try_recv().expect("READ must reply synchronously");
    assert_eq!(even, vec![fix(2), fix(4), fix(6)]);
    assert_eq!(buffer.len(), 6, "READ must not consume");
}

#[test]
fn test_partition_covers_contents_exactly() {
    let mut buffer = LocationRingBuffer::new(8);
    for ts in [10, 20, 30, 40, 50] {
        buffer.push(fix(ts));
    }

    for pivot in [0, 10, 25, 50, 99] {
        let parts = buffer.partition_at(pivot);
        assert!(parts.before.iter().all(|s| s.timestamp_millis < pivot));
        assert!(parts.after.iter().all(|s| s.timestamp_millis >= pivot));

        let mut joined = parts.before.clone();
        joined.extend(parts.after.iter().copied());
        assert_eq!(joined, buffer.to_vec(), "before ++ after must equal the buffer (pivot {})", pivot);
    }

    // Exact timestamp lands in `after`
    let parts = buffer.partition_at(30);
    assert_eq!(parts.before.len(), 2);
    assert_eq!(parts.after.first(), Some(&fix(30)));
}
