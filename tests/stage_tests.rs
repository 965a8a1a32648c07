use chunkflow::*;
use futures::stream;
use futures_util::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use tokio_test::assert_ready_eq;

// Input whose pulls are counted, to check how far upstream a stage reads
fn counted_source(items: Vec<i32>, pulls: Arc<AtomicUsize>) -> ChunkStream<i32> {
    from_iter(items.into_iter().inspect(move |_| {
        pulls.fetch_add(1, Ordering::SeqCst);
    }))
}

#[tokio::test]
async fn test_compact_removes_missing_values() {
    let input = vec![Some(1), None, Some(2), None, Some(3)];
    let result = from_iter(input).through(&compact()).to_array().await.unwrap();
    assert_eq!(result, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_compact_all_missing() {
    let input: Vec<Option<&str>> = vec![None, None];
    let result = from_iter(input).through(&compact()).to_array().await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_map_changes_type() {
    let result = from_iter(vec![1, 2, 3])
        .through(&map(|x: i32| format!("#{}", x)))
        .to_array()
        .await
        .unwrap();
    assert_eq!(result, vec!["#1", "#2", "#3"]);
}

#[tokio::test]
async fn test_eval_map_keeps_one_callback_in_flight() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let stage = {
        let in_flight = in_flight.clone();
        let max_seen = max_seen.clone();
        eval_map(move |x: u64| {
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                // Later chunks finish faster; order must still hold
                sleep(Duration::from_millis(10 - x)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(x * 2)
            }
        })
    };

    let result = from_iter(0..10u64).through(&stage).to_array().await.unwrap();
    assert_eq!(result, (0..10u64).map(|x| x * 2).collect::<Vec<_>>());
    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_filter_and_eval_filter_agree() {
    let input: Vec<i32> = (1..=20).collect();

    let sync = from_iter(input.clone())
        .through(&filter(|x: &i32| x % 3 == 0))
        .to_array()
        .await
        .unwrap();
    let async_version = from_iter(input)
        .through(&eval_filter(|x: &i32| {
            let keep = x % 3 == 0;
            async move { Ok(keep) }
        }))
        .to_array()
        .await
        .unwrap();

    assert_eq!(sync, vec![3, 6, 9, 12, 15, 18]);
    assert_eq!(sync, async_version);
}

#[tokio::test]
async fn test_tap_sees_every_chunk_and_forwards_unchanged() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = {
        let seen = seen.clone();
        tap(move |x: &i32| seen.lock().unwrap().push(*x))
    };

    let result = from_iter(vec![5, 6, 7]).through(&recorder).to_array().await.unwrap();
    assert_eq!(result, vec![5, 6, 7]);
    assert_eq!(*seen.lock().unwrap(), vec![5, 6, 7]);
}

#[tokio::test]
async fn test_eval_tap_awaits_before_forwarding() {
    let completed = Arc::new(AtomicUsize::new(0));
    let stage = {
        let completed = completed.clone();
        eval_tap(move |_: &i32| {
            let completed = completed.clone();
            async move {
                sleep(Duration::from_millis(2)).await;
                completed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    };

    let check = {
        let completed = completed.clone();
        map(move |x: i32| (x, completed.load(Ordering::SeqCst)))
    };

    let result = from_iter(vec![1, 2, 3])
        .through(&stage)
        .through(&check)
        .to_array()
        .await
        .unwrap();
    // Each chunk arrives after its own side effect completed
    assert_eq!(result, vec![(1, 1), (2, 2), (3, 3)]);
}

#[tokio::test]
async fn test_batch_with_remainder() {
    let result = from_iter(vec![1, 2, 3, 4, 5])
        .through(&batch(2).unwrap())
        .to_array()
        .await
        .unwrap();
    assert_eq!(result, vec![vec![1, 2], vec![3, 4], vec![5]]);
}

#[tokio::test]
async fn test_batch_larger_than_input() {
    let result = from_iter(vec![1, 2, 3])
        .through(&batch(5).unwrap())
        .to_array()
        .await
        .unwrap();
    assert_eq!(result, vec![vec![1, 2, 3]]);
}

#[tokio::test]
async fn test_batch_empty_and_exact() {
    let empty_result = from_iter(Vec::<i32>::new())
        .through(&batch(3).unwrap())
        .to_array()
        .await
        .unwrap();
    assert!(empty_result.is_empty());

    let exact = from_iter(1..=6)
        .through(&batch(3).unwrap())
        .to_array()
        .await
        .unwrap();
    assert_eq!(exact, vec![vec![1, 2, 3], vec![4, 5, 6]]);
}

#[test]
fn test_batch_rejects_zero() {
    let err = batch::<i32>(0).unwrap_err();
    assert!(matches!(err, StreamError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_flatten_preserves_order_and_skips_empty() {
    let input = vec![vec![1, 2], vec![], vec![3], vec![4, 5, 6]];
    let result = from_iter(input).through(&flatten()).to_array().await.unwrap();
    assert_eq!(result, vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn test_take_limits_output() {
    let result = from_iter(1..=10).through(&take(3)).to_array().await.unwrap();
    assert_eq!(result, vec![1, 2, 3]);

    let short = from_iter(vec![1, 2, 3]).through(&take(5)).to_array().await.unwrap();
    assert_eq!(short, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_take_zero_never_reads_input() {
    let pulls = Arc::new(AtomicUsize::new(0));
    let result = counted_source(vec![1, 2, 3], pulls.clone())
        .through(&take(0))
        .to_array()
        .await
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(pulls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_take_stops_reading_at_limit() {
    let pulls = Arc::new(AtomicUsize::new(0));
    let result = counted_source((1..=100).collect(), pulls.clone())
        .through(&take(4))
        .to_array()
        .await
        .unwrap();
    assert_eq!(result, vec![1, 2, 3, 4]);
    assert_eq!(pulls.load(Ordering::SeqCst), 4);
}

#[test]
fn test_take_releases_upstream_with_last_chunk() {
    let guard = Arc::new(());
    let source = from_stream(stream::iter(vec![1, 2, 3]).chain(stream::pending()).map({
        let guard = guard.clone();
        move |x| {
            let _held = &guard;
            x
        }
    }));

    let mut taken = tokio_test::task::spawn(source.through(&take(2)));
    assert_ready_eq!(taken.poll_next(), Some(Ok(1)));
    assert_eq!(Arc::strong_count(&guard), 2);

    // Upstream is gone by the time the limit chunk is handed out
    assert_ready_eq!(taken.poll_next(), Some(Ok(2)));
    assert_eq!(Arc::strong_count(&guard), 1);

    assert_ready_eq!(taken.poll_next(), None);
}

#[tokio::test]
async fn test_skip() {
    let result = from_iter(1..=5).through(&skip(2)).to_array().await.unwrap();
    assert_eq!(result, vec![3, 4, 5]);

    let all = from_iter(1..=3).through(&skip(0)).to_array().await.unwrap();
    assert_eq!(all, vec![1, 2, 3]);

    let none = from_iter(1..=3).through(&skip(10)).to_array().await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_flat_map() {
    let result = from_iter(vec![1, 2, 3])
        .through(&flat_map(|x: i32| vec![x; x as usize]))
        .to_array()
        .await
        .unwrap();
    assert_eq!(result, vec![1, 2, 2, 3, 3, 3]);
}

#[tokio::test]
async fn test_eval_flat_map() {
    let result = from_iter(vec!["a b", "", "c"])
        .through(&eval_flat_map(|line: &'static str| async move {
            Ok(line.split_whitespace().map(String::from).collect::<Vec<_>>())
        }))
        .to_array()
        .await
        .unwrap();
    assert_eq!(result, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_scan_emits_every_accumulator() {
    let result = from_iter(vec![1, 2, 3, 4])
        .through(&scan(|acc: i32, x: i32| acc + x, 0))
        .to_array()
        .await
        .unwrap();
    assert_eq!(result, vec![1, 3, 6, 10]);
}

#[tokio::test]
async fn test_eval_scan_with_different_accumulator_type() {
    let result = from_iter(vec!["a", "b", "c"])
        .through(&eval_scan(
            |acc: String, x: &'static str| async move { Ok(acc + x) },
            String::new(),
        ))
        .to_array()
        .await
        .unwrap();
    assert_eq!(result, vec!["a", "ab", "abc"]);
}

#[tokio::test]
async fn test_reduce_emits_once() {
    let result = from_iter(vec![1, 2, 3, 4])
        .through(&reduce(|acc: i32, x: i32| acc + x, 0))
        .to_array()
        .await
        .unwrap();
    assert_eq!(result, vec![10]);
}

#[tokio::test]
async fn test_reduce_on_empty_input_emits_nothing() {
    let result = from_iter(Vec::<i32>::new())
        .through(&reduce(|acc: i32, x: i32| acc + x, 42))
        .to_array()
        .await
        .unwrap();
    assert!(result.is_empty());

    let async_result = from_iter(Vec::<i32>::new())
        .through(&eval_reduce(|acc: i32, x: i32| async move { Ok(acc + x) }, 42))
        .to_array()
        .await
        .unwrap();
    assert!(async_result.is_empty());
}

#[tokio::test]
async fn test_eval_reduce() {
    let result = from_iter(1..=5)
        .through(&eval_reduce(|acc: i64, x: i32| async move { Ok(acc * x as i64) }, 1))
        .to_array()
        .await
        .unwrap();
    assert_eq!(result, vec![120]);
}

#[tokio::test]
async fn test_append() {
    let result = from_iter(vec![1, 2, 3]).through(&append(4)).to_array().await.unwrap();
    assert_eq!(result, vec![1, 2, 3, 4]);

    let only = from_iter(Vec::<i32>::new()).through(&append(4)).to_array().await.unwrap();
    assert_eq!(only, vec![4]);
}
