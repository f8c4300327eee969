//! Order-preserving async map with a fixed number of in-flight operations.

use futures::future::join_all;
use std::future::Future;
use tokio::sync::Mutex;

/// Apply `op` to every item with at most `limit` operations in flight.
///
/// Runs `min(limit, items.len())` workers that pull the next `(index, item)`
/// from a shared cursor, so `results[i]` always belongs to `items[i]` no matter
/// which finishes first. `op` owns its error handling: whatever it returns for
/// a failing item lands in that slot and the other workers carry on.
pub async fn map_bounded<T, R, F, Fut>(items: Vec<T>, limit: usize, op: F) -> Vec<R>
where
    F: Fn(usize, T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    if total == 0 {
        return Vec::new();
    }

    let cursor = Mutex::new(items.into_iter().enumerate());
    let workers = limit.clamp(1, total);
    let (cursor, op) = (&cursor, &op);

    let worker = move || async move {
        let mut done = Vec::new();
        loop {
            // Lock only long enough to claim the next item.
            let next = cursor.lock().await.next();
            let Some((index, item)) = next else { break };
            done.push((index, op(index, item).await));
        }
        done
    };

    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
    for (index, result) in join_all((0..workers).map(|_| worker())).await.into_iter().flatten() {
        slots[index] = Some(result);
    }

    // Every index is claimed exactly once, so no slot is left empty.
    slots.into_iter().flatten().collect()
}
