use futures::{StreamExt, stream};
use std::future::Future;
use tokio::time::Instant;

/// 以限定的并发度执行一组future，并等待全部完成或到达截止时间
///
/// 返回值与输入顺序一一对应；截止时间到达时仍未完成的future会被丢弃，对应位置为 `None`。
pub async fn do_parallel_with_limit<F, T>(
    futures: Vec<F>,
    max_concurrent: usize,
    deadline: Option<Instant>,
) -> Vec<Option<T>>
where
    F: Future<Output = T>,
{
    let total = futures.len();
    let mut results: Vec<Option<T>> = (0..total).map(|_| None).collect();
    if total == 0 {
        return results;
    }

    let mut pending = stream::iter(
        futures
            .into_iter()
            .enumerate()
            .map(|(index, future)| async move { (index, future.await) }),
    )
    .buffer_unordered(max_concurrent.max(1));

    let mut completed = 0usize;
    loop {
        let next = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, pending.next()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::warn!(
                        completed,
                        total,
                        "⏰ 到达截止时间，放弃剩余 {} 个未完成的任务",
                        total - completed
                    );
                    break;
                }
            },
            None => pending.next().await,
        };

        match next {
            Some((index, value)) => {
                results[index] = Some(value);
                completed += 1;
            }
            None => break,
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_keep_input_order() {
        let futures: Vec<_> = [30u64, 5, 15]
            .into_iter()
            .map(|delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay
            })
            .collect();

        let results = do_parallel_with_limit(futures, 3, None).await;
        assert_eq!(results, vec![Some(30), Some(5), Some(15)]);
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let futures: Vec<_> = (0..8)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .collect();

        let results = do_parallel_with_limit(futures, 2, None).await;
        assert_eq!(results.len(), 8);
        assert!(results.iter().all(Option::is_some));
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_deadline_leaves_unfinished_as_none() {
        let futures: Vec<_> = [5u64, 5_000]
            .into_iter()
            .map(|delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay
            })
            .collect();

        let deadline = Instant::now() + Duration::from_millis(200);
        let started = std::time::Instant::now();
        let results = do_parallel_with_limit(futures, 2, Some(deadline)).await;

        assert_eq!(results, vec![Some(5), None]);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
