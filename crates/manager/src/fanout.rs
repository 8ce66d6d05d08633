use futures::future::join_all;
use std::future::Future;

/// The result of running one operation against one account.
///
/// A fan-out batch always reports per account through this type — never a
/// bare error and never a bare value — so one account's failure cannot
/// mask what happened on the others.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub account_name: String,
    pub result: Result<T, String>,
}

impl<T> Outcome<T> {
    pub fn success(account_name: impl Into<String>, value: T) -> Self {
        Self {
            account_name: account_name.into(),
            result: Ok(value),
        }
    }

    pub fn failure(account_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            account_name: account_name.into(),
            result: Err(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// The payload, when the operation succeeded.
    pub fn value(&self) -> Option<&T> {
        self.result.as_ref().ok()
    }

    pub fn into_value(self) -> Option<T> {
        self.result.ok()
    }

    /// The error message, when the operation failed.
    pub fn error(&self) -> Option<&str> {
        self.result.as_ref().err().map(|s| s.as_str())
    }
}

/// Drives every task to completion concurrently and returns one tagged
/// outcome per task, in the order the tasks were given.
///
/// This is a barrier, not a race: the returned future resolves only once
/// the slowest task has settled, and a task that fails settles its own
/// outcome without cancelling or delaying any other task.
pub async fn settle_all<T, Fut>(tasks: Vec<(String, Fut)>) -> Vec<Outcome<T>>
where
    Fut: Future<Output = Result<T, String>>,
{
    let (names, futures): (Vec<_>, Vec<_>) = tasks.into_iter().unzip();
    let results = join_all(futures).await;

    names
        .into_iter()
        .zip(results)
        .map(|(account_name, result)| Outcome {
            account_name,
            result,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration, Instant};

    async fn settle_after(delay: Duration, result: Result<u32, String>) -> Result<u32, String> {
        sleep(delay).await;
        result
    }

    #[tokio::test]
    async fn returns_one_outcome_per_task_in_input_order() {
        let tasks = vec![
            ("alpha".to_string(), settle_after(Duration::ZERO, Ok(1))),
            (
                "beta".to_string(),
                settle_after(Duration::ZERO, Err("auth failed".to_string())),
            ),
            ("gamma".to_string(), settle_after(Duration::ZERO, Ok(3))),
        ];

        let outcomes = settle_all(tasks).await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes.iter().map(|o| o.account_name.as_str()).collect::<Vec<_>>(),
            vec!["alpha", "beta", "gamma"]
        );
        assert_eq!(outcomes[0].value(), Some(&1));
        assert_eq!(outcomes[1].error(), Some("auth failed"));
        assert_eq!(outcomes[2].value(), Some(&3));
    }

    #[tokio::test(start_paused = true)]
    async fn acts_as_a_barrier_bounded_by_the_slowest_task() {
        let start = Instant::now();
        let tasks = vec![
            (
                "fast".to_string(),
                settle_after(Duration::from_millis(10), Ok(1)),
            ),
            (
                "failing".to_string(),
                settle_after(Duration::from_millis(20), Err("boom".to_string())),
            ),
            (
                "slow".to_string(),
                settle_after(Duration::from_millis(50), Ok(3)),
            ),
        ];

        let outcomes = settle_all(tasks).await;
        let elapsed = start.elapsed();

        // All three settle; total wall time is the slowest task, not a sum.
        assert_eq!(outcomes.len(), 3);
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(80));
    }

    #[tokio::test]
    async fn a_failure_never_reduces_the_outcome_count() {
        let tasks: Vec<(String, _)> = (0..8)
            .map(|i| {
                let result = if i % 2 == 0 {
                    Ok(i)
                } else {
                    Err(format!("account {i} offline"))
                };
                (format!("acct-{i}"), settle_after(Duration::ZERO, result))
            })
            .collect();

        let outcomes = settle_all(tasks).await;

        assert_eq!(outcomes.len(), 8);
        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 4);
        assert_eq!(outcomes.iter().filter(|o| !o.is_success()).count(), 4);
    }

    #[test]
    fn outcome_accessors_match_the_tagged_state() {
        let ok: Outcome<u32> = Outcome::success("alpha", 9);
        let err: Outcome<u32> = Outcome::failure("beta", "offline");

        assert!(ok.is_success());
        assert_eq!(ok.value(), Some(&9));
        assert_eq!(ok.error(), None);

        assert!(!err.is_success());
        assert_eq!(err.value(), None);
        assert_eq!(err.error(), Some("offline"));
        assert_eq!(err.into_value(), None);
    }
}
