//! C6 Retry/Batch Controller: turns a "produce N items" request into a sequence of
//! bounded LLM calls with per-batch validation and retry.
//!
//! The controller is deliberately generic over the item type: chapter-generate uses
//! it with `BATCH_SIZE=1`, the wizard's character/outline stages with 3 and 5.

use thiserror::Error;

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("llm returned invalid response: {0}")]
    InvalidResponse(String),
    #[error("batch failed validation after {0} attempts: {1}")]
    ExhaustedRetries(u32, String),
}

/// Splits `total` into consecutive batches of at most `batch_size` (§4.6 step 1).
pub fn partition(total: u32, batch_size: u32) -> Vec<u32> {
    if total == 0 || batch_size == 0 {
        return Vec::new();
    }
    let mut batches = Vec::new();
    let mut remaining = total;
    while remaining > 0 {
        let n = remaining.min(batch_size);
        batches.push(n);
        remaining -= n;
    }
    batches
}

/// Strips Markdown JSON fences and any stray prose before/after the envelope,
/// then returns the substring most likely to parse as the JSON payload (§4.6,
/// reused by the analysis ingestor's lenient parse in §4.8.4 step 2).
pub fn strip_json_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_fence = if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        rest.strip_suffix("```").unwrap_or(rest).trim()
    } else {
        trimmed
    };

    match (without_fence.find('{'), without_fence.rfind('}')) {
        (Some(start), Some(end)) if end >= start => without_fence[start..=end].to_string(),
        _ => without_fence.to_string(),
    }
}

/// Applies the count tie-break rule (§4.6): truncate when the model returns more
/// than requested, leave short lists for the caller to retry.
pub fn truncate_to_requested<T>(mut items: Vec<T>, requested: u32) -> Vec<T> {
    items.truncate(requested as usize);
    items
}

/// Runs one batch through up to `max_retries` attempts. `call` performs one LLM
/// round and returns parsed, tie-break-truncated items; `validate` checks the
/// orchestrator-specific acceptance policy (count, required fields, ...). On
/// failure the escalation hint ("this is retry N; emit strictly M items") is
/// threaded back into `call` via the `attempt` argument so callers can fold it
/// into the next prompt.
pub async fn run_batch_with_retry<T, F, Fut, V>(
    requested: u32,
    max_retries: u32,
    mut call: F,
    validate: V,
) -> Result<Vec<T>, BatchError>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<T>, BatchError>>,
    V: Fn(&[T]) -> Result<(), String>,
{
    let mut last_err = String::new();
    for attempt in 0..=max_retries {
        match call(attempt).await {
            Ok(items) => {
                let items = truncate_to_requested(items, requested);
                match validate(&items) {
                    Ok(()) if items.len() as u32 == requested => return Ok(items),
                    Ok(()) => last_err = format!("expected {requested} items, got {}", items.len()),
                    Err(e) => last_err = e,
                }
            }
            Err(BatchError::InvalidResponse(msg)) => last_err = msg,
            Err(other) => return Err(other),
        }
    }
    Err(BatchError::ExhaustedRetries(max_retries + 1, last_err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_splits_into_bounded_batches() {
        assert_eq!(partition(12, 5), vec![5, 5, 2]);
        assert_eq!(partition(3, 5), vec![3]);
        assert_eq!(partition(0, 5), Vec::<u32>::new());
    }

    #[test]
    fn strip_json_fences_removes_markdown_fence_and_prose() {
        let raw = "here you go:\n```json\n{\"a\": 1}\n```\nhope that helps";
        assert_eq!(strip_json_fences(raw), r#"{"a": 1}"#);
    }

    #[test]
    fn strip_json_fences_handles_bare_json() {
        assert_eq!(strip_json_fences(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn truncate_to_requested_drops_extras() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(truncate_to_requested(items, 3), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn run_batch_with_retry_succeeds_on_first_attempt() {
        let result = run_batch_with_retry(
            3,
            3,
            |_attempt| async { Ok::<_, BatchError>(vec![1, 2, 3]) },
            |items| if items.len() == 3 { Ok(()) } else { Err("bad".into()) },
        )
        .await
        .unwrap();
        assert_eq!(result, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn run_batch_with_retry_escalates_and_then_succeeds() {
        let result = run_batch_with_retry(
            3,
            3,
            |attempt| async move {
                if attempt < 2 {
                    Ok::<_, BatchError>(vec![1])
                } else {
                    Ok(vec![1, 2, 3])
                }
            },
            |_items| Ok(()),
        )
        .await
        .unwrap();
        assert_eq!(result, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn run_batch_with_retry_exhausts() {
        let result = run_batch_with_retry(
            3,
            2,
            |_attempt| async { Ok::<_, BatchError>(vec![1]) },
            |_items| Ok(()),
        )
        .await;
        assert!(matches!(result, Err(BatchError::ExhaustedRetries(3, _))));
    }
}
