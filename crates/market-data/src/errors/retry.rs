/// Classification for retry policy.
///
/// Used by [`RetryingClient`](crate::provider::RetryingClient) to decide
/// whether a failed upstream call is worth repeating.
///
/// | Class | Retried? |
/// |-------|----------|
/// | `Never` | No - terminal for this request |
/// | `WithBackoff` | Yes, bounded, with exponential backoff |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - unknown symbol, rate limit, bad payload.
    /// Rate limits in particular must not be retried: the budget is spent
    /// and the caller falls back instead.
    Never,

    /// Transient failure (timeout). Retry a bounded number of times.
    WithBackoff,
}
