//! Request-scoped context passed explicitly to every orchestrator operation.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::AuthError;

/// Metadata and lifetime bounds of one inbound request.
///
/// Storage and provider calls made on behalf of the request are raced against
/// [`RequestContext::cancel_token`] and the optional deadline through
/// [`RequestContext::run`].
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: Option<String>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drive `fut` to completion unless the request is cancelled or its
    /// deadline passes first. In either case `fut` is dropped, which rolls back
    /// any transaction it holds.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, AuthError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }

        let deadline = async {
            match self.deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(AuthError::Cancelled),
            () = deadline => Err(AuthError::DeadlineExceeded),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let ctx = RequestContext::new().with_timeout(Duration::from_secs(5));
        let value = ctx.run(async { Ok::<_, AuthError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn cancelled_context_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = RequestContext::new().with_cancel_token(cancel);

        let result = ctx.run(async { Ok::<_, AuthError>(()) }).await;
        assert_matches!(result, Err(AuthError::Cancelled));
    }

    #[tokio::test]
    async fn cancellation_interrupts_pending_work() {
        let cancel = CancellationToken::new();
        let ctx = RequestContext::new().with_cancel_token(cancel.clone());

        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let result = ctx
            .run(async {
                std::future::pending::<()>().await;
                Ok::<_, AuthError>(())
            })
            .await;
        trigger.await.unwrap();
        assert_matches!(result, Err(AuthError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_is_reported() {
        let ctx = RequestContext::new().with_timeout(Duration::from_millis(50));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, AuthError>(())
            })
            .await;
        assert_matches!(result, Err(AuthError::DeadlineExceeded));
    }
}
