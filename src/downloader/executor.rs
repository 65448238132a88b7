//! Retry controller
//!
//! Wraps a [`Transport`] and turns single attempts into a resilient call:
//! transport faults are retried with exponential backoff and jitter, while
//! rate-limit, configuration and other faults end the call immediately.

use std::future::Future;
use tokio::time::sleep;
use tracing::{error, info, info_span, warn, Instrument};

use super::config::RetryPolicy;
use super::rate_limit::RateLimiter;
use crate::fetcher::retry_formatter::{RetryContext, RetryErrorType};
use crate::fetcher::{FetcherError, FetcherResult, Transport};
use crate::output::{filter_by_range, FilterPolicy};
use crate::shutdown::SharedCancel;
use crate::{ApiPayload, DateRange, RequestDescriptor};

/// Retrying front end over a single-attempt transport
pub struct RetryController<T: Transport> {
    transport: T,
    policy: RetryPolicy,
    cancel: Option<SharedCancel>,
    rate_limiter: Option<RateLimiter>,
    filter_policy: FilterPolicy,
}

impl<T: Transport> RetryController<T> {
    /// Create a controller with the default policy (3 retries, 2s base, 60s cap)
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
            cancel: None,
            rate_limiter: None,
            filter_policy: FilterPolicy::default(),
        }
    }

    /// Replace the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override only the retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.policy = self.policy.with_max_retries(max_retries);
        self
    }

    /// Abort pending attempts and sleeps when `cancel` fires
    pub fn with_cancel(mut self, cancel: SharedCancel) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Gate every attempt through a shared request throttle
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        self.rate_limiter = Some(rate_limiter);
        self
    }

    /// Choose how [`Self::fetch_csv`] handles payloads it cannot filter
    pub fn with_filter_policy(mut self, policy: FilterPolicy) -> Self {
        self.filter_policy = policy;
        self
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Active retry policy
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch the raw payload for `request`
    ///
    /// # Errors
    /// - [`FetcherError::Transport`] once the retry budget is exhausted
    /// - [`FetcherError::RateLimited`], [`FetcherError::Configuration`] and
    ///   [`FetcherError::InvalidRequest`] without retrying
    /// - [`FetcherError::Cancelled`] when the cancel signal fires
    pub async fn fetch(&self, request: &RequestDescriptor) -> FetcherResult<ApiPayload> {
        self.fetch_with_context(request, None).await
    }

    /// Fetch `request` and, when `range` is given, filter the CSV payload to it
    ///
    /// JSON payloads are returned as received regardless of `range`.
    ///
    /// # Errors
    /// Same as [`Self::fetch`], plus [`FetcherError::PostProcess`] under
    /// [`FilterPolicy::Strict`].
    pub async fn fetch_csv(
        &self,
        request: &RequestDescriptor,
        range: Option<&DateRange>,
    ) -> FetcherResult<String> {
        let payload = self.fetch_with_context(request, range.copied()).await?;

        match (range, payload) {
            (Some(range), ApiPayload::Text(text)) => {
                filter_by_range(&text, range, self.filter_policy).map_err(FetcherError::PostProcess)
            }
            // JSON documents are not row-oriented; they pass through untouched.
            (_, payload) => Ok(payload.into_text()),
        }
    }

    async fn fetch_with_context(
        &self,
        request: &RequestDescriptor,
        range: Option<DateRange>,
    ) -> FetcherResult<ApiPayload> {
        let span = info_span!("vantage_request", function = request.function());
        self.run_attempts(request, range).instrument(span).await
    }

    async fn run_attempts(
        &self,
        request: &RequestDescriptor,
        range: Option<DateRange>,
    ) -> FetcherResult<ApiPayload> {
        let max_attempts = self.policy.max_attempts();
        let mut attempt: u32 = 0;
        let mut last_fault: Option<RetryErrorType> = None;

        loop {
            attempt += 1;

            if let Some(limiter) = &self.rate_limiter {
                self.cancellable(limiter.acquire())
                    .await?
                    .map_err(|e| FetcherError::Configuration(e.to_string()))?;
            }

            let outcome = self
                .cancellable(self.transport.execute(request))
                .await
                .and_then(|result| result);

            let fault = match outcome {
                Ok(payload) => {
                    if let Some(kind) = last_fault {
                        let ctx = RetryContext::new(
                            request,
                            attempt,
                            max_attempts,
                            kind,
                            "",
                            self.transport.endpoint(),
                        )
                        .with_date_range(range);
                        info!("{}", ctx.format_success());
                    }
                    return Ok(payload);
                }
                Err(FetcherError::Transport(fault)) => fault,
                Err(err @ FetcherError::RateLimited { .. }) => {
                    warn!(
                        attempt,
                        request = %request,
                        "Vendor rate limit signalled, not retrying: {}",
                        err
                    );
                    crate::metrics::record_terminal_failure(err.label());
                    return Err(err);
                }
                Err(FetcherError::Cancelled) => {
                    info!(attempt, request = %request, "Request cancelled");
                    return Err(FetcherError::Cancelled);
                }
                Err(err) => {
                    error!(attempt, request = %request, "Non-retryable error: {}", err);
                    crate::metrics::record_terminal_failure(err.label());
                    return Err(err);
                }
            };

            last_fault = Some(fault.kind);
            let ctx = RetryContext::new(
                request,
                attempt,
                max_attempts,
                fault.kind,
                fault.message.clone(),
                self.transport.endpoint(),
            )
            .with_date_range(range);

            if attempt >= max_attempts {
                error!(
                    attempts = attempt,
                    fault = fault.kind.label(),
                    "{}",
                    ctx.format_failure()
                );
                crate::metrics::record_terminal_failure("transport");
                return Err(FetcherError::Transport(fault));
            }

            let delay = self.policy.backoff_with_jitter(attempt);
            let ctx = ctx.with_backoff(delay);
            warn!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                fault = fault.kind.label(),
                error = %fault.message,
                "{}",
                ctx.format_retry()
            );
            crate::metrics::record_retry_backoff(delay, attempt);

            self.cancellable(sleep(delay)).await?;
        }
    }

    /// Race `future` against the cancel signal, if one is set
    async fn cancellable<F: Future>(&self, future: F) -> FetcherResult<F::Output> {
        match &self.cancel {
            Some(cancel) => tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(FetcherError::Cancelled),
                output = future => Ok(output),
            },
            None => Ok(future.await),
        }
    }
}
