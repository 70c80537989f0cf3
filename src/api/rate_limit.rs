use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::error::{NoteboxError, Result};

struct Window {
    started: Instant,
    count: u32,
}

/// Global fixed-window request counter.
pub struct RateLimiter {
    config: RateLimitConfig,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            window: Mutex::new(Window {
                started: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Admit one request or report how long until the window resets.
    pub async fn check(&self) -> Result<()> {
        if !self.config.is_enabled() {
            return Ok(());
        }

        let length = Duration::from_secs(self.config.window_secs);
        let now = Instant::now();
        let mut window = self.window.lock().await;

        if now.duration_since(window.started) >= length {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.config.max_requests {
            let remaining = length.saturating_sub(now.duration_since(window.started));
            let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(NoteboxError::RateLimited {
                retry_after_secs: Some(secs.max(1)),
            });
        }

        window.count += 1;
        Ok(())
    }
}

/// Middleware rejecting requests over budget with 429.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    match limiter.check().await {
        Ok(()) => next.run(request).await,
        Err(e) => {
            tracing::warn!(method = %request.method(), uri = %request.uri(), "rate limit exceeded");
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window_secs,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_over_budget_then_recovers() {
        let limiter = limiter(2, 10);

        limiter.check().await.unwrap();
        limiter.check().await.unwrap();

        match limiter.check().await {
            Err(NoteboxError::RateLimited { retry_after_secs }) => {
                assert_eq!(retry_after_secs, Some(10));
            }
            other => panic!("expected rate limit, got {:?}", other),
        }

        tokio::time::advance(Duration::from_secs(4)).await;
        match limiter.check().await {
            Err(NoteboxError::RateLimited { retry_after_secs }) => {
                assert_eq!(retry_after_secs, Some(6));
            }
            other => panic!("expected rate limit, got {:?}", other),
        }

        tokio::time::advance(Duration::from_secs(6)).await;
        limiter.check().await.unwrap();
    }

    #[tokio::test]
    async fn test_disabled_limiter_admits_everything() {
        let limiter = limiter(0, 10);
        for _ in 0..1000 {
            limiter.check().await.unwrap();
        }
    }
}
