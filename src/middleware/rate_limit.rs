use crate::error::AppError;

/// Sign-in attempts allowed per address within [`LOGIN_WINDOW_SECS`].
pub const LOGIN_MAX_ATTEMPTS: u64 = 5;
pub const LOGIN_WINDOW_SECS: u64 = 900;

pub fn login_key(email: &str) -> String {
    format!("rate:login:{}", email.trim().to_lowercase())
}

/// Checks an email-keyed rate limit stored in Redis.
///
/// Uses the INCR + EXPIRE strategy:
/// - Increments a counter for `key`
/// - On first increment, sets TTL to `window_secs`
/// - Returns `AppError::RateLimited` if counter exceeds `max_attempts`
///
/// When Redis is unreachable the request is let through.
pub async fn check_rate_limit(
    redis: &mut redis::aio::MultiplexedConnection,
    key: &str,
    max_attempts: u64,
    window_secs: u64,
) -> Result<(), AppError> {
    let count: u64 = match redis::cmd("INCR").arg(key).query_async(redis).await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!("rate limit check skipped for {}: {}", key, e);
            return Ok(());
        }
    };

    if count == 1 {
        // Set TTL only on first increment to avoid resetting the window on each attempt
        let _: Result<(), _> = redis::cmd("EXPIRE")
            .arg(key)
            .arg(window_secs)
            .query_async(redis)
            .await;
    }

    if count > max_attempts {
        tracing::warn!("rate limit exceeded for {}", key);
        return Err(AppError::RateLimited);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_key_normalizes_email() {
        assert_eq!(login_key(" Ada@Example.com"), "rate:login:ada@example.com");
    }
}
