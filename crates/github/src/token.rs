// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short-lived token acquisition for git operations.

use async_trait::async_trait;

/// Provides a fresh token for authenticating git operations. Tokens are
/// short-lived; callers must refresh immediately before each clone rather
/// than caching.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh_token(&self) -> Result<String, String>;
}

/// Fake refresher returning a fixed token, with injectable failure.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone)]
pub struct FakeTokenRefresher {
    token: String,
    fail: bool,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeTokenRefresher {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            token: String::new(),
            fail: true,
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl TokenRefresher for FakeTokenRefresher {
    async fn refresh_token(&self) -> Result<String, String> {
        if self.fail {
            return Err("token refresh failed".to_string());
        }
        Ok(self.token.clone())
    }
}
