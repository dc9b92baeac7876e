//! Trigger-endpoint authentication.

/// Compares the trigger request's bearer token against the configured
/// secret.
///
/// With no secret configured, every request is rejected — an unset secret
/// must fail closed, not open, because the trigger mutates the store.
#[derive(Debug, Clone)]
pub struct TriggerAuth {
    token: Option<String>,
}

impl TriggerAuth {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// Whether a secret is configured at all.
    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }

    /// Validate the raw `Authorization` header value. Accepts both
    /// `Bearer <token>` and the bare token.
    pub fn validate(&self, authorization: Option<&str>) -> bool {
        let Some(expected) = &self.token else {
            return false;
        };
        let Some(header) = authorization else {
            return false;
        };
        let presented = header.strip_prefix("Bearer ").unwrap_or(header);
        !presented.is_empty() && presented == expected
    }
}
