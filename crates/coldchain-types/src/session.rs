/// Authenticated operator session.
///
/// Holds the opaque bearer token produced by the login flow. Passed
/// explicitly into every backend call so components never reach into
/// ambient storage for credentials.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    /// The `Authorization` header value for this session.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_header() {
        let session = Session::new("tok-123");
        assert_eq!(session.bearer(), "Bearer tok-123");
    }
}
