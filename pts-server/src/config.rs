use pts_estimate::{EstimateService, IssueStore, ProjectStore};
use std::{sync::Arc, time::Duration};

/// Security configuration for the Pointscale server.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Allowed origins for CORS (empty = allow all, which is NOT recommended for production)
    pub allowed_origins: Vec<String>,
    /// Maximum request body size in bytes (default: 10MB)
    pub max_body_size: usize,
    /// Request timeout duration (default: 30 seconds)
    pub request_timeout: Duration,
    /// Whether storage error messages reach the client (default: false)
    pub expose_error_details: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_body_size: 10 * 1024 * 1024,
            request_timeout: Duration::from_secs(30),
            expose_error_details: false,
        }
    }
}

impl SecurityConfig {
    /// Permissive CORS, detailed errors, longer timeout.
    pub fn development() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_body_size: 10 * 1024 * 1024,
            request_timeout: Duration::from_secs(60),
            expose_error_details: true,
        }
    }

    pub fn production(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins, ..Self::default() }
    }
}

/// Services and security settings the router is built from.
#[derive(Clone)]
pub struct ServerConfig {
    pub estimate_service: Arc<dyn EstimateService>,
    pub project_store: Arc<dyn ProjectStore>,
    pub issue_store: Arc<dyn IssueStore>,
    pub security: SecurityConfig,
}

impl ServerConfig {
    pub fn new(
        estimate_service: Arc<dyn EstimateService>,
        project_store: Arc<dyn ProjectStore>,
        issue_store: Arc<dyn IssueStore>,
    ) -> Self {
        Self { estimate_service, project_store, issue_store, security: SecurityConfig::default() }
    }

    /// One backend serving all three traits, which is how both bundled
    /// backends are built.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: EstimateService + ProjectStore + IssueStore + 'static,
    {
        Self::new(backend.clone(), backend.clone(), backend)
    }

    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// Configure allowed CORS origins
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.security.allowed_origins = origins;
        self
    }

    /// Configure maximum request body size
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.security.max_body_size = size;
        self
    }

    /// Configure request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.security.request_timeout = timeout;
        self
    }

    /// Enable detailed error messages (for development only)
    pub fn with_error_details(mut self, expose: bool) -> Self {
        self.security.expose_error_details = expose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pts_estimate::InMemoryEstimateService;

    const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;
    const PROD_TIMEOUT: u64 = 30;
    const DEV_TIMEOUT: u64 = 60;

    #[test]
    fn test_security_config_constructors() {
        let default = SecurityConfig::default();
        assert_eq!(default.allowed_origins.len(), 0);
        assert_eq!(default.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(default.request_timeout, Duration::from_secs(PROD_TIMEOUT));
        assert!(!default.expose_error_details);

        let dev = SecurityConfig::development();
        assert_eq!(dev.request_timeout, Duration::from_secs(DEV_TIMEOUT));
        assert!(dev.expose_error_details);

        let prod = SecurityConfig::production(vec!["https://example.com".to_string()]);
        assert_eq!(prod.allowed_origins, vec!["https://example.com"]);
        assert_eq!(prod.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(prod.request_timeout, Duration::from_secs(PROD_TIMEOUT));
        assert!(!prod.expose_error_details);
    }

    #[test]
    fn test_server_config_security_passthrough() {
        let config = ServerConfig::from_backend(Arc::new(InMemoryEstimateService::new()))
            .with_allowed_origins(vec!["test".into()])
            .with_max_body_size(100)
            .with_request_timeout(Duration::from_secs(10))
            .with_error_details(true);

        assert_eq!(config.security.allowed_origins, vec!["test"]);
        assert_eq!(config.security.max_body_size, 100);
        assert_eq!(config.security.request_timeout, Duration::from_secs(10));
        assert!(config.security.expose_error_details);
    }

    #[test]
    fn test_with_security_replaces_defaults() {
        let config = ServerConfig::from_backend(Arc::new(InMemoryEstimateService::new()))
            .with_security(SecurityConfig::development());
        assert!(config.security.expose_error_details);
    }
}
