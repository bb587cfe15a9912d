//! Dispatcher and backend configuration types.

use std::time::Duration;

// ============================================================================
// Dispatcher
// ============================================================================

/// Configuration for an [`InterceptorHandler`](crate::InterceptorHandler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Whether each request holds a pending task until its stream terminates.
    pub track_pending: bool,
    /// Whether the handler runs in a server environment, which enables the
    /// one-time warning for backends that are not server capable.
    pub server_environment: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            track_pending: true,
            server_environment: false,
        }
    }
}

impl DispatcherConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> DispatcherConfigBuilder {
        DispatcherConfigBuilder::default()
    }
}

/// Builder for [`DispatcherConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatcherConfigBuilder {
    track_pending: Option<bool>,
    server_environment: Option<bool>,
}

impl DispatcherConfigBuilder {
    /// Set whether requests are tracked as pending tasks.
    #[must_use]
    pub const fn track_pending(mut self, track: bool) -> Self {
        self.track_pending = Some(track);
        self
    }

    /// Set whether the handler runs in a server environment.
    #[must_use]
    pub const fn server_environment(mut self, server: bool) -> Self {
        self.server_environment = Some(server);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> DispatcherConfig {
        let defaults = DispatcherConfig::default();
        DispatcherConfig {
            track_pending: self.track_pending.unwrap_or(defaults.track_pending),
            server_environment: self
                .server_environment
                .unwrap_or(defaults.server_environment),
        }
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Configuration for the network backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Overall request timeout, from dispatch to the last body byte.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
        }
    }
}

impl BackendConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> BackendConfigBuilder {
        BackendConfigBuilder::default()
    }
}

/// Builder for [`BackendConfig`].
#[derive(Debug, Clone, Default)]
pub struct BackendConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
}

impl BackendConfigBuilder {
    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> BackendConfig {
        let defaults = BackendConfig::default();
        BackendConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
        }
    }
}
