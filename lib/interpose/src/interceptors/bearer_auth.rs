//! Bearer token authentication.
//!
//! Adds an `Authorization: Bearer <token>` header to all outgoing requests.

use std::sync::Arc;

use crate::{EventStream, Interceptor, Next, Request};

/// Adds bearer token authentication to requests.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    token: Arc<str>,
}

impl BearerAuth {
    /// Create a new bearer auth interceptor with the given token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Arc::from(token.into()),
        }
    }
}

impl Interceptor for BearerAuth {
    fn intercept(&self, request: Request, next: Next) -> EventStream {
        let request = request
            .to_builder()
            .set_header("Authorization", format!("Bearer {}", self.token))
            .build();
        next.run(request)
    }
}
