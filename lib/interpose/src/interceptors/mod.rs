//! Built-in interceptors.
//!
//! All of them use the next-based convention and can be registered with
//! [`InterceptorRegistry::register_interceptor`](crate::InterceptorRegistry::register_interceptor):
//!
//! - [`SetHeaders`] - sets fixed headers on every request
//! - [`BearerAuth`] - adds `Authorization: Bearer <token>`
//! - [`LoggingInterceptor`] - logs requests and outcomes using `tracing`
//! - [`Retry`] - runs the rest of the chain again on transient failures
//! - [`Xsrf`] - copies an anti-forgery token into mutating same-origin requests
//!
//! # Example
//!
//! ```
//! use interpose::InterceptorRegistry;
//! use interpose::interceptors::{BearerAuth, LoggingInterceptor, Retry};
//!
//! let root = InterceptorRegistry::new();
//! root.register_interceptor(LoggingInterceptor::new())
//!     .register_interceptor(Retry::new(3))
//!     .register_interceptor(BearerAuth::new("my-token"));
//! ```

mod bearer_auth;
mod logging;
mod retry;
mod set_headers;
mod xsrf;

pub use bearer_auth::BearerAuth;
pub use logging::{LogLevel, LoggingInterceptor};
pub use retry::Retry;
pub use set_headers::SetHeaders;
pub use xsrf::{TokenSource, Xsrf};
