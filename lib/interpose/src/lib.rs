//! Composable HTTP interceptor chains.
//!
//! Requests flow through an ordered list of interceptors into a terminal
//! backend, and the resulting events flow back the same way. The chain is
//! folded once, lazily, and every dispatch is tracked as a pending task so
//! callers can wait until no request is outstanding.
//!
//! # Example
//!
//! ```
//! use interpose::prelude::*;
//! use interpose::interceptors::SetHeaders;
//!
//! # async fn run() -> interpose::Result<()> {
//! let root = InterceptorRegistry::new();
//! root.register_interceptor(SetHeaders::new().header("X-A", "1"))
//!     .register_interceptor(SetHeaders::new().header("X-B", "2"));
//!
//! let handler = InterceptorHandler::builder(EchoBackend::new())
//!     .interceptors(root)
//!     .build();
//!
//! let request = Request::get("https://api.example.com/".parse()?).build();
//! let response = handler.send(request).await?;
//! assert_eq!(
//!     response.body().as_json(),
//!     Some(&serde_json::json!({"X-A": "1", "X-B": "2"}))
//! );
//! handler.pending_tasks().when_stable().await;
//! # Ok(())
//! # }
//! ```

mod backend;
mod config;
mod dispatcher;
pub mod interceptors;
mod pending;
pub mod prelude;
mod registry;
mod sequential;

// Re-export dispatcher types
pub use dispatcher::{HandlerBuilder, InterceptorHandler, ServiceFuture};
pub use pending::{PendingTask, PendingTasks};
pub use registry::{InterceptorRegistry, merge_sources};
pub use sequential::SequentialHandler;

// Re-export backends and configuration
#[cfg(feature = "hyper-backend")]
pub use backend::HyperBackend;
pub use backend::{EchoBackend, ServiceBackend};
pub use config::{BackendConfig, BackendConfigBuilder, DispatcherConfig, DispatcherConfigBuilder};

// Re-export tower for service composition
pub use tower;

// Re-export core types
pub use interpose_core::{
    AbortSignal, Chain, Emitter, Error, EventInterceptor, EventStream, Headers, HttpBackend,
    HttpEvent, HttpEventType, Interceptor, InterceptorEntry, Next, Request, RequestBuilder,
    Response, ResponseBody, ResponseType, Result, UserEvent, dispatch_sequential,
    event_interceptor_fn, from_json, interceptor_fn, to_json,
};

// Re-export http types for methods, status codes and headers
pub use interpose_core::{Method, StatusCode, header};

// Re-export url for request construction
pub use url;
