//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and functions
//! for easy glob importing:
//!
//! ```ignore
//! use interpose::prelude::*;
//! ```

pub use crate::{
    AbortSignal, EchoBackend, Error, EventInterceptor, EventStream, HttpBackend, HttpEvent,
    Interceptor, InterceptorEntry, InterceptorHandler, InterceptorRegistry, Method, Next,
    PendingTasks, Request, Response, ResponseBody, Result, SequentialHandler, ServiceBackend,
    event_interceptor_fn, interceptor_fn,
};
#[cfg(feature = "hyper-backend")]
pub use crate::HyperBackend;
