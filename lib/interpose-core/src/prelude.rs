//! Prelude module for convenient imports.
//!
//! ```ignore
//! use interpose_core::prelude::*;
//! ```

pub use crate::{
    Chain, Emitter, Error, EventInterceptor, EventStream, Headers, HttpBackend, HttpEvent,
    Interceptor, InterceptorEntry, Method, Next, Request, RequestBuilder, Response, ResponseBody,
    ResponseType, Result, event_interceptor_fn, interceptor_fn,
};
