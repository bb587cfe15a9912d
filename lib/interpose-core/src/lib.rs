//! Core types and traits for the interpose HTTP interceptor chain.
//!
//! This crate provides the foundational pieces shared by every stage:
//! - [`Request`] and [`RequestBuilder`] - immutable request values
//! - [`Response`] and [`ResponseBody`] - decoded responses
//! - [`HttpEvent`] - events flowing back through the chain
//! - [`Error`] and [`Result`] - error handling
//! - [`HttpBackend`], [`Interceptor`], [`EventInterceptor`] - the handler protocol
//! - [`InterceptorEntry`] - either calling convention as one tagged value
//! - [`Chain`] - an entry list folded into a single handler
//! - [`StatusCode`], [`Method`] and [`header`] - re-exported from the `http` crate

mod abort;
mod body;
mod chain;
mod entry;
mod error;
mod event;
mod handler;
mod headers;
pub mod prelude;
mod request;
mod response;

pub use abort::AbortSignal;
pub use body::{ResponseBody, ResponseType, from_json, from_value, to_json};
pub use chain::{Chain, dispatch_sequential};
pub use entry::{InterceptorEntry, event_interceptor_fn, interceptor_fn};
pub use error::{Error, Result};
pub use event::{HttpEvent, HttpEventType, UserEvent};
pub use handler::{Emitter, EventInterceptor, EventStream, HttpBackend, Interceptor, Next};
pub use headers::Headers;
pub use request::{Request, RequestBuilder};
pub use response::Response;

// Re-export http crate types for methods, status codes and headers
pub use http::{Method, StatusCode, header};
