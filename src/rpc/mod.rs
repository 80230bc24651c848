//! RPC module - correlating asynchronous responses with waiting callers.
//!
//! Provides:
//! - [`CallIdGenerator`] - unique, non-zero call ids
//! - [`MethodInvocation`] - builder for the call description
//! - [`PendingCalls`] / [`CallHandle`] - in-flight table and its waiters
//! - [`RpcCaller`] - register, send, wait with a deadline
//! - [`ServiceTable`] - server side dispatch to [`RpcService`]s

mod call_id;
mod caller;
mod invocation;
mod pending;
mod service;

pub use call_id::CallIdGenerator;
pub use caller::RpcCaller;
pub use invocation::MethodInvocation;
pub use pending::{CallHandle, CallOutcome, PendingCalls};
pub use service::{HelloService, HelloServiceClient, InvokeError, RpcService, ServiceTable};
