//! Server side of RPC: services and the table that dispatches to them.
//!
//! There is no reflection. A service matches on the method name itself and
//! pulls its arguments out of the JSON parameter values; callers use a
//! hand-written stub such as [`HelloServiceClient`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use super::{MethodInvocation, RpcCaller};
use crate::error::Result;
use crate::message::{RpcRequest, RpcResponse};

/// Why a service could not produce a value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvokeError {
    #[error("no such method: {0}")]
    NoSuchMethod(String),

    #[error("bad arguments: {0}")]
    BadArguments(String),

    #[error("{0}")]
    Failed(String),
}

/// A remotely callable interface.
pub trait RpcService: Send + Sync + 'static {
    /// Run `method` with the decoded parameter values.
    fn invoke(&self, method: &str, params: &[Value]) -> std::result::Result<Value, InvokeError>;
}

/// Interface name to service implementation.
#[derive(Clone, Default)]
pub struct ServiceTable {
    services: HashMap<String, Arc<dyn RpcService>>,
}

impl ServiceTable {
    /// Table with no services.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `service` under `interface_name`, replacing any previous one.
    pub fn register(&mut self, interface_name: impl Into<String>, service: Arc<dyn RpcService>) {
        self.services.insert(interface_name.into(), service);
    }

    pub fn with_service(
        mut self,
        interface_name: impl Into<String>,
        service: impl RpcService,
    ) -> Self {
        self.register(interface_name, Arc::new(service));
        self
    }

    /// Whether a service is registered under `interface_name`.
    pub fn contains(&self, interface_name: &str) -> bool {
        self.services.contains_key(interface_name)
    }

    /// Answer a request. Every failure becomes an exception response.
    pub fn dispatch(&self, request: &RpcRequest) -> RpcResponse {
        let Some(service) = self.services.get(&request.interface_name) else {
            return RpcResponse::exception(
                request.call_id,
                format!("no such service: {}", request.interface_name),
            );
        };

        match service.invoke(&request.method_name, &request.param_values) {
            Ok(value) => RpcResponse::value(request.call_id, value),
            Err(e) => RpcResponse::exception(request.call_id, e.to_string()),
        }
    }
}

/// Greets people by name.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelloService;

impl HelloService {
    /// Interface name requests must carry.
    pub const INTERFACE: &'static str = "HelloService";
    pub const SAY_HELLO: &'static str = "sayHello";

    /// Greeting for `name`.
    pub fn say_hello(&self, name: &str) -> String {
        format!("hello, {}", name)
    }
}

impl RpcService for HelloService {
    fn invoke(&self, method: &str, params: &[Value]) -> std::result::Result<Value, InvokeError> {
        match method {
            Self::SAY_HELLO => {
                let name = match params {
                    [Value::String(name)] => name,
                    _ => {
                        return Err(InvokeError::BadArguments(
                            "sayHello takes one string".to_string(),
                        ))
                    }
                };
                if name.is_empty() {
                    return Err(InvokeError::Failed("name must not be empty".to_string()));
                }
                Ok(Value::String(self.say_hello(name)))
            }
            other => Err(InvokeError::NoSuchMethod(other.to_string())),
        }
    }
}

/// Typed stub for [`HelloService`].
#[derive(Clone)]
pub struct HelloServiceClient {
    caller: RpcCaller,
}

impl HelloServiceClient {
    pub fn new(caller: RpcCaller) -> Self {
        Self { caller }
    }

    /// Call `sayHello` on the server.
    ///
    /// # Errors
    ///
    /// `Remote` when the server raised, `RpcTimeout` when no answer came in time.
    pub async fn say_hello(&self, name: &str) -> Result<String> {
        let invocation = MethodInvocation::new(HelloService::INTERFACE, HelloService::SAY_HELLO)
            .returns("String")
            .arg("String", name)?;
        let value = self.caller.call(invocation).await?;
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::RpcOutcome;
    use serde_json::json;

    fn request(interface: &str, method: &str, params: Vec<Value>) -> RpcRequest {
        let mut invocation = MethodInvocation::new(interface, method);
        for value in params {
            invocation = invocation.arg("Object", &value).unwrap();
        }
        invocation.into_request(9)
    }

    fn table() -> ServiceTable {
        ServiceTable::new().with_service(HelloService::INTERFACE, HelloService)
    }

    #[test]
    fn test_dispatch_say_hello() {
        let response = table().dispatch(&request("HelloService", "sayHello", vec![json!("zhangsan")]));
        assert_eq!(response.call_id, 9);
        assert_eq!(response.outcome, RpcOutcome::Value(json!("hello, zhangsan")));
    }

    #[test]
    fn test_unknown_service() {
        let response = table().dispatch(&request("Nope", "sayHello", vec![]));
        match response.outcome {
            RpcOutcome::Exception(text) => assert!(text.starts_with("no such service")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_method() {
        let response = table().dispatch(&request("HelloService", "sayBye", vec![json!("x")]));
        assert_eq!(
            response.outcome,
            RpcOutcome::Exception("no such method: sayBye".to_string())
        );
    }

    #[test]
    fn test_method_failure_travels_as_exception() {
        let table = table();

        let response = table.dispatch(&request("HelloService", "sayHello", vec![json!("")]));
        assert_eq!(
            response.outcome,
            RpcOutcome::Exception("name must not be empty".to_string())
        );

        let response = table.dispatch(&request("HelloService", "sayHello", vec![json!(3)]));
        assert!(matches!(response.outcome, RpcOutcome::Exception(_)));
    }
}
