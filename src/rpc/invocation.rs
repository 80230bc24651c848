//! Describing a remote method call.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::message::RpcRequest;

/// Interface, method and arguments of a call, before it has a call id.
///
/// # Example
///
/// ```
/// use chatwire::rpc::MethodInvocation;
///
/// let invocation = MethodInvocation::new("HelloService", "sayHello")
///     .returns("String")
///     .arg("String", &"zhangsan")
///     .unwrap();
///
/// let request = invocation.into_request(7);
/// assert_eq!(request.call_id, 7);
/// assert_eq!(request.param_types, vec!["String".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInvocation {
    pub interface_name: String,
    pub method_name: String,
    pub return_type: String,
    pub param_types: Vec<String>,
    pub param_values: Vec<Value>,
}

impl MethodInvocation {
    /// Call `method_name` on `interface_name` with no arguments yet.
    pub fn new(interface_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            interface_name: interface_name.into(),
            method_name: method_name.into(),
            return_type: "void".to_string(),
            param_types: Vec::new(),
            param_values: Vec::new(),
        }
    }

    /// Declared return type name.
    pub fn returns(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = return_type.into();
        self
    }

    /// Append an argument and its declared type name.
    pub fn arg<T: Serialize + ?Sized>(mut self, type_name: impl Into<String>, value: &T) -> Result<Self> {
        self.param_values.push(serde_json::to_value(value)?);
        self.param_types.push(type_name.into());
        Ok(self)
    }

    /// Attach a call id, producing the wire request.
    pub fn into_request(self, call_id: i32) -> RpcRequest {
        RpcRequest {
            call_id,
            interface_name: self.interface_name,
            method_name: self.method_name,
            return_type: self.return_type,
            param_types: self.param_types,
            param_values: self.param_values,
        }
    }
}
