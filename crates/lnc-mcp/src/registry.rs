//! Tool registry.
//!
//! Services own groups of tools. The registry is filled once at startup
//! and is immutable afterwards; registration is where the access policy
//! is enforced, so a read-only server cannot even advertise a tool that
//! declares itself mutating.

use async_trait::async_trait;
use lnc_core::{LncResult, RequestContext};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::{McpError, McpResult};
use crate::types::{Access, ToolDescriptor};

/// Which tool access levels a registry accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessMode {
    #[default]
    ReadOnly,
    AllowMutating,
}

impl AccessMode {
    pub fn permits(&self, access: Access) -> bool {
        match self {
            AccessMode::ReadOnly => access == Access::ReadOnly,
            AccessMode::AllowMutating => true,
        }
    }
}

/// A group of tools sharing state.
#[async_trait]
pub trait ToolService: Send + Sync {
    /// Service name, for logs.
    fn name(&self) -> &'static str;

    fn tools(&self) -> Vec<ToolDescriptor>;

    /// Invoke one of this service's tools. Failures are tool errors, not
    /// protocol errors.
    async fn call(&self, tool: &str, ctx: &RequestContext, args: Value) -> LncResult<Value>;
}

struct Entry {
    descriptor: ToolDescriptor,
    service: Arc<dyn ToolService>,
}

pub struct ToolRegistry {
    mode: AccessMode,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new(mode: AccessMode) -> Self {
        Self {
            mode,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Register every tool of `service`. Nothing is registered if any tool
    /// is refused.
    pub fn register(&mut self, service: Arc<dyn ToolService>) -> McpResult<()> {
        let tools = service.tools();
        let mut seen = HashSet::new();
        for tool in &tools {
            if !self.mode.permits(tool.access) {
                return Err(McpError::AccessDenied(format!(
                    "tool {} from service {} mutates node state and the server is read-only",
                    tool.name,
                    service.name()
                )));
            }
            if self.index.contains_key(&tool.name) || !seen.insert(tool.name.clone()) {
                return Err(McpError::DuplicateTool(tool.name.clone()));
            }
        }

        for descriptor in tools {
            tracing::debug!(tool = %descriptor.name, service = service.name(), "registered tool");
            self.index.insert(descriptor.name.clone(), self.entries.len());
            self.entries.push(Entry {
                descriptor,
                service: Arc::clone(&service),
            });
        }
        Ok(())
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.entries[i].descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn call(&self, name: &str, ctx: &RequestContext, args: Value) -> McpResult<Value> {
        let entry = self
            .index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;
        entry
            .service
            .call(name, ctx, args)
            .await
            .map_err(McpError::Tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lnc_core::LncError;
    use serde_json::json;

    struct Fixed {
        names: Vec<(&'static str, Access)>,
    }

    #[async_trait]
    impl ToolService for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn tools(&self) -> Vec<ToolDescriptor> {
            self.names
                .iter()
                .map(|(n, a)| {
                    let mut d = ToolDescriptor::read_only(n, "test", json!({"type": "object"}));
                    d.access = *a;
                    d
                })
                .collect()
        }

        async fn call(&self, tool: &str, _ctx: &RequestContext, args: Value) -> LncResult<Value> {
            if tool == "boom" {
                return Err(LncError::NotConnected);
            }
            Ok(json!({"tool": tool, "args": args}))
        }
    }

    fn fixed(names: &[(&'static str, Access)]) -> Arc<dyn ToolService> {
        Arc::new(Fixed {
            names: names.to_vec(),
        })
    }

    #[test]
    fn test_read_only_rejects_mutating_tool() {
        let mut registry = ToolRegistry::new(AccessMode::ReadOnly);
        let err = registry
            .register(fixed(&[("ok", Access::ReadOnly), ("pay", Access::Mutating)]))
            .unwrap_err();
        assert!(matches!(err, McpError::AccessDenied(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_allow_mutating_accepts_everything() {
        let mut registry = ToolRegistry::new(AccessMode::AllowMutating);
        registry
            .register(fixed(&[("pay", Access::Mutating)]))
            .unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = ToolRegistry::new(AccessMode::ReadOnly);
        registry.register(fixed(&[("a", Access::ReadOnly)])).unwrap();
        let err = registry
            .register(fixed(&[("a", Access::ReadOnly)]))
            .unwrap_err();
        assert!(matches!(err, McpError::DuplicateTool(name) if name == "a"));

        let err = registry
            .register(fixed(&[("b", Access::ReadOnly), ("b", Access::ReadOnly)]))
            .unwrap_err();
        assert!(matches!(err, McpError::DuplicateTool(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_descriptors_keep_registration_order() {
        let mut registry = ToolRegistry::new(AccessMode::ReadOnly);
        registry
            .register(fixed(&[("z", Access::ReadOnly), ("a", Access::ReadOnly)]))
            .unwrap();
        registry.register(fixed(&[("m", Access::ReadOnly)])).unwrap();
        let names: Vec<_> = registry.descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
        assert!(registry.get("a").is_some());
        assert!(registry.get("nope").is_none());
    }

    #[tokio::test]
    async fn test_call_routes_and_wraps_errors() {
        let mut registry = ToolRegistry::new(AccessMode::ReadOnly);
        registry
            .register(fixed(&[("echo", Access::ReadOnly), ("boom", Access::ReadOnly)]))
            .unwrap();
        let ctx = RequestContext::new("echo");

        let out = registry.call("echo", &ctx, json!({"x": 1})).await.unwrap();
        assert_eq!(out["tool"], "echo");
        assert_eq!(out["args"]["x"], 1);

        let err = registry.call("boom", &ctx, Value::Null).await.unwrap_err();
        assert!(matches!(err, McpError::Tool(LncError::NotConnected)));

        let err = registry.call("missing", &ctx, Value::Null).await.unwrap_err();
        assert!(matches!(err, McpError::ToolNotFound(_)));
        assert_eq!(err.json_rpc_code(), -32602);
    }
}
