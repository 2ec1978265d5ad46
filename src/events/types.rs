//! Event payloads emitted by the overlay client engine.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Event delivered by the client engine. One variant per event kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MeshEvent {
    Context(ContextEvent),
    Router(RouterEvent),
    Service(ServiceEvent),
}

impl MeshEvent {
    /// Kind name, matching the serialized tag
    pub fn kind(&self) -> &'static str {
        match self {
            MeshEvent::Context(_) => "context",
            MeshEvent::Router(_) => "router",
            MeshEvent::Service(_) => "service",
        }
    }

    pub fn as_context(&self) -> Option<&ContextEvent> {
        match self {
            MeshEvent::Context(event) => Some(event),
            _ => None,
        }
    }

    pub fn as_router(&self) -> Option<&RouterEvent> {
        match self {
            MeshEvent::Router(event) => Some(event),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceEvent> {
        match self {
            MeshEvent::Service(event) => Some(event),
            _ => None,
        }
    }
}

impl From<ContextEvent> for MeshEvent {
    fn from(event: ContextEvent) -> Self {
        MeshEvent::Context(event)
    }
}

impl From<RouterEvent> for MeshEvent {
    fn from(event: RouterEvent) -> Self {
        MeshEvent::Router(event)
    }
}

impl From<ServiceEvent> for MeshEvent {
    fn from(event: ServiceEvent) -> Self {
        MeshEvent::Service(event)
    }
}

/// Controller connection status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEvent {
    /// Zero when the controller connection is healthy
    pub ctrl_status: i32,
    pub err: Option<String>,
}

impl ContextEvent {
    pub fn ok() -> Self {
        Self {
            ctrl_status: 0,
            err: None,
        }
    }

    pub fn failed(status: i32, err: impl Into<String>) -> Self {
        Self {
            ctrl_status: status,
            err: Some(err.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ctrl_status == 0
    }
}

/// Edge router connectivity change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterEvent {
    pub name: String,
    pub address: String,
    pub version: Option<String>,
    pub status: RouterStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouterStatus {
    Added,
    Connected,
    Disconnected,
    Removed,
    Unavailable,
}

impl RouterStatus {
    /// Check if the router can carry traffic
    pub fn is_usable(&self) -> bool {
        matches!(self, RouterStatus::Connected)
    }
}

/// Services that appeared, changed, or disappeared since the last refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceEvent {
    #[serde(default)]
    pub removed: ServiceArray,
    #[serde(default)]
    pub changed: ServiceArray,
    #[serde(default)]
    pub added: ServiceArray,
}

impl ServiceEvent {
    /// Total services referenced by this event
    pub fn total(&self) -> usize {
        self.removed.len() + self.changed.len() + self.added.len()
    }
}

/// A service published by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<ServicePermission>,
    #[serde(default = "encryption_required")]
    pub encryption: bool,
    /// Config type name to config body
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

fn encryption_required() -> bool {
    true
}

impl Service {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            permissions: Vec::new(),
            encryption: encryption_required(),
            config: HashMap::new(),
        }
    }

    pub fn with_permission(mut self, permission: ServicePermission) -> Self {
        if !self.permissions.contains(&permission) {
            self.permissions.push(permission);
        }
        self
    }

    pub fn can_dial(&self) -> bool {
        self.permissions.contains(&ServicePermission::Dial)
    }

    pub fn can_bind(&self) -> bool {
        self.permissions.contains(&ServicePermission::Bind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ServicePermission {
    Dial,
    Bind,
}

/// Possibly-absent list of services.
///
/// Indexing never faults: an absent list or an out-of-range index is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceArray(Option<Vec<Service>>);

impl ServiceArray {
    pub fn new(services: Vec<Service>) -> Self {
        Self(Some(services))
    }

    /// An absent list
    pub fn absent() -> Self {
        Self(None)
    }

    pub fn is_absent(&self) -> bool {
        self.0.is_none()
    }

    pub fn get(&self, idx: usize) -> Option<&Service> {
        self.0.as_ref().and_then(|services| services.get(idx))
    }

    pub fn len(&self) -> usize {
        self.0.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Service> {
        self.0.iter().flatten()
    }
}

impl From<Vec<Service>> for ServiceArray {
    fn from(services: Vec<Service>) -> Self {
        Self::new(services)
    }
}
