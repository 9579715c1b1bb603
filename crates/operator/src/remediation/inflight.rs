use std::collections::HashSet;
use std::sync::{Arc, Mutex};

type InstanceKey = (String, String);

/// Tracks instances with a remediation already running so that a repeated
/// alert cannot capture or delete the same pod twice.
#[derive(Clone, Default)]
pub struct InFlightRegistry {
    active: Arc<Mutex<HashSet<InstanceKey>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the instance, or returns `None` if it is already claimed.
    pub fn try_acquire(&self, namespace: &str, name: &str) -> Option<InFlightGuard> {
        let key = (namespace.to_string(), name.to_string());
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        if !active.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            registry: self.clone(),
            key,
        })
    }

    pub fn is_active(&self, namespace: &str, name: &str) -> bool {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.contains(&(namespace.to_string(), name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.active.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases its instance on drop.
pub struct InFlightGuard {
    registry: InFlightRegistry,
    key: InstanceKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut active = self.registry.active.lock().unwrap_or_else(|e| e.into_inner());
        active.remove(&self.key);
    }
}
