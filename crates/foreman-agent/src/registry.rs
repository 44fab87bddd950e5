//! Fixed catalog of workers a coordinator may dispatch to.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use foreman_core::{WorkerId, WorkerSettings};

use crate::error::RegistryError;
use crate::traits::Worker;

/// A registered worker.
#[derive(Clone)]
pub struct WorkerDescriptor {
    pub id: WorkerId,
    pub capability_description: String,
    pub handle: Arc<dyn Worker>,
}

impl fmt::Debug for WorkerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerDescriptor")
            .field("id", &self.id)
            .field("capability_description", &self.capability_description)
            .finish_non_exhaustive()
    }
}

/// Read-only registry of workers, in registration order.
#[derive(Debug, Clone, Default)]
pub struct WorkerRegistry {
    workers: Vec<WorkerDescriptor>,
}

impl WorkerRegistry {
    /// Start building a registry.
    pub fn builder() -> WorkerRegistryBuilder {
        WorkerRegistryBuilder::default()
    }

    /// Build a registry from the configured catalog, binding each entry to its handle.
    ///
    /// Every configured worker needs a handle; handles without a catalog entry are ignored.
    pub fn from_settings(
        settings: &[WorkerSettings],
        mut handles: HashMap<WorkerId, Arc<dyn Worker>>,
    ) -> Result<Self, RegistryError> {
        let mut builder = Self::builder();
        for entry in settings {
            let handle = handles
                .remove(&entry.id)
                .ok_or_else(|| RegistryError::MissingHandle(entry.id.clone()))?;
            builder = builder.register_id(entry.id.clone(), entry.description.clone(), handle)?;
        }
        Ok(builder.build())
    }

    /// All workers in registration order.
    pub fn list(&self) -> &[WorkerDescriptor] {
        &self.workers
    }

    /// Look up a worker by id.
    pub fn get(&self, id: &str) -> Result<&WorkerDescriptor, RegistryError> {
        self.workers
            .iter()
            .find(|w| w.id == id)
            .ok_or_else(|| RegistryError::UnknownWorker(id.to_string()))
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = &WorkerId> {
        self.workers.iter().map(|w| &w.id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.workers.iter().any(|w| w.id == id)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// Builder for [`WorkerRegistry`]; rejects invalid and duplicate ids.
#[derive(Default)]
pub struct WorkerRegistryBuilder {
    workers: Vec<WorkerDescriptor>,
}

impl WorkerRegistryBuilder {
    /// Register a worker under a string id, validating it.
    pub fn register(
        self,
        id: impl AsRef<str>,
        capability_description: impl Into<String>,
        handle: Arc<dyn Worker>,
    ) -> Result<Self, RegistryError> {
        let id = WorkerId::parse(id)?;
        self.register_id(id, capability_description, handle)
    }

    /// Register a worker under an already validated id.
    pub fn register_id(
        mut self,
        id: WorkerId,
        capability_description: impl Into<String>,
        handle: Arc<dyn Worker>,
    ) -> Result<Self, RegistryError> {
        if self.workers.iter().any(|w| w.id == id) {
            return Err(RegistryError::DuplicateWorker(id));
        }
        let capability_description = capability_description.into();
        info!(
            worker_id = %id,
            description = %capability_description,
            "Registering worker"
        );
        self.workers.push(WorkerDescriptor {
            id,
            capability_description,
            handle,
        });
        Ok(self)
    }

    pub fn build(self) -> WorkerRegistry {
        WorkerRegistry {
            workers: self.workers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WorkerError;
    use crate::types::{WorkerOutput, WorkerRequest};
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Worker for Noop {
        async fn run(&self, _request: WorkerRequest) -> Result<WorkerOutput, WorkerError> {
            Ok(WorkerOutput::default())
        }
    }

    fn registry() -> WorkerRegistry {
        WorkerRegistry::builder()
            .register("coder", "Edits source files", Arc::new(Noop))
            .unwrap()
            .register("tester", "Runs the test suite", Arc::new(Noop))
            .unwrap()
            .build()
    }

    #[test]
    fn list_preserves_registration_order() {
        let registry = registry();
        let ids: Vec<_> = registry.ids().map(WorkerId::as_str).collect();
        assert_eq!(ids, ["coder", "tester"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains("tester"));
        assert!(!registry.contains("painter"));
    }

    #[test]
    fn get_unknown_worker_fails() {
        let registry = registry();
        assert_eq!(
            registry.get("tester").unwrap().capability_description,
            "Runs the test suite"
        );
        match registry.get("painter") {
            Err(RegistryError::UnknownWorker(id)) => assert_eq!(id, "painter"),
            other => panic!("expected UnknownWorker, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = WorkerRegistry::builder()
            .register("coder", "a", Arc::new(Noop))
            .unwrap()
            .register("coder", "b", Arc::new(Noop));
        assert!(matches!(result, Err(RegistryError::DuplicateWorker(_))));
    }

    #[test]
    fn invalid_ids_are_rejected() {
        let result = WorkerRegistry::builder().register("code review", "a", Arc::new(Noop));
        assert!(matches!(result, Err(RegistryError::InvalidId(_))));
    }

    #[test]
    fn from_settings_requires_every_handle() {
        let settings = vec![
            WorkerSettings {
                id: WorkerId::parse("coder").unwrap(),
                description: "Edits source files".into(),
            },
            WorkerSettings {
                id: WorkerId::parse("tester").unwrap(),
                description: "Runs tests".into(),
            },
        ];
        let mut handles: HashMap<WorkerId, Arc<dyn Worker>> = HashMap::new();
        handles.insert(WorkerId::parse("coder").unwrap(), Arc::new(Noop));

        match WorkerRegistry::from_settings(&settings, handles.clone()) {
            Err(RegistryError::MissingHandle(id)) => assert_eq!(id, "tester"),
            other => panic!("expected MissingHandle, got {other:?}"),
        }

        handles.insert(WorkerId::parse("tester").unwrap(), Arc::new(Noop));
        let registry = WorkerRegistry::from_settings(&settings, handles).unwrap();
        assert_eq!(registry.list()[1].capability_description, "Runs tests");
    }
}
