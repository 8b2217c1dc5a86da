use crate::capability::{Capability, Dependencies};
use crate::registry::Registry;
use crate::types::{CapabilityStatus, CapabilityType};

pub(crate) struct TestCap(Capability);

pub(crate) fn cap(id: &str) -> TestCap {
    TestCap(Capability {
        id: id.to_string(),
        name: id.to_string(),
        capability_type: CapabilityType::Skill,
        version: "1.0.0".to_string(),
        status: CapabilityStatus::Stable,
        description: format!("{id} guidance"),
        category: "general".to_string(),
        tags: Vec::new(),
        author: "capkit".to_string(),
        last_updated: "2024-05-01".to_string(),
        dependencies: Dependencies::default(),
        conflicts: Vec::new(),
        composable_with: Vec::new(),
        agent_roles: Vec::new(),
        relevance: None,
        payload: None,
        raw_metadata: Default::default(),
    })
}

fn owned(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

impl TestCap {
    pub(crate) fn requires(mut self, ids: &[&str]) -> Self {
        self.0.dependencies.required = owned(ids);
        self
    }

    pub(crate) fn optionally(mut self, ids: &[&str]) -> Self {
        self.0.dependencies.optional = owned(ids);
        self
    }

    pub(crate) fn conflicts_with(mut self, ids: &[&str]) -> Self {
        self.0.conflicts = owned(ids);
        self
    }

    pub(crate) fn composes_with(mut self, ids: &[&str]) -> Self {
        self.0.composable_with = owned(ids);
        self
    }

    pub(crate) fn status(mut self, status: CapabilityStatus) -> Self {
        self.0.status = status;
        self
    }
}

pub(crate) fn registry(caps: Vec<TestCap>) -> Registry {
    Registry::from_capabilities(caps.into_iter().map(|c| c.0))
}
