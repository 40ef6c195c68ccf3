//! Mutation observer registrations and record queues
//!
//! Records are queued per registration at the moment a mutation happens and
//! stay queued until the owner drains them with [`Document::take_records`],
//! which hands back the whole batch in mutation order.

use crate::dom::{Document, NodeId};
use crate::error::DomError;

/// Handle of one observer registration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u32);

/// Which mutations an observer wants to see
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub subtree: bool,
    /// Restrict attribute records to these (lowercase) names
    pub attribute_filter: Option<Vec<String>>,
}

impl ObserverInit {
    fn validate(&self) -> Result<(), DomError> {
        if !self.child_list && !self.attributes {
            return Err(DomError::InvalidObserverInit(
                "at least one of child_list or attributes must be requested",
            ));
        }
        if self.attribute_filter.is_some() && !self.attributes {
            return Err(DomError::InvalidObserverInit(
                "attribute_filter requires attributes",
            ));
        }
        Ok(())
    }

    fn wants(&self, record: &MutationRecord) -> bool {
        match record.kind {
            MutationKind::ChildList => self.child_list,
            MutationKind::Attributes => {
                self.attributes
                    && match (&self.attribute_filter, &record.attribute_name) {
                        (Some(filter), Some(name)) => filter.iter().any(|f| f == name),
                        (Some(_), None) => false,
                        (None, _) => true,
                    }
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    ChildList,
    Attributes,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub attribute_name: Option<String>,
}

impl MutationRecord {
    pub fn child_list(target: NodeId, added_nodes: Vec<NodeId>, removed_nodes: Vec<NodeId>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added_nodes,
            removed_nodes,
            attribute_name: None,
        }
    }

    pub fn attribute(target: NodeId, name: &str) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: Some(name.to_string()),
        }
    }
}

struct Registration {
    id: ObserverId,
    target: NodeId,
    init: ObserverInit,
    queue: Vec<MutationRecord>,
}

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    registrations: Vec<Registration>,
    next_id: u32,
    unloaded: bool,
}

impl ObserverRegistry {
    pub(crate) fn is_observing(&self) -> bool {
        !self.registrations.is_empty()
    }

    /// Queue `record` for every registration interested in it
    ///
    /// `chain` is the inclusive ancestor chain of the record's target.
    pub(crate) fn enqueue(&mut self, record: MutationRecord, chain: &[NodeId]) {
        for registration in &mut self.registrations {
            let in_scope = registration.target == record.target
                || (registration.init.subtree && chain.contains(&registration.target));
            if in_scope && registration.init.wants(&record) {
                registration.queue.push(record.clone());
            }
        }
    }
}

impl Document {
    /// Register an observer on `target`
    pub fn observe(&mut self, target: NodeId, init: ObserverInit) -> Result<ObserverId, DomError> {
        if self.observers.unloaded {
            return Err(DomError::Unloaded);
        }
        if self.node(target).is_none() {
            return Err(DomError::NotFound(target));
        }
        init.validate()?;

        let registry = &mut self.observers;
        registry.next_id += 1;
        let id = ObserverId(registry.next_id);
        registry.registrations.push(Registration {
            id,
            target,
            init,
            queue: Vec::new(),
        });
        log::debug!("observer {} registered on {}", id.0, target);
        Ok(id)
    }

    /// Drain the pending batch of an observer (empty for unknown observers)
    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .registrations
            .iter_mut()
            .find(|r| r.id == observer)
            .map(|r| std::mem::take(&mut r.queue))
            .unwrap_or_default()
    }

    pub fn has_pending_records(&self) -> bool {
        self.observers
            .registrations
            .iter()
            .any(|r| !r.queue.is_empty())
    }

    /// Tear the page down: drop every registration and its queued records
    pub fn unload(&mut self) {
        let dropped = self.observers.registrations.len();
        self.observers.registrations.clear();
        self.observers.unloaded = true;
        log::debug!("document unloaded, dropped {} observer(s)", dropped);
    }

    pub fn is_unloaded(&self) -> bool {
        self.observers.unloaded
    }
}
