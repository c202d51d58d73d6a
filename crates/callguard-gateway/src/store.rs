//! Per-protocol condition store.
//!
//! Conditions are kept in insertion order and indexed by selector. The store
//! is a plain value: callers that share it across threads clone it, mutate the
//! clone and swap it in, so readers always see whole batches.

use std::collections::HashMap;
use std::sync::Arc;

use callguard_core::abi::Selector;
use callguard_core::error::{CallGuardError, Result};

use crate::condition::{Condition, ConditionSpec};

#[derive(Debug, Clone, Default)]
pub struct ConditionStore {
    conditions: Vec<Arc<Condition>>,
    by_selector: HashMap<Selector, Vec<Arc<Condition>>>,
    // Generated ids stay unique across deletes.
    next_seq: u64,
}

impl ConditionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and append one condition.
    pub fn add(&mut self, spec: ConditionSpec) -> Result<Arc<Condition>> {
        let seq = self.next_seq;
        let condition = Condition::compile(spec, |sig| format!("{}#{seq}", sig.signature()))?;

        if self.get(condition.id()).is_some() {
            return Err(CallGuardError::DuplicateId(condition.id().to_string()));
        }

        let bucket = self.by_selector.entry(condition.selector()).or_default();
        if let Some(other) = bucket
            .iter()
            .find(|c| c.signature() != condition.signature())
        {
            tracing::warn!(
                selector = %condition.selector(),
                condition = %condition.id(),
                existing = %other.signature(),
                incoming = %condition.signature(),
                "selector collision between different signatures"
            );
        }

        let condition = Arc::new(condition);
        bucket.push(Arc::clone(&condition));
        self.conditions.push(Arc::clone(&condition));
        self.next_seq += 1;
        Ok(condition)
    }

    /// All-or-nothing append.
    pub fn add_batch(&mut self, specs: Vec<ConditionSpec>) -> Result<Vec<Arc<Condition>>> {
        let mut staged = self.clone();
        let added = specs
            .into_iter()
            .map(|spec| staged.add(spec))
            .collect::<Result<Vec<_>>>()?;
        *self = staged;
        Ok(added)
    }

    pub fn delete(&mut self, id: &str) -> Result<Arc<Condition>> {
        let pos = self
            .conditions
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| CallGuardError::ConditionNotFound(id.to_string()))?;
        let removed = self.conditions.remove(pos);

        if let Some(bucket) = self.by_selector.get_mut(&removed.selector()) {
            bucket.retain(|c| c.id() != id);
            if bucket.is_empty() {
                self.by_selector.remove(&removed.selector());
            }
        }
        Ok(removed)
    }

    pub fn clear_all(&mut self) {
        self.conditions.clear();
        self.by_selector.clear();
    }

    /// Candidates for a selector, in insertion order.
    pub fn conditions_for_selector(&self, selector: &Selector) -> &[Arc<Condition>] {
        self.by_selector
            .get(selector)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Condition>> {
        self.conditions.iter().find(|c| c.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Condition>> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}
