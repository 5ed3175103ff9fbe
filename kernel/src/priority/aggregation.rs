//! Priority aggregation
//!
//! Every contributor (the thread's own real priority, donations from
//! resources it holds) adds one value. The minimum is the effective
//! priority of the thread within one scheduler instance. An empty
//! aggregation means the thread has no claim on that instance.

use alloc::collections::BTreeSet;

use crate::collections::{new_map, KernelHashMap};
use crate::error::{Result, ScoreError};

use super::Priority;

/// Who contributes a priority value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrioritySource {
    /// The thread's own priority
    Real,
    /// Donation identified by the donor (mutex, ceiling, ...)
    Donation(u32),
}

/// Effective priority before and after an aggregation update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityChange {
    pub old: Option<Priority>,
    pub new: Option<Priority>,
}

impl PriorityChange {
    pub fn changed(&self) -> bool {
        self.old != self.new
    }
}

/// Multi-source priority
pub struct PriorityAggregation {
    ordered: BTreeSet<(Priority, PrioritySource)>,
    contributors: KernelHashMap<PrioritySource, Priority>,
}

impl PriorityAggregation {
    pub fn new() -> Self {
        Self {
            ordered: BTreeSet::new(),
            contributors: new_map(),
        }
    }

    /// Drop every contributor and start over with exactly one
    pub fn initialize_one(&mut self, source: PrioritySource, priority: Priority) {
        self.ordered.clear();
        self.contributors.clear();
        self.ordered.insert((priority, source));
        self.contributors.insert(source, priority);
    }

    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty()
    }

    /// Effective priority
    pub fn minimum(&self) -> Option<Priority> {
        self.ordered.iter().next().map(|&(priority, _)| priority)
    }

    pub fn contribution(&self, source: PrioritySource) -> Option<Priority> {
        self.contributors.get(&source).copied()
    }

    pub fn len(&self) -> usize {
        self.contributors.len()
    }

    /// Add a contributor
    pub fn insert(&mut self, source: PrioritySource, priority: Priority) -> Result<PriorityChange> {
        if self.contributors.contains_key(&source) {
            return Err(ScoreError::ResourceInUse);
        }
        let old = self.minimum();
        self.contributors.insert(source, priority);
        self.ordered.insert((priority, source));
        Ok(PriorityChange { old, new: self.minimum() })
    }

    /// Replace the value of an existing contributor
    pub fn change(&mut self, source: PrioritySource, priority: Priority) -> Result<PriorityChange> {
        let previous = self.contributors.get_mut(&source).ok_or(ScoreError::IncorrectState)?;
        let old_value = *previous;
        *previous = priority;
        let old = self.minimum();
        self.ordered.remove(&(old_value, source));
        self.ordered.insert((priority, source));
        Ok(PriorityChange { old, new: self.minimum() })
    }

    /// Remove a contributor
    pub fn extract(&mut self, source: PrioritySource) -> Result<PriorityChange> {
        let value = self.contributors.remove(&source).ok_or(ScoreError::IncorrectState)?;
        let old = self.minimum();
        self.ordered.remove(&(value, source));
        Ok(PriorityChange { old, new: self.minimum() })
    }

    /// Remove every contributor
    pub fn clear(&mut self) -> PriorityChange {
        let old = self.minimum();
        self.ordered.clear();
        self.contributors.clear();
        PriorityChange { old, new: None }
    }
}

impl Default for PriorityAggregation {
    fn default() -> Self {
        Self::new()
    }
}
