//! Watchdog engine
//!
//! One `WatchdogHeader` holds the watchdogs of one clock on one processor.
//! Scheduled watchdogs sit in an ordered tree keyed by absolute expiry
//! (ties by insertion sequence); the first key is cached so the next
//! expiry is known without a tree walk.
//!
//! Watchdog controls live in a slab owned by the header and are addressed
//! by `WatchdogId`. A generation counter makes ids of released watchdogs
//! stale instead of aliasing a new one.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::error::{Result, ScoreError};

/// Handle to a watchdog control inside one header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchdogId {
    index: u32,
    generation: u32,
}

/// Watchdog state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Inactive,
    Scheduled,
}

type TreeKey = (u64, u64);

struct WatchdogControl<R> {
    routine: R,
    expire: u64,
    key: Option<TreeKey>,
}

impl<R> WatchdogControl<R> {
    fn state(&self) -> WatchdogState {
        if self.key.is_some() {
            WatchdogState::Scheduled
        } else {
            WatchdogState::Inactive
        }
    }
}

struct Slot<R> {
    generation: u32,
    control: Option<WatchdogControl<R>>,
}

/// Ordered set of pending expirations
pub struct WatchdogHeader<R> {
    slots: Vec<Slot<R>>,
    free: Vec<u32>,
    tree: BTreeMap<TreeKey, u32>,
    first: Option<TreeKey>,
    sequence: u64,
}

impl<R: Clone> WatchdogHeader<R> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            tree: BTreeMap::new(),
            first: None,
            sequence: 0,
        }
    }

    /// Allocate an inactive watchdog with the given routine
    pub fn initialize(&mut self, routine: R) -> WatchdogId {
        let control = WatchdogControl { routine, expire: 0, key: None };

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.control = Some(control);
            return WatchdogId { index, generation: slot.generation };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, control: Some(control) });
        WatchdogId { index, generation: 0 }
    }

    fn control(&self, id: WatchdogId) -> Result<&WatchdogControl<R>> {
        match self.slots.get(id.index as usize) {
            Some(slot) if slot.generation == id.generation => {
                slot.control.as_ref().ok_or(ScoreError::InvalidId)
            }
            _ => Err(ScoreError::InvalidId),
        }
    }

    fn control_mut(&mut self, id: WatchdogId) -> Result<&mut WatchdogControl<R>> {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation => {
                slot.control.as_mut().ok_or(ScoreError::InvalidId)
            }
            _ => Err(ScoreError::InvalidId),
        }
    }

    pub fn state(&self, id: WatchdogId) -> Result<WatchdogState> {
        Ok(self.control(id)?.state())
    }

    /// Absolute expiry of the last insert
    pub fn expire(&self, id: WatchdogId) -> Result<u64> {
        Ok(self.control(id)?.expire)
    }

    pub fn routine(&self, id: WatchdogId) -> Result<R> {
        Ok(self.control(id)?.routine.clone())
    }

    /// Schedule the watchdog at absolute time `expire`
    ///
    /// A scheduled watchdog must be removed before it is inserted again.
    pub fn insert(&mut self, id: WatchdogId, expire: u64) -> Result<()> {
        let key = (expire, self.sequence);
        let control = self.control_mut(id)?;
        if control.key.is_some() {
            return Err(ScoreError::IncorrectState);
        }
        control.expire = expire;
        control.key = Some(key);

        self.sequence += 1;
        self.tree.insert(key, id.index);
        if self.first.map_or(true, |first| key < first) {
            self.first = Some(key);
        }
        Ok(())
    }

    /// Deactivate the watchdog; removing an inactive one does nothing
    pub fn remove(&mut self, id: WatchdogId) -> Result<()> {
        let control = self.control_mut(id)?;
        let key = match control.key.take() {
            Some(key) => key,
            None => return Ok(()),
        };
        self.tree.remove(&key);
        if self.first == Some(key) {
            self.first = self.tree.keys().next().copied();
        }
        Ok(())
    }

    /// Remove (if scheduled) and free the control
    pub fn release(&mut self, id: WatchdogId) -> Result<R> {
        self.remove(id)?;
        let slot = &mut self.slots[id.index as usize];
        let control = slot.control.take().ok_or(ScoreError::InvalidId)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Ok(control.routine)
    }

    /// Next expiry time, if anything is scheduled
    pub fn first_expire(&self) -> Option<u64> {
        self.first.map(|(expire, _)| expire)
    }

    /// Watchdog that fires next
    pub fn first(&self) -> Option<WatchdogId> {
        let key = self.first?;
        let index = *self.tree.get(&key)?;
        let generation = self.slots[index as usize].generation;
        Some(WatchdogId { index, generation })
    }

    /// Pop the first watchdog if it is due at `now`
    ///
    /// The watchdog is inactive on return; its routine is handed back so
    /// the caller can run it after dropping the header lock.
    pub fn pop_expired(&mut self, now: u64) -> Option<(WatchdogId, R)> {
        let (expire, _) = self.first?;
        if expire > now {
            return None;
        }
        let id = self.first()?;
        self.remove(id).ok()?;
        let routine = self.routine(id).ok()?;
        Some((id, routine))
    }

    /// Number of scheduled watchdogs
    pub fn scheduled(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl<R: Clone> Default for WatchdogHeader<R> {
    fn default() -> Self {
        Self::new()
    }
}
