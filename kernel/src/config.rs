//! System configuration
//!
//! Built once with `ConfigurationBuilder` and validated in `build()`.
//! Whether a mandatory processor is really present is only known at boot,
//! so that check happens in `System::new`.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Result, ScoreError};
use crate::object::Name;
use crate::priority::{Priority, PRIORITY_LIMIT};
use crate::processor::{CpuIndex, ProcessorMask, PROCESSOR_MASK_BITS};
use crate::scheduler::{ReadySetKind, SchedulerAlgorithm, SchedulerIndex};

/// One scheduler instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerEntry {
    pub name: Name,
    pub algorithm: SchedulerAlgorithm,
    /// Idle priority; threads use `0..maximum_priority`
    pub maximum_priority: Priority,
}

impl SchedulerEntry {
    pub fn simple(name: Name, maximum_priority: Priority) -> Self {
        Self {
            name,
            algorithm: SchedulerAlgorithm::Simple(ReadySetKind::Chain),
            maximum_priority,
        }
    }
}

/// Boot time owner of a processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorAssignment {
    pub scheduler_index: SchedulerIndex,
    /// Boot fails if the processor is not present
    pub mandatory: bool,
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub maximum_processors: usize,
    pub present_processors: ProcessorMask,
    pub schedulers: Vec<SchedulerEntry>,
    pub initial_assignments: Vec<Option<ProcessorAssignment>>,
    pub maximum_threads: usize,
    pub ticks_per_timeslice: u32,
    pub nanoseconds_per_tick: u64,
}

impl Configuration {
    pub fn builder() -> ConfigurationBuilder {
        ConfigurationBuilder::new()
    }

    pub fn assignment(&self, cpu: CpuIndex) -> Option<ProcessorAssignment> {
        self.initial_assignments.get(cpu).copied().flatten()
    }

    fn validate(&self) -> Result<()> {
        if self.schedulers.is_empty() {
            return Err(ScoreError::NotConfigured);
        }
        if self.maximum_processors == 0 || self.maximum_processors > PROCESSOR_MASK_BITS {
            return Err(ScoreError::InvalidNumber);
        }
        if !self
            .present_processors
            .is_subset_of(&ProcessorMask::first_n(self.maximum_processors))
        {
            return Err(ScoreError::InvalidNumber);
        }
        let out_of_range =
            |entry: &SchedulerEntry| entry.maximum_priority < 2 || entry.maximum_priority > PRIORITY_LIMIT;
        if self.schedulers.iter().any(out_of_range) {
            return Err(ScoreError::InvalidNumber);
        }
        if self.initial_assignments.len() != self.maximum_processors {
            return Err(ScoreError::InvalidNumber);
        }
        let unknown = self
            .initial_assignments
            .iter()
            .flatten()
            .any(|assignment| assignment.scheduler_index >= self.schedulers.len());
        if unknown {
            return Err(ScoreError::NotConfigured);
        }
        if self.maximum_threads == 0 || self.nanoseconds_per_tick == 0 {
            return Err(ScoreError::InvalidNumber);
        }
        Ok(())
    }
}

/// Builder for `Configuration`
///
/// Without explicit assignments every processor goes to instance 0,
/// mandatory for processor 0 only.
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
    maximum_processors: usize,
    present_processors: Option<ProcessorMask>,
    schedulers: Vec<SchedulerEntry>,
    assignments: Vec<(CpuIndex, Option<ProcessorAssignment>)>,
    maximum_threads: usize,
    ticks_per_timeslice: u32,
    nanoseconds_per_tick: u64,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self {
            maximum_processors: 1,
            present_processors: None,
            schedulers: Vec::new(),
            assignments: Vec::new(),
            maximum_threads: 64,
            ticks_per_timeslice: 50,
            nanoseconds_per_tick: 10_000_000,
        }
    }

    pub fn maximum_processors(mut self, count: usize) -> Self {
        self.maximum_processors = count;
        self
    }

    /// Defaults to every configured processor
    pub fn present_processors(mut self, present: ProcessorMask) -> Self {
        self.present_processors = Some(present);
        self
    }

    pub fn scheduler(mut self, entry: SchedulerEntry) -> Self {
        self.schedulers.push(entry);
        self
    }

    pub fn assign(mut self, cpu: CpuIndex, scheduler_index: SchedulerIndex, mandatory: bool) -> Self {
        self.assignments
            .push((cpu, Some(ProcessorAssignment { scheduler_index, mandatory })));
        self
    }

    /// Leave `cpu` without an instance at boot
    pub fn unassign(mut self, cpu: CpuIndex) -> Self {
        self.assignments.push((cpu, None));
        self
    }

    pub fn maximum_threads(mut self, count: usize) -> Self {
        self.maximum_threads = count;
        self
    }

    pub fn ticks_per_timeslice(mut self, ticks: u32) -> Self {
        self.ticks_per_timeslice = ticks;
        self
    }

    pub fn nanoseconds_per_tick(mut self, nanoseconds: u64) -> Self {
        self.nanoseconds_per_tick = nanoseconds;
        self
    }

    pub fn build(self) -> Result<Configuration> {
        let maximum = self.maximum_processors;
        let mut initial_assignments: Vec<Option<ProcessorAssignment>> = (0..maximum)
            .map(|cpu| {
                Some(ProcessorAssignment {
                    scheduler_index: 0,
                    mandatory: cpu == 0,
                })
            })
            .collect();

        if !self.assignments.is_empty() {
            initial_assignments = vec![None; maximum];
            for (cpu, assignment) in self.assignments {
                let slot = initial_assignments.get_mut(cpu).ok_or(ScoreError::InvalidNumber)?;
                *slot = assignment;
            }
        }

        let config = Configuration {
            maximum_processors: maximum,
            present_processors: self
                .present_processors
                .unwrap_or_else(|| ProcessorMask::first_n(maximum)),
            schedulers: self.schedulers,
            initial_assignments,
            maximum_threads: self.maximum_threads,
            ticks_per_timeslice: self.ticks_per_timeslice,
            nanoseconds_per_tick: self.nanoseconds_per_tick,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> SchedulerEntry {
        SchedulerEntry::simple(Name::from_bytes(b"UPD "), 256)
    }

    #[test]
    fn test_default_assignment() {
        let config = Configuration::builder()
            .maximum_processors(2)
            .scheduler(entry())
            .build()
            .unwrap();
        assert_eq!(config.present_processors, ProcessorMask::first_n(2));
        assert_eq!(
            config.assignment(0),
            Some(ProcessorAssignment { scheduler_index: 0, mandatory: true })
        );
        assert_eq!(config.assignment(1).map(|a| a.mandatory), Some(false));
    }

    #[test]
    fn test_rejects_bad_tables() {
        assert_eq!(Configuration::builder().build().unwrap_err(), ScoreError::NotConfigured);
        assert_eq!(
            Configuration::builder().scheduler(entry()).assign(0, 3, true).build().unwrap_err(),
            ScoreError::NotConfigured
        );
        assert_eq!(
            Configuration::builder().scheduler(entry()).assign(5, 0, false).build().unwrap_err(),
            ScoreError::InvalidNumber
        );
        assert_eq!(
            Configuration::builder()
                .scheduler(SchedulerEntry::simple(Name::from_bytes(b"LOW "), 1))
                .build()
                .unwrap_err(),
            ScoreError::InvalidNumber
        );
    }

    #[test]
    fn test_maximum_priority_fits_priority_key() {
        let at_limit = SchedulerEntry::simple(Name::from_bytes(b"TOP "), PRIORITY_LIMIT);
        assert!(Configuration::builder().scheduler(at_limit).build().is_ok());

        let above = SchedulerEntry::simple(Name::from_bytes(b"OVER"), PRIORITY_LIMIT + 1);
        assert_eq!(
            Configuration::builder().scheduler(above).build().unwrap_err(),
            ScoreError::InvalidNumber
        );
        let max = SchedulerEntry::simple(Name::from_bytes(b"MAX "), Priority::MAX);
        assert_eq!(
            Configuration::builder().scheduler(max).build().unwrap_err(),
            ScoreError::InvalidNumber
        );
    }
}
