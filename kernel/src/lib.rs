// src/lib.rs
// Cœur d'ordonnancement: instances d'ordonnanceur, processeurs, priorités,
// watchdogs et dispatch
#![cfg_attr(not(test), no_std)]

// Import de alloc pour les allocations dynamiques
extern crate alloc;

pub mod error;
pub mod collections;
pub mod config;
pub mod object;
pub mod priority;
pub mod processor;
pub mod scheduler;
pub mod sync;
pub mod system;
pub mod thread;
pub mod time;

pub use config::{Configuration, ConfigurationBuilder, ProcessorAssignment, SchedulerEntry};
pub use error::{FatalSource, Result, ScoreError, StatusCode};
pub use object::{Name, ObjectId};
pub use priority::{Priority, PriorityKey};
pub use processor::{CpuIndex, ProcessorMask};
pub use scheduler::{DispatchPort, DispatchUrgency, SchedulerAlgorithm};
pub use system::System;
pub use thread::{ThreadConfig, ThreadId, ThreadStates};
pub use time::{Watchdog, WatchdogClock, WatchdogRoutine};
