//! Processors
//!
//! Processor masks, the per-processor records and the processor set
//! manager that moves processors in and out of scheduler instances.

pub mod mask;
pub mod percpu;
pub mod set;

pub use mask::{CpuIndex, ProcessorMask, ProcessorMaskIter, PROCESSOR_MASK_BITS};
pub use percpu::{CpuScheduler, PerCpu, PerCpuState};
