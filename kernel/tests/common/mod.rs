// tests/common/mod.rs
// Port de dispatch enregistreur et démarrage du système pour les tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use score_kernel::scheduler::DispatchPort;
use score_kernel::{
    Configuration, CpuIndex, Name, ObjectId, ProcessorMask, SchedulerEntry, System, ThreadConfig, ThreadId,
};

/// Dispatch port that records what the core asked for
#[derive(Default)]
pub struct RecordingPort {
    current: AtomicUsize,
    requests: Mutex<Vec<CpuIndex>>,
    switches: Mutex<Vec<(CpuIndex, Option<ThreadId>, ThreadId)>>,
}

impl RecordingPort {
    pub fn set_current(&self, cpu: CpuIndex) {
        self.current.store(cpu, Ordering::SeqCst);
    }

    pub fn take_requests(&self) -> Vec<CpuIndex> {
        std::mem::take(&mut *self.requests.lock().unwrap())
    }

    pub fn switches(&self) -> Vec<(CpuIndex, Option<ThreadId>, ThreadId)> {
        self.switches.lock().unwrap().clone()
    }
}

impl DispatchPort for RecordingPort {
    fn current_processor(&self) -> CpuIndex {
        self.current.load(Ordering::SeqCst)
    }

    fn request_dispatch(&self, cpu: CpuIndex) {
        self.requests.lock().unwrap().push(cpu);
    }

    fn context_switch(&self, cpu: CpuIndex, from: Option<ThreadId>, to: ThreadId) {
        self.switches.lock().unwrap().push((cpu, from, to));
    }
}

pub const IDLE_PRIORITY: u64 = 255;

pub fn name(text: &[u8; 4]) -> Name {
    Name::from_bytes(text)
}

/// One simple instance "MAIN" owning `cpus` processors
pub fn boot(cpus: usize) -> (System, Arc<RecordingPort>) {
    let config = Configuration::builder()
        .maximum_processors(cpus)
        .scheduler(SchedulerEntry::simple(name(b"MAIN"), IDLE_PRIORITY))
        .build()
        .unwrap();
    boot_with(config)
}

pub fn boot_with(config: Configuration) -> (System, Arc<RecordingPort>) {
    let port = Arc::new(RecordingPort::default());
    let system = System::new(config, port.clone());
    service(&system, &port);
    (system, port)
}

/// Run the dispatch handler of every processor that was asked to
pub fn service(system: &System, port: &RecordingPort) {
    loop {
        let requests = port.take_requests();
        if requests.is_empty() {
            break;
        }
        for cpu in requests {
            system.dispatch(cpu);
        }
    }
    for cpu in 0..system.cpus().len() {
        if system.cpus()[cpu].dispatch_necessary() {
            system.dispatch(cpu);
        }
    }
}

pub fn scheduler_id(system: &System, text: &[u8; 4]) -> ObjectId {
    system.scheduler_ident(name(text)).unwrap()
}

/// Create and start a thread on instance `scheduler`
pub fn spawn(system: &System, port: &RecordingPort, scheduler: ObjectId, priority: u64, affinity: ProcessorMask) -> ThreadId {
    let config = ThreadConfig::new(name(b"TASK"), scheduler, priority).affinity(affinity);
    let id = system.create_thread(config).unwrap();
    system.start_thread(id).unwrap();
    service(system, port);
    id
}

/// Executing thread of every processor
pub fn executing(system: &System) -> Vec<Option<ThreadId>> {
    system.cpus().iter().map(|cpu| cpu.executing()).collect()
}
