// tests/processor_set.rs
// Ajout/retrait de processeurs aux instances d'ordonnanceur

mod common;

use common::*;
use score_kernel::{Configuration, ObjectId, ProcessorMask, SchedulerEntry, ScoreError, StatusCode};

fn two_instances() -> Configuration {
    Configuration::builder()
        .maximum_processors(2)
        .scheduler(SchedulerEntry::simple(name(b"MAIN"), IDLE_PRIORITY))
        .scheduler(SchedulerEntry::simple(name(b"AUX "), IDLE_PRIORITY))
        .assign(0, 0, true)
        .assign(1, 1, false)
        .build()
        .unwrap()
}

#[test]
fn test_last_eligible_processor_cannot_be_removed() {
    let (system, port) = boot(2);
    let main = scheduler_id(&system, b"MAIN");
    let thread = spawn(&system, &port, main, 10, ProcessorMask::first_n(2));
    assert_eq!(system.cpus()[0].executing(), Some(thread));

    system.scheduler_remove_processor(main, 0).unwrap();
    service(&system, &port);
    assert_eq!(system.scheduler_get_processor_set(main), Ok(ProcessorMask::single(1)));
    assert_eq!(system.cpus()[1].executing(), Some(thread));
    assert_eq!(system.cpus()[0].control(), None);
    assert!(system.cpus()[0].idle_if_online_and_unused().is_some());

    assert_eq!(system.scheduler_remove_processor(main, 1), Err(ScoreError::ResourceInUse));
    assert_eq!(system.scheduler_get_processor_set(main), Ok(ProcessorMask::single(1)));
    assert_eq!(system.cpus()[1].control(), Some(0));
    assert_eq!(system.cpus()[1].executing(), Some(thread));
}

#[test]
fn test_pinned_thread_blocks_removal_without_mutation() {
    let (system, port) = boot(2);
    let main = scheduler_id(&system, b"MAIN");
    let thread = spawn(&system, &port, main, 10, ProcessorMask::single(1));

    let before = system.scheduler_get_processor_set(main).unwrap();
    assert_eq!(system.scheduler_remove_processor(main, 1), Err(ScoreError::ResourceInUse));
    assert_eq!(system.scheduler_get_processor_set(main), Ok(before));
    assert_eq!(system.cpus()[1].executing(), Some(thread));

    system.scheduler_remove_processor(main, 0).unwrap();
}

#[test]
fn test_add_then_remove_restores_mask() {
    let (system, port) = boot(3);
    let main = scheduler_id(&system, b"MAIN");
    system.scheduler_remove_processor(main, 2).unwrap();
    service(&system, &port);

    let before = system.scheduler_get_processor_set(main).unwrap();
    assert_eq!(before, ProcessorMask::first_n(2));

    system.scheduler_add_processor(main, 2).unwrap();
    service(&system, &port);
    assert_eq!(system.scheduler_get_processor_set(main), Ok(ProcessorMask::first_n(3)));
    assert_eq!(system.cpus()[2].control(), Some(0));
    assert_eq!(system.cpus()[2].idle_if_online_and_unused(), None);

    system.scheduler_remove_processor(main, 2).unwrap();
    service(&system, &port);
    assert_eq!(system.scheduler_get_processor_set(main), Ok(before));
    assert_eq!(system.cpus()[2].control(), None);
    assert!(system.cpus()[2].idle_if_online_and_unused().is_some());
}

#[test]
fn test_processor_moves_between_instances() {
    let (system, port) = boot_with(two_instances());
    let main = scheduler_id(&system, b"MAIN");
    let aux = scheduler_id(&system, b"AUX ");
    assert_eq!(system.scheduler_ident_by_processor(1), Ok(aux));

    system.scheduler_remove_processor(aux, 1).unwrap();
    assert_eq!(system.scheduler_ident_by_processor(1), Err(ScoreError::IncorrectState));
    system.scheduler_add_processor(main, 1).unwrap();
    service(&system, &port);

    assert_eq!(system.scheduler_get_processor_set(main), Ok(ProcessorMask::first_n(2)));
    assert!(system.scheduler_get_processor_set(aux).unwrap().is_zero());
    assert_eq!(system.scheduler_ident_by_processor(1), Ok(main));

    let idle = system.cpus()[1].executing().unwrap();
    let idle = system.threads().get(idle).unwrap();
    assert!(idle.is_idle());
    assert_eq!(idle.home(), 0);
    assert_eq!(system.get_priority(idle.id()), Ok(IDLE_PRIORITY));
}

#[test]
fn test_add_processor_errors() {
    let config = Configuration::builder()
        .maximum_processors(4)
        .present_processors(ProcessorMask::first_n(3))
        .scheduler(SchedulerEntry::simple(name(b"MAIN"), IDLE_PRIORITY))
        .assign(0, 0, true)
        .assign(1, 0, false)
        .assign(3, 0, false)
        .build()
        .unwrap();
    let (system, _port) = boot_with(config);
    let main = scheduler_id(&system, b"MAIN");

    assert_eq!(
        system.scheduler_add_processor(ObjectId::from_u32(0), 1),
        Err(ScoreError::InvalidId)
    );
    assert_eq!(system.scheduler_add_processor(main, 4), Err(ScoreError::NotConfigured));
    assert_eq!(system.scheduler_add_processor(main, 2), Err(ScoreError::NotConfigured));
    assert_eq!(system.scheduler_add_processor(main, 3), Err(ScoreError::IncorrectState));
    assert_eq!(system.scheduler_add_processor(main, 0), Err(ScoreError::ResourceInUse));

    let status = StatusCode::from(system.scheduler_add_processor(main, 1));
    assert_eq!(status, StatusCode::ResourceInUse);
}

#[test]
fn test_remove_processor_errors() {
    let (system, _port) = boot_with(two_instances());
    let main = scheduler_id(&system, b"MAIN");

    assert_eq!(
        system.scheduler_remove_processor(ObjectId::from_u32(0x0f01_0003), 0),
        Err(ScoreError::InvalidId)
    );
    assert_eq!(system.scheduler_remove_processor(main, 9), Err(ScoreError::InvalidNumber));
    assert_eq!(system.scheduler_remove_processor(main, 1), Err(ScoreError::InvalidNumber));
}

#[test]
fn test_helping_thread_keeps_last_processor() {
    let (system, port) = boot_with(two_instances());
    let main = scheduler_id(&system, b"MAIN");
    let aux = scheduler_id(&system, b"AUX ");
    let thread = spawn(&system, &port, main, 10, ProcessorMask::first_n(2));

    system.add_helping_scheduler(thread, aux).unwrap();
    assert_eq!(system.scheduler_remove_processor(aux, 1), Err(ScoreError::ResourceInUse));
    assert_eq!(system.scheduler_get_processor_set(aux), Ok(ProcessorMask::single(1)));

    system.remove_helping_scheduler(thread, aux).unwrap();
    system.scheduler_remove_processor(aux, 1).unwrap();
}

#[test]
fn test_removal_dispatches_idle_on_removed_processor() {
    let (system, port) = boot(2);
    let main = scheduler_id(&system, b"MAIN");
    let first = spawn(&system, &port, main, 10, ProcessorMask::first_n(2));
    let second = spawn(&system, &port, main, 20, ProcessorMask::first_n(2));
    let running = executing(&system);
    assert!(running.contains(&Some(first)));
    assert!(running.contains(&Some(second)));

    port.set_current(1);
    system.scheduler_remove_processor(main, 0).unwrap();
    service(&system, &port);

    assert_eq!(system.cpus()[1].executing(), Some(first));
    let on_zero = system.cpus()[0].executing().unwrap();
    assert!(system.threads().get(on_zero).unwrap().is_idle());
    assert!(system.scheduler_by_id(main).unwrap().is_ready(second));
}

#[test]
fn test_unassigned_processor_stays_outside_instances() {
    let config = Configuration::builder()
        .maximum_processors(2)
        .scheduler(SchedulerEntry::simple(name(b"MAIN"), IDLE_PRIORITY))
        .assign(0, 0, true)
        .unassign(1)
        .build()
        .unwrap();
    let (system, _port) = boot_with(config);
    let main = scheduler_id(&system, b"MAIN");

    assert_eq!(system.online_processors(), ProcessorMask::first_n(2));
    assert_eq!(system.scheduler_get_processor_set(main), Ok(ProcessorMask::single(0)));
    assert_eq!(system.scheduler_get_maximum_priority(main), Ok(IDLE_PRIORITY));
    assert_eq!(system.scheduler_ident_by_processor(1), Err(ScoreError::IncorrectState));
    assert_eq!(system.scheduler_add_processor(main, 1), Err(ScoreError::NotConfigured));
}
