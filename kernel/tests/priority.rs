// tests/priority.rs
// Agrégation de priorités, donations et changements de priorité

mod common;

use common::*;
use score_kernel::{Configuration, ProcessorMask, SchedulerEntry, ScoreError, ThreadConfig};

#[test]
fn test_donation_boosts_and_reverts() {
    let (system, port) = boot(1);
    let main = scheduler_id(&system, b"MAIN");
    let worker = spawn(&system, &port, main, 5, ProcessorMask::single(0));
    let boosted = spawn(&system, &port, main, 10, ProcessorMask::single(0));
    assert_eq!(system.cpus()[0].executing(), Some(worker));

    system.add_priority_donation(boosted, 1, 3).unwrap();
    service(&system, &port);
    assert_eq!(system.get_priority(boosted), Ok(3));
    assert_eq!(system.get_real_priority(boosted), Ok(10));
    assert_eq!(system.cpus()[0].executing(), Some(boosted));

    let scheduler = system.scheduler_by_id(main).unwrap();
    assert_eq!(scheduler.ready_order()[..2], [boosted, worker]);

    system.remove_priority_donation(boosted, 1).unwrap();
    service(&system, &port);
    assert_eq!(system.get_priority(boosted), Ok(10));
    assert_eq!(scheduler.ready_order()[..2], [worker, boosted]);
    assert_eq!(system.cpus()[0].executing(), Some(worker));
}

#[test]
fn test_donation_errors() {
    let (system, port) = boot(1);
    let main = scheduler_id(&system, b"MAIN");
    let thread = spawn(&system, &port, main, 10, ProcessorMask::single(0));

    assert_eq!(
        system.add_priority_donation(thread, 1, IDLE_PRIORITY),
        Err(ScoreError::InvalidPriority)
    );
    system.add_priority_donation(thread, 1, 4).unwrap();
    assert_eq!(system.add_priority_donation(thread, 1, 2), Err(ScoreError::ResourceInUse));
    assert_eq!(system.remove_priority_donation(thread, 2), Err(ScoreError::IncorrectState));

    system.change_priority_donation(thread, 1, 2).unwrap();
    assert_eq!(system.get_priority(thread), Ok(2));
}

#[test]
fn test_change_priority_reorders_ready_set() {
    let (system, port) = boot(1);
    let main = scheduler_id(&system, b"MAIN");
    let a = spawn(&system, &port, main, 8, ProcessorMask::single(0));
    let b = spawn(&system, &port, main, 8, ProcessorMask::single(0));
    let c = spawn(&system, &port, main, 12, ProcessorMask::single(0));
    let scheduler = system.scheduler_by_id(main).unwrap();
    assert_eq!(scheduler.ready_order()[..3], [a, b, c]);

    assert_eq!(system.change_priority(c, 8, true), Ok(12));
    assert_eq!(scheduler.ready_order()[..3], [c, a, b]);
    service(&system, &port);
    assert_eq!(system.cpus()[0].executing(), Some(c));

    system.change_priority(c, 9, false).unwrap();
    service(&system, &port);
    assert_eq!(scheduler.ready_order()[..3], [a, b, c]);
    assert_eq!(system.cpus()[0].executing(), Some(a));

    assert_eq!(system.change_priority(a, IDLE_PRIORITY, false), Err(ScoreError::InvalidPriority));
}

#[test]
fn test_donation_hides_real_priority_change() {
    let (system, port) = boot(1);
    let main = scheduler_id(&system, b"MAIN");
    let thread = spawn(&system, &port, main, 10, ProcessorMask::single(0));

    system.add_priority_donation(thread, 7, 2).unwrap();
    system.change_priority(thread, 20, false).unwrap();
    assert_eq!(system.get_priority(thread), Ok(2));

    system.remove_priority_donation(thread, 7).unwrap();
    assert_eq!(system.get_priority(thread), Ok(20));
}

#[test]
fn test_create_thread_validation() {
    let (system, _port) = boot(2);
    let main = scheduler_id(&system, b"MAIN");

    let config = ThreadConfig::new(name(b"BAD "), main, IDLE_PRIORITY);
    assert_eq!(system.create_thread(config), Err(ScoreError::InvalidPriority));

    let config = ThreadConfig::new(name(b"BAD "), main, 1).affinity(ProcessorMask::single(5));
    assert_eq!(system.create_thread(config), Err(ScoreError::InvalidNumber));

    let config = ThreadConfig::new(name(b"BAD "), score_kernel::ObjectId::from_u32(1), 1);
    assert_eq!(system.create_thread(config), Err(ScoreError::InvalidId));
}

#[test]
fn test_change_priority_checks_every_registered_instance() {
    let config = Configuration::builder()
        .maximum_processors(2)
        .scheduler(SchedulerEntry::simple(name(b"MAIN"), IDLE_PRIORITY))
        .scheduler(SchedulerEntry::simple(name(b"TINY"), 8))
        .assign(0, 0, true)
        .assign(1, 1, false)
        .build()
        .unwrap();
    let (system, port) = boot_with(config);
    let main = scheduler_id(&system, b"MAIN");
    let tiny = scheduler_id(&system, b"TINY");
    let id = spawn(&system, &port, main, 6, ProcessorMask::first_n(2));
    system.add_helping_scheduler(id, tiny).unwrap();

    assert_eq!(system.change_priority(id, 20, false), Err(ScoreError::InvalidPriority));
    assert_eq!(system.get_real_priority(id), Ok(6));
    assert_eq!(system.get_priority(id), Ok(6));

    assert_eq!(system.change_priority(id, 4, false), Ok(6));
    assert_eq!(system.get_real_priority(id), Ok(4));

    system.remove_helping_scheduler(id, tiny).unwrap();
    assert_eq!(system.change_priority(id, 20, false), Ok(4));
    assert_eq!(system.get_priority(id), Ok(20));
}
