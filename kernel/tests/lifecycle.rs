// tests/lifecycle.rs
// Cycle de vie des threads, ordonnanceurs auxiliaires et nœuds collants

mod common;

use common::*;
use score_kernel::{Configuration, ProcessorMask, SchedulerEntry, ScoreError, ThreadConfig, ThreadStates};

fn two_instances() -> Configuration {
    Configuration::builder()
        .maximum_processors(2)
        .scheduler(SchedulerEntry::simple(name(b"MAIN"), IDLE_PRIORITY))
        .scheduler(SchedulerEntry::simple(name(b"HELP"), IDLE_PRIORITY))
        .assign(0, 0, true)
        .assign(1, 1, false)
        .build()
        .unwrap()
}

#[test]
fn test_thread_starts_dormant() {
    let (system, port) = boot(1);
    let main = scheduler_id(&system, b"MAIN");
    let id = system.create_thread(ThreadConfig::new(name(b"DORM"), main, 3)).unwrap();

    let thread = system.threads().get(id).unwrap();
    assert!(thread.states().contains(ThreadStates::DORMANT));
    assert_eq!(system.suspend_thread(id), Ok(()));
    assert_eq!(system.resume_thread(id), Ok(()));
    assert!(thread.states().contains(ThreadStates::DORMANT));

    system.start_thread(id).unwrap();
    service(&system, &port);
    assert_eq!(system.cpus()[0].executing(), Some(id));
    assert_eq!(system.start_thread(id), Err(ScoreError::IncorrectState));
}

#[test]
fn test_suspend_resume_errors() {
    let (system, port) = boot(1);
    let main = scheduler_id(&system, b"MAIN");
    let id = spawn(&system, &port, main, 4, ProcessorMask::single(0));

    assert_eq!(system.resume_thread(id), Err(ScoreError::IncorrectState));
    system.suspend_thread(id).unwrap();
    assert_eq!(system.suspend_thread(id), Err(ScoreError::IncorrectState));
    service(&system, &port);
    assert_ne!(system.cpus()[0].executing(), Some(id));

    system.resume_thread(id).unwrap();
    service(&system, &port);
    assert_eq!(system.cpus()[0].executing(), Some(id));
}

#[test]
fn test_idle_threads_are_not_user_threads() {
    let (system, _port) = boot(1);
    let idle = system.cpus()[0].executing().unwrap();
    assert!(system.threads().get(idle).unwrap().is_idle());
    assert_eq!(system.suspend_thread(idle), Err(ScoreError::InvalidId));
    assert_eq!(system.delete_thread(idle), Err(ScoreError::InvalidId));
}

#[test]
fn test_delete_releases_processor_and_table_slot() {
    let config = Configuration::builder()
        .maximum_processors(1)
        .scheduler(SchedulerEntry::simple(name(b"MAIN"), IDLE_PRIORITY))
        .maximum_threads(1)
        .build()
        .unwrap();
    let (system, port) = boot_with(config);
    let main = scheduler_id(&system, b"MAIN");
    let id = spawn(&system, &port, main, 2, ProcessorMask::single(0));

    let extra = ThreadConfig::new(name(b"XTRA"), main, 2);
    assert_eq!(system.create_thread(extra), Err(ScoreError::TooMany));

    system.delay_ticks(id, 10).unwrap();
    system.delete_thread(id).unwrap();
    service(&system, &port);

    assert_eq!(system.threads().get(id).err(), Some(ScoreError::InvalidId));
    assert_eq!(system.watchdog_next_expire(0, score_kernel::WatchdogClock::Ticks), None);
    assert!(system.threads().get(system.cpus()[0].executing().unwrap()).unwrap().is_idle());
    assert!(!system.schedulers()[0].ready_order().contains(&id));
    assert!(system.create_thread(extra).is_ok());
}

#[test]
fn test_helping_scheduler_registration() {
    let (system, port) = boot_with(two_instances());
    let main = scheduler_id(&system, b"MAIN");
    let help = scheduler_id(&system, b"HELP");
    let id = spawn(&system, &port, main, 6, ProcessorMask::first_n(2));

    let thread = system.threads().get(id).unwrap();
    assert_eq!(thread.scheduler_nodes(), vec![0]);

    system.add_helping_scheduler(id, help).unwrap();
    assert_eq!(thread.scheduler_nodes(), vec![0, 1]);
    assert_eq!(system.add_helping_scheduler(id, help), Err(ScoreError::ResourceInUse));
    assert_eq!(system.add_helping_scheduler(id, main), Err(ScoreError::ResourceInUse));

    assert_eq!(system.remove_helping_scheduler(id, main), Err(ScoreError::IncorrectState));
    system.remove_helping_scheduler(id, help).unwrap();
    assert_eq!(thread.scheduler_nodes(), vec![0]);
    assert_eq!(system.remove_helping_scheduler(id, help), Err(ScoreError::IncorrectState));
}

#[test]
fn test_helping_rejects_invalid_priority() {
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
    let id = spawn(&system, &port, main, 20, ProcessorMask::first_n(2));

    assert_eq!(system.add_helping_scheduler(id, tiny), Err(ScoreError::InvalidPriority));
    assert_eq!(system.threads().get(id).unwrap().scheduler_nodes(), vec![0]);
}

#[test]
fn test_sticky_levels_nest() {
    let (system, port) = boot(1);
    let main = scheduler_id(&system, b"MAIN");
    let id = spawn(&system, &port, main, 5, ProcessorMask::single(0));

    assert_eq!(system.clean_sticky(id), Err(ScoreError::IncorrectState));
    assert_eq!(system.make_sticky(id), Ok(1));
    assert_eq!(system.make_sticky(id), Ok(2));
    assert_eq!(system.threads().get(id).unwrap().sticky_level(), 2);
    assert_eq!(system.clean_sticky(id), Ok(1));
    assert_eq!(system.clean_sticky(id), Ok(0));
}

#[test]
fn test_sticky_thread_keeps_processor_while_blocked() {
    let (system, port) = boot(1);
    let main = scheduler_id(&system, b"MAIN");
    let owner = spawn(&system, &port, main, 5, ProcessorMask::single(0));
    let other = spawn(&system, &port, main, 8, ProcessorMask::single(0));

    system.make_sticky(owner).unwrap();
    system.suspend_thread(owner).unwrap();
    service(&system, &port);
    assert_ne!(system.cpus()[0].executing(), Some(other));
    assert!(system.threads().get(system.cpus()[0].executing().unwrap()).unwrap().is_idle());

    system.clean_sticky(owner).unwrap();
    service(&system, &port);
    assert_eq!(system.cpus()[0].executing(), Some(other));
}

#[test]
fn test_affinity_must_overlap_home_processors() {
    let (system, port) = boot_with(two_instances());
    let main = scheduler_id(&system, b"MAIN");
    let id = spawn(&system, &port, main, 6, ProcessorMask::first_n(2));

    assert_eq!(system.set_affinity(id, ProcessorMask::single(1)), Err(ScoreError::InvalidNumber));
    assert_eq!(system.set_affinity(id, ProcessorMask::single(0)), Ok(()));
    assert_eq!(system.threads().get(id).unwrap().affinity(), ProcessorMask::single(0));

    let pinned = ThreadConfig::new(name(b"PIN1"), main, 6).affinity(ProcessorMask::single(1));
    assert_eq!(system.create_thread(pinned), Err(ScoreError::InvalidNumber));
}

#[test]
fn test_delete_after_timeout_releases_timer() {
    let (system, port) = boot(1);
    let main = scheduler_id(&system, b"MAIN");
    let sleeper = spawn(&system, &port, main, 3, ProcessorMask::single(0));

    system.delay_ticks(sleeper, 1).unwrap();
    system.clock_tick(0);
    service(&system, &port);
    assert_eq!(system.cpus()[0].executing(), Some(sleeper));

    system.delete_thread(sleeper).unwrap();
    service(&system, &port);
    assert!(system.threads().get(system.cpus()[0].executing().unwrap()).unwrap().is_idle());

    let next = spawn(&system, &port, main, 3, ProcessorMask::single(0));
    system.delay_ticks(next, 2).unwrap();
    assert_eq!(system.watchdog_next_expire(0, score_kernel::WatchdogClock::Ticks), Some(3));
}
