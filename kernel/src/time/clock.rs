//! Watchdog directives, clock tick and thread delays

use core::sync::atomic::Ordering;

use crate::error::{Result, ScoreError};
use crate::processor::CpuIndex;
use crate::system::System;
use crate::thread::{BudgetAlgorithm, ThreadControl, ThreadId, ThreadStates, ThreadTimer, WaitStatus};

use super::{Watchdog, WatchdogClock, WatchdogRoutine, WatchdogState};

impl System {
    /// Current value of `clock` on `cpu`
    pub fn clock_now(&self, cpu: CpuIndex, clock: WatchdogClock) -> u64 {
        let ticks = self.cpu(cpu).map_or(0, |percpu| percpu.ticks());
        let monotonic = ticks.saturating_mul(self.config().nanoseconds_per_tick);
        match clock {
            WatchdogClock::Ticks => ticks,
            WatchdogClock::Monotonic => monotonic,
            WatchdogClock::Realtime => monotonic.saturating_add(self.realtime_offset.load(Ordering::Acquire)),
        }
    }

    /// New inactive watchdog in the `clock` header of `cpu`
    pub fn watchdog_initialize(&self, cpu: CpuIndex, clock: WatchdogClock, routine: WatchdogRoutine) -> Result<Watchdog> {
        let percpu = self.cpu(cpu).ok_or(ScoreError::InvalidNumber)?;
        let id = percpu.watchdog_header(clock).lock().initialize(routine);
        Ok(Watchdog { cpu, clock, id })
    }

    /// Schedule `watchdog` at absolute time `expire` of its clock
    pub fn watchdog_insert(&self, watchdog: &Watchdog, expire: u64) -> Result<()> {
        let percpu = self.cpu(watchdog.cpu).ok_or(ScoreError::InvalidNumber)?;
        percpu.watchdog_header(watchdog.clock).lock().insert(watchdog.id, expire)
    }

    /// Schedule a tick watchdog `ticks` from now; returns the expiry
    pub fn watchdog_insert_ticks(&self, watchdog: &Watchdog, ticks: u64) -> Result<u64> {
        if watchdog.clock != WatchdogClock::Ticks {
            return Err(ScoreError::InvalidNumber);
        }
        let percpu = self.cpu(watchdog.cpu).ok_or(ScoreError::InvalidNumber)?;
        let mut header = percpu.watchdog_header(WatchdogClock::Ticks).lock();
        let expire = percpu.ticks().saturating_add(ticks);
        header.insert(watchdog.id, expire)?;
        Ok(expire)
    }

    /// Deactivate `watchdog`; nothing happens if it is inactive
    pub fn watchdog_remove(&self, watchdog: &Watchdog) -> Result<()> {
        let percpu = self.cpu(watchdog.cpu).ok_or(ScoreError::InvalidNumber)?;
        percpu.watchdog_header(watchdog.clock).lock().remove(watchdog.id)
    }

    /// Remove and free `watchdog`
    pub fn watchdog_release(&self, watchdog: Watchdog) -> Result<()> {
        let percpu = self.cpu(watchdog.cpu).ok_or(ScoreError::InvalidNumber)?;
        percpu.watchdog_header(watchdog.clock).lock().release(watchdog.id)?;
        Ok(())
    }

    pub fn watchdog_state(&self, watchdog: &Watchdog) -> Result<WatchdogState> {
        let percpu = self.cpu(watchdog.cpu).ok_or(ScoreError::InvalidNumber)?;
        percpu.watchdog_header(watchdog.clock).lock().state(watchdog.id)
    }

    /// Earliest expiry of the `clock` header of `cpu`
    pub fn watchdog_next_expire(&self, cpu: CpuIndex, clock: WatchdogClock) -> Option<u64> {
        self.cpu(cpu)?.watchdog_header(clock).lock().first_expire()
    }

    /// Clock tick on `cpu`
    ///
    /// Fires every due watchdog of the processor, then charges the
    /// executing thread's time slice.
    pub fn clock_tick(&self, cpu: CpuIndex) {
        let Some(percpu) = self.cpu(cpu) else {
            return;
        };
        let dispatch = self.dispatch_disable();
        percpu.ticks.fetch_add(1, Ordering::AcqRel);

        for clock in WatchdogClock::ALL {
            let now = self.clock_now(cpu, clock);
            loop {
                let expired = percpu.watchdog_header(clock).lock().pop_expired(now);
                let Some((_, routine)) = expired else {
                    break;
                };
                self.run_watchdog(routine);
            }
        }

        self.charge_timeslice(cpu);
        drop(dispatch);
    }

    fn run_watchdog(&self, routine: WatchdogRoutine) {
        match routine {
            WatchdogRoutine::ThreadTimeout(thread) => self.thread_timeout(thread),
            WatchdogRoutine::Callback(callback) => callback(self),
        }
    }

    fn charge_timeslice(&self, cpu: CpuIndex) {
        let Some(executing) = self.cpus()[cpu].executing() else {
            return;
        };
        let Ok(thread) = self.threads().get(executing) else {
            return;
        };
        if thread.is_idle() {
            return;
        }

        let mut state = thread.scheduler.lock();
        if !state.preemptible || !state.states.is_ready() || state.budget != BudgetAlgorithm::ResetTimeslice {
            return;
        }
        state.cpu_time_budget = state.cpu_time_budget.saturating_sub(1);
        if state.cpu_time_budget == 0 {
            state.cpu_time_budget = self.config().ticks_per_timeslice;
            self.with_instance(thread.home(), |ops, cx| ops.yield_thread(cx, executing));
        }
    }

    /// End the timed wait of `id` with a timeout status
    fn thread_timeout(&self, id: ThreadId) {
        let Ok(thread) = self.threads().get(id) else {
            return;
        };
        let mut wait = thread.wait.lock();
        if !thread.states().is_blocked() {
            return;
        }
        wait.return_code = WaitStatus::Timeout;
        self.clear_state(&thread, ThreadStates::BLOCKED);
        drop(wait);
        log::trace!("thread {} timed out", id);
    }

    /// Block `id` for `ticks` clock ticks; zero ticks is a yield
    pub fn delay_ticks(&self, id: ThreadId, ticks: u64) -> Result<()> {
        if ticks == 0 {
            return self.yield_thread(id);
        }
        let thread = self.threads().get_user(id)?;
        let cpu = thread.cpu().unwrap_or_else(|| self.current_processor());
        let _dispatch = self.dispatch_disable();

        let watchdog = self.thread_timer(&thread, cpu)?;
        let mut wait = thread.wait.lock();
        wait.return_code = WaitStatus::Successful;
        self.set_state(&thread, ThreadStates::WAITING_FOR_TIME);
        self.watchdog_insert_ticks(&watchdog, ticks)?;
        drop(wait);
        Ok(())
    }

    /// Timeout watchdog of `thread` in the tick header of `cpu`
    fn thread_timer(&self, thread: &ThreadControl, cpu: CpuIndex) -> Result<Watchdog> {
        let previous = thread.wait.lock().timer;
        if let Some(timer) = previous {
            if timer.watchdog.cpu == cpu {
                self.watchdog_remove(&timer.watchdog)?;
                return Ok(timer.watchdog);
            }
            self.watchdog_release(timer.watchdog)?;
        }

        let watchdog = self.watchdog_initialize(cpu, WatchdogClock::Ticks, WatchdogRoutine::ThreadTimeout(thread.id()))?;
        thread.wait.lock().timer = Some(ThreadTimer { watchdog });
        Ok(watchdog)
    }
}
