//! Busy waiting on a free running processor counter

/// Free running counter of the processor (wraps at `u32::MAX`)
pub trait CpuCounter {
    fn read(&self) -> u32;

    /// Counter frequency in Hz
    fn frequency(&self) -> u32;
}

/// Ticks from `first` to `second`, across one wrap-around
#[inline]
pub fn counter_difference(second: u32, first: u32) -> u32 {
    second.wrapping_sub(first)
}

/// Counter ticks of at least `nanoseconds`
pub fn counter_nanoseconds_to_ticks<C: CpuCounter + ?Sized>(counter: &C, nanoseconds: u32) -> u32 {
    let ticks = (u64::from(counter.frequency()) * u64::from(nanoseconds) + 999_999_999) / 1_000_000_000;
    ticks.min(u64::from(u32::MAX)) as u32
}

/// Spin until the counter advanced by at least `ticks`
pub fn counter_delay_ticks<C: CpuCounter + ?Sized>(counter: &C, ticks: u32) {
    let mut remaining = ticks;
    let mut delta = 0u32;
    let mut last = counter.read();

    loop {
        remaining = remaining.saturating_sub(delta);
        let now = counter.read();
        delta = counter_difference(now, last);
        last = now;
        if remaining <= delta {
            break;
        }
        core::hint::spin_loop();
    }
}

pub fn counter_delay_nanoseconds<C: CpuCounter + ?Sized>(counter: &C, nanoseconds: u32) {
    counter_delay_ticks(counter, counter_nanoseconds_to_ticks(counter, nanoseconds));
}
