//! Thread states
//!
//! A thread is ready when no state bit is set. Setting the first bit takes
//! it out of its scheduler's ready set, clearing the last one puts it back.

use bitflags::bitflags;

bitflags! {
    /// Blocking states of a thread
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ThreadStates: u32 {
        /// Created, not started yet
        const DORMANT               = 0b0000_0001;
        const SUSPENDED             = 0b0000_0010;
        const WAITING_FOR_TIME      = 0b0000_0100;
        const WAITING_FOR_EVENT     = 0b0000_1000;
        const WAITING_FOR_SEMAPHORE = 0b0001_0000;
        /// Being deleted
        const ZOMBIE                = 0b1000_0000;

        const BLOCKED = Self::WAITING_FOR_TIME.bits()
            | Self::WAITING_FOR_EVENT.bits()
            | Self::WAITING_FOR_SEMAPHORE.bits();
    }
}

impl ThreadStates {
    pub const READY: ThreadStates = ThreadStates::empty();

    pub fn is_ready(self) -> bool {
        self.is_empty()
    }

    pub fn is_blocked(self) -> bool {
        self.intersects(Self::BLOCKED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_is_empty_set() {
        assert!(ThreadStates::READY.is_ready());
        assert!(!ThreadStates::DORMANT.is_ready());
        assert!(ThreadStates::WAITING_FOR_EVENT.is_blocked());
        assert!(!ThreadStates::SUSPENDED.is_blocked());

        let mut states = ThreadStates::SUSPENDED | ThreadStates::WAITING_FOR_TIME;
        states.remove(ThreadStates::BLOCKED);
        assert_eq!(states, ThreadStates::SUSPENDED);
    }
}
