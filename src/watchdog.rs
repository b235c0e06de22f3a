//! This module contains the type definitions necessary to stop a run of the
//! scheduler from outside.
//!
//! # Best-Effort Monitoring
//!
//! The scheduler only polls the watchdog between macro-steps, so a single
//! long-running statement or an expensive oracle query cannot be interrupted.

use std::{
    fmt::Debug,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crate::constant::DEFAULT_WATCHDOG_POLL_MACRO_STEPS;

/// A dynamically dispatched [`Watchdog`] instance.
pub type DynWatchdog = Rc<dyn Watchdog>;

/// The interface to an object that can be polled to see if the scheduler needs
/// to stop its run.
pub trait Watchdog
where
    Self: Debug,
{
    /// Checks if the scheduler should stop the run and return an error.
    #[must_use]
    fn should_stop(&self) -> bool;

    /// Gets the number of macro-steps the scheduler should wait between polls
    /// of the watchdog.
    #[must_use]
    fn poll_every(&self) -> usize;
}

/// A watchdog that never stops the scheduler.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LazyWatchdog;

impl LazyWatchdog {
    /// Wraps `self` into an [`Rc`].
    #[must_use]
    pub fn in_rc(self) -> Rc<dyn Watchdog> {
        Rc::new(self)
    }
}

impl Watchdog for LazyWatchdog {
    fn should_stop(&self) -> bool {
        false
    }

    fn poll_every(&self) -> usize {
        usize::MAX
    }
}

/// A watchdog that stops the scheduler once a shared flag is set.
///
/// It is polled every [`DEFAULT_WATCHDOG_POLL_MACRO_STEPS`] macro-steps unless
/// configured otherwise with [`Self::polling_every`].
#[derive(Clone, Debug)]
pub struct FlagWatchdog {
    /// The flag that is set from elsewhere, possibly another thread, to stop
    /// the run.
    flag: Arc<AtomicBool>,

    /// The number of macro-steps between polls.
    poll_macro_steps: usize,
}

impl FlagWatchdog {
    /// Constructs a new `FlagWatchdog` wrapping the provided `flag`.
    #[must_use]
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        let poll_macro_steps = DEFAULT_WATCHDOG_POLL_MACRO_STEPS;
        Self {
            flag,
            poll_macro_steps,
        }
    }

    /// Sets the number of macro-steps that the scheduler waits between polls.
    #[must_use]
    pub fn polling_every(mut self, macro_steps: usize) -> Self {
        self.poll_macro_steps = macro_steps;
        self
    }

    /// Wraps the watchdog into an [`Rc`].
    #[must_use]
    pub fn in_rc(self) -> Rc<dyn Watchdog> {
        Rc::new(self)
    }
}

impl Watchdog for FlagWatchdog {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn poll_every(&self) -> usize {
        self.poll_macro_steps
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use crate::watchdog::{FlagWatchdog, LazyWatchdog, Watchdog};

    #[test]
    fn flag_watchdog_follows_its_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let watchdog = FlagWatchdog::new(Arc::clone(&flag)).polling_every(4);

        assert!(!watchdog.should_stop());
        flag.store(true, Ordering::Relaxed);
        assert!(watchdog.should_stop());
        assert_eq!(watchdog.poll_every(), 4);
    }

    #[test]
    fn lazy_watchdog_never_stops() {
        assert!(!LazyWatchdog.should_stop());
    }
}
