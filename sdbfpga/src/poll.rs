//! Polling hardware status with a bounded number of waits
use std::time::Duration;

/// Something that can block the caller for a while. Abstracted so simulated hardware can be
/// polled without real delays.
pub trait Sleep {
    fn sleep(&mut self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Default, Copy, Clone)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// A sleeper that returns immediately, remembering every nap it was asked to take
#[derive(Debug, Default, Clone)]
pub struct RecordingSleep {
    pub naps: Vec<Duration>,
}

impl RecordingSleep {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of naps of exactly `duration`
    #[must_use]
    pub fn count(&self, duration: Duration) -> usize {
        self.naps.iter().filter(|&&d| d == duration).count()
    }

    /// Total time that would have been slept
    #[must_use]
    pub fn total(&self) -> Duration {
        self.naps.iter().sum()
    }
}

impl Sleep for RecordingSleep {
    fn sleep(&mut self, duration: Duration) {
        self.naps.push(duration);
    }
}

impl<S> Sleep for &mut S
where
    S: Sleep + ?Sized,
{
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration);
    }
}

/// The outcome of a single poll
#[derive(Debug, PartialEq, Eq)]
pub enum Poll<T> {
    /// The condition was met
    Ready(T),
    /// Nothing changed
    Pending,
    /// Not done yet, but something changed, so the idle budget starts over
    Progress,
}

/// How often to poll and how many idle intervals to tolerate before giving up
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Wait {
    pub interval: Duration,
    pub max_polls: usize,
}

impl Wait {
    #[must_use]
    pub const fn new(interval: Duration, max_polls: usize) -> Self {
        Self {
            interval,
            max_polls,
        }
    }

    /// Longest idle stretch this wait tolerates
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.interval * u32::try_from(self.max_polls).unwrap_or(u32::MAX)
    }

    /// Call `poll` until it is ready, sleeping `interval` after every unfinished poll.
    ///
    /// Returns `Ok(None)` once `max_polls` consecutive intervals pass without progress.
    /// Timeouts are counted in whole intervals; the time spent inside `poll` is not included.
    /// # Errors
    /// Returns the first error `poll` returns
    pub fn until<T, E, S, F>(&self, sleeper: &mut S, mut poll: F) -> Result<Option<T>, E>
    where
        S: Sleep + ?Sized,
        F: FnMut() -> Result<Poll<T>, E>,
    {
        let mut idle = 0;
        loop {
            match poll()? {
                Poll::Ready(v) => return Ok(Some(v)),
                Poll::Progress => idle = 0,
                Poll::Pending => {}
            }
            if idle >= self.max_polls {
                return Ok(None);
            }
            sleeper.sleep(self.interval);
            idle += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    #[test]
    fn test_ready_after_pending() {
        let mut sleeper = RecordingSleep::new();
        let mut polls = 0;
        let res: Result<_, ()> = Wait::new(SECOND, 50).until(&mut sleeper, || {
            polls += 1;
            Ok(if polls == 4 { Poll::Ready(polls) } else { Poll::Pending })
        });
        assert_eq!(res, Ok(Some(4)));
        assert_eq!(sleeper.count(SECOND), 3);
    }

    #[test]
    fn test_timeout() {
        let mut sleeper = RecordingSleep::new();
        let res: Result<Option<()>, ()> =
            Wait::new(SECOND, 50).until(&mut sleeper, || Ok(Poll::Pending));
        assert_eq!(res, Ok(None));
        assert_eq!(sleeper.naps.len(), 50);
        assert_eq!(sleeper.total(), Wait::new(SECOND, 50).budget());
    }

    #[test]
    fn test_progress_resets_budget() {
        let mut sleeper = RecordingSleep::new();
        let mut polls = 0;
        let res: Result<Option<()>, ()> = Wait::new(SECOND, 2).until(&mut sleeper, || {
            polls += 1;
            Ok(if polls == 2 { Poll::Progress } else { Poll::Pending })
        });
        assert_eq!(res, Ok(None));
        // One idle interval, then progress restarts the budget of two
        assert_eq!(sleeper.naps.len(), 3);
    }

    #[test]
    fn test_error_stops_polling() {
        let mut sleeper = RecordingSleep::new();
        let res: Result<Option<()>, &str> =
            Wait::new(SECOND, 10).until(&mut sleeper, || Err("bus"));
        assert_eq!(res, Err("bus"));
        assert!(sleeper.naps.is_empty());
    }

    #[test]
    fn test_zero_budget_polls_once() {
        let mut sleeper = RecordingSleep::new();
        let res: Result<Option<()>, ()> =
            Wait::new(SECOND, 0).until(&mut sleeper, || Ok(Poll::Pending));
        assert_eq!(res, Ok(None));
        assert!(sleeper.naps.is_empty());
    }
}
