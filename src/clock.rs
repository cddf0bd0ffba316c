// Live clock display

use chrono::Local;
use chrono::format::{Item, StrftimeItems};
use eyre::{Result, eyre};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::task::DISPLAY_FORMAT;

const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Upper bound on how long a stop request can go unnoticed
const STOP_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct Clock {
    format: String,
    interval: Duration,
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            format: DISPLAY_FORMAT.to_string(),
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
        }
    }
}

impl Clock {
    /// Build a clock with a `strftime` format and tick interval
    pub fn new(format: impl Into<String>, interval: Duration) -> Result<Self> {
        let format = format.into();
        if interval.is_zero() {
            return Err(eyre!("Clock interval must be greater than zero"));
        }
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(eyre!("Invalid clock format: {}", format));
        }
        Ok(Self { format, interval })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Current local time in this clock's format
    pub fn now_string(&self) -> String {
        Local::now().format(&self.format).to_string()
    }

    /// Start a fresh tick sequence; the first item is immediate
    pub fn ticks(&self) -> Ticks {
        Ticks {
            clock: self.clone(),
            started: false,
        }
    }
}

/// Infinite iterator of formatted timestamps
pub struct Ticks {
    clock: Clock,
    started: bool,
}

impl Iterator for Ticks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.started {
            thread::sleep(self.clock.interval);
        }
        self.started = true;
        Some(self.clock.now_string())
    }
}

/// Runs a tick callback on a background thread until stopped or dropped.
///
/// Once `stop` returns (or the guard is dropped) the callback never runs again.
pub struct ClockGuard {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ClockGuard {
    pub fn start<F>(clock: Clock, mut on_tick: F) -> Self
    where
        F: FnMut(String) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let poll = clock.interval.min(STOP_POLL);
            let mut next_tick = Instant::now();

            loop {
                if stop_clone.load(Ordering::SeqCst) {
                    break;
                }

                if Instant::now() >= next_tick {
                    on_tick(clock.now_string());
                    next_tick += clock.interval;

                    // Skip missed ticks instead of firing them back-to-back
                    let now = Instant::now();
                    if next_tick <= now {
                        next_tick = now + clock.interval;
                    }
                }

                thread::sleep(poll);
            }
            debug!("clock: ticker stopped");
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.stop.load(Ordering::SeqCst)
    }

    /// Stop the ticker and wait for its thread to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ClockGuard {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn fast_clock() -> Clock {
        Clock::new("%H:%M:%S%.3f", Duration::from_millis(10)).unwrap()
    }

    #[test]
    fn test_default_clock() {
        let clock = Clock::default();
        assert_eq!(clock.interval(), Duration::from_secs(1));
        assert_eq!(clock.format(), DISPLAY_FORMAT);
        assert!(!clock.now_string().is_empty());
    }

    #[test]
    fn test_new_rejects_bad_input() {
        assert!(Clock::new("%H", Duration::ZERO).is_err());
        assert!(Clock::new("bogus %", Duration::from_secs(1)).is_err());
        assert!(Clock::new("%Y-%m-%d", Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_ticks_are_paced() {
        let clock = fast_clock();
        let start = Instant::now();

        let ticks: Vec<String> = clock.ticks().take(3).collect();

        assert_eq!(ticks.len(), 3);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_ticks_restart_immediately() {
        let clock = Clock::new("%S", Duration::from_secs(60)).unwrap();
        let start = Instant::now();

        let first = clock.ticks().next();
        let again = clock.ticks().next();

        assert!(first.is_some());
        assert!(again.is_some());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_guard_ticks_and_stops() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let guard = ClockGuard::start(fast_clock(), move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert!(guard.is_running());

        thread::sleep(Duration::from_millis(100));
        guard.stop();

        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop >= 2, "expected multiple ticks, got {}", after_stop);

        thread::sleep(Duration::from_millis(50));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_guard_skips_ticks_missed_by_slow_callback() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = Arc::clone(&calls);
        let clock = Clock::new("%S", Duration::from_millis(100)).unwrap();

        let guard = ClockGuard::start(clock, move |_| {
            let mut calls = calls_clone.lock().unwrap();
            calls.push(Instant::now());
            if calls.len() == 1 {
                drop(calls);
                thread::sleep(Duration::from_millis(350));
            }
        });
        thread::sleep(Duration::from_millis(700));
        guard.stop();

        // Catching up would fire at 100, 200 and 300 ms right after the slow call
        let calls = calls.lock().unwrap();
        assert!(calls.len() >= 2, "no tick after the slow one");
        assert!(calls.len() <= 5, "burst of {} ticks", calls.len());
        assert!(calls[1] - calls[0] >= Duration::from_millis(400));
    }

    #[test]
    fn test_guard_drop_stops_ticker() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        {
            let _guard = ClockGuard::start(fast_clock(), move |s| {
                seen_clone.lock().unwrap().push(s);
            });
            thread::sleep(Duration::from_millis(50));
        }

        let after_drop = seen.lock().unwrap().len();
        assert!(after_drop >= 1);

        thread::sleep(Duration::from_millis(50));
        assert_eq!(seen.lock().unwrap().len(), after_drop);
    }
}
