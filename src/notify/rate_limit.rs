//! Pacing of dispatch calls.
//!
//! Models a fixed-window bucket: after every call the dispatcher waits the
//! minimum interval, and after every `burst_size`-th call it also waits the
//! extended burst pause. The counter lives for one run only.

use std::time::Duration;

use crate::models::RateLimitConfig;

/// Pause owed after a dispatch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// Regular spacing
    Spacing(Duration),
    /// Spacing plus the burst pause
    Extended(Duration),
}

impl Pause {
    pub fn duration(&self) -> Duration {
        match self {
            Pause::Spacing(d) | Pause::Extended(d) => *d,
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, Pause::Extended(_))
    }
}

/// Per-run dispatch call counter and pacer.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    calls: u64,
    extended_pauses: u64,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            calls: 0,
            extended_pauses: 0,
        }
    }

    /// Count one dispatch call and return the pause it owes.
    pub fn record_call(&mut self) -> Pause {
        self.calls += 1;
        let spacing = self.config.min_interval();
        let burst = self.config.burst_size.max(1);

        if self.calls % burst == 0 {
            self.extended_pauses += 1;
            Pause::Extended(spacing + self.config.burst_pause())
        } else {
            Pause::Spacing(spacing)
        }
    }

    /// Count one dispatch call and sleep for the pause it owes.
    pub async fn pace(&mut self) -> Pause {
        let pause = self.record_call();
        if pause.is_extended() {
            log::info!(
                "Dispatched {} messages, pausing {}s",
                self.calls,
                pause.duration().as_secs()
            );
        }
        if !pause.duration().is_zero() {
            tokio::time::sleep(pause.duration()).await;
        }
        pause
    }

    /// Dispatch calls counted so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    pub fn extended_pauses(&self) -> u64 {
        self.extended_pauses
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
