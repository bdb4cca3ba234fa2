//! Link monitor implementation
//!
//! The monitor is driven by elapsed time from the clock loop. It never
//! blocks; it only tells the loop what link work is due, and only when the
//! loop reports an idle window long enough to do it.

use crate::config::LinkConfig;

/// Link health
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// Heartbeats arriving and the bridge reports the message bus connected
    Up,
    /// Heartbeats arriving but the bridge has lost the message bus
    BusDown,
    /// Too many heartbeats missed
    Lost,
}

/// Link work the clock loop should do now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkAction {
    None,
    /// Ask the bridge for a new NTP sample
    RequestTime,
    /// Ask the bridge to re-establish the message bus
    Reconnect,
}

/// Heartbeat, reconnect and resync bookkeeping
#[derive(Debug, Clone)]
pub struct LinkMonitor {
    config: LinkConfig,
    /// Missed heartbeat count
    missed_heartbeats: u8,
    /// Time since last heartbeat (ms)
    since_heartbeat_ms: u32,
    bus_connected: bool,
    /// Time since the last time sample, `None` before the first one
    since_sample_ms: Option<u32>,
    since_time_request_ms: u32,
    since_reconnect_ms: u32,
}

impl LinkMonitor {
    /// Create a monitor for a link that has not been heard from yet
    ///
    /// The bus is assumed up until the bridge says otherwise; requests are
    /// allowed straight away.
    pub fn new(config: LinkConfig) -> Self {
        Self {
            missed_heartbeats: 0,
            since_heartbeat_ms: 0,
            bus_connected: true,
            since_sample_ms: None,
            since_time_request_ms: config.reconnect_backoff_ms,
            since_reconnect_ms: config.reconnect_backoff_ms,
            config,
        }
    }

    /// Update time tracking
    ///
    /// # Arguments
    /// - `delta_ms`: Time elapsed since last update
    pub fn update_time(&mut self, delta_ms: u32) {
        self.since_heartbeat_ms = self.since_heartbeat_ms.saturating_add(delta_ms);
        while self.since_heartbeat_ms >= self.config.heartbeat_timeout_ms {
            self.missed_heartbeats = self.missed_heartbeats.saturating_add(1);
            self.since_heartbeat_ms -= self.config.heartbeat_timeout_ms;
        }

        self.since_sample_ms = self.since_sample_ms.map(|ms| ms.saturating_add(delta_ms));
        self.since_time_request_ms = self.since_time_request_ms.saturating_add(delta_ms);
        self.since_reconnect_ms = self.since_reconnect_ms.saturating_add(delta_ms);
    }

    /// Record a heartbeat
    ///
    /// Returns `true` if this brought a lost link back.
    pub fn heartbeat_received(&mut self) -> bool {
        let was_lost = self.check() == LinkStatus::Lost;
        self.missed_heartbeats = 0;
        self.since_heartbeat_ms = 0;
        was_lost && self.check() == LinkStatus::Up
    }

    /// Record the bridge's message bus state
    ///
    /// Returns `true` if the link is now up and was not before.
    pub fn bus_state(&mut self, connected: bool) -> bool {
        let was_up = self.check() == LinkStatus::Up;
        self.bus_connected = connected;
        // Any frame from the bridge proves the serial side is alive
        self.missed_heartbeats = 0;
        self.since_heartbeat_ms = 0;
        !was_up && self.check() == LinkStatus::Up
    }

    /// Record a time sample
    pub fn time_sample_received(&mut self) {
        self.since_sample_ms = Some(0);
    }

    pub fn check(&self) -> LinkStatus {
        if self.missed_heartbeats >= self.config.max_missed_heartbeats {
            LinkStatus::Lost
        } else if !self.bus_connected {
            LinkStatus::BusDown
        } else {
            LinkStatus::Up
        }
    }

    pub fn is_link_healthy(&self) -> bool {
        self.check() == LinkStatus::Up
    }

    pub fn missed_heartbeats(&self) -> u8 {
        self.missed_heartbeats
    }

    /// Whether a time sample is due, either never received or past the
    /// resync interval
    pub fn time_sample_due(&self) -> bool {
        self.since_sample_ms
            .map_or(true, |ms| ms >= self.config.resync_interval_ms)
    }

    /// Pick the link work to do now
    ///
    /// `idle_window` says whether the clock loop has enough slack before
    /// the next pulse. Each kind of request is retried no more often than
    /// the reconnect backoff.
    pub fn poll_action(&mut self, idle_window: bool) -> LinkAction {
        if !idle_window {
            return LinkAction::None;
        }

        if self.check() != LinkStatus::Up {
            if self.since_reconnect_ms >= self.config.reconnect_backoff_ms {
                self.since_reconnect_ms = 0;
                return LinkAction::Reconnect;
            }
            return LinkAction::None;
        }

        if self.time_sample_due() && self.since_time_request_ms >= self.config.reconnect_backoff_ms
        {
            self.since_time_request_ms = 0;
            return LinkAction::RequestTime;
        }
        LinkAction::None
    }
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new(LinkConfig::default())
    }
}
