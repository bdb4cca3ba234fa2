//! Clock task
//!
//! Steps the synchronizer, services the bridge link between pulses, and
//! reports clock events back over the link.

use core::fmt::Write as _;

use defmt::*;
use embassy_rp::gpio::Output;
use embassy_time::{Delay, Instant, Timer};
use heapless::String;

use escapement_core::config::LinkConfig;
use escapement_core::{ClockEvent, LinkAction, LinkMonitor, Synchronizer, TickMode};
use escapement_drivers::coil::GpioCoil;
use escapement_drivers::time::AnchoredTime;
use escapement_protocol::{BridgeMessage, ClockMessage, Frame};

use crate::link::BridgeLink;
use crate::time::EmbassyClock;

/// Longest sleep between steps, bounds command latency
const MAX_POLL_MS: u32 = 50;

/// Longest log line forwarded to the bridge
const LOG_LINE_LEN: usize = 96;

pub type Clock = Synchronizer<
    GpioCoil<Output<'static>, Output<'static>, Delay>,
    AnchoredTime<EmbassyClock>,
    EmbassyClock,
>;

#[embassy_executor::task]
pub async fn clock_task(mut clock: Clock, mut link: BridgeLink, link_config: LinkConfig) {
    info!("Clock task started");

    let mut monitor = LinkMonitor::new(link_config);
    let mut last_update = Instant::now();
    publish_mode(&mut link, clock.state().current_mode());

    loop {
        while let Some(frame) = link.next_frame() {
            match frame {
                Ok(frame) => handle_frame(&frame, &mut clock, &mut monitor, &mut link),
                Err(e) => warn!("Frame parse error: {:?}", e),
            }
        }

        let step = clock.step();
        while let Some(event) = clock.next_event() {
            report_event(&event, &mut link);
        }
        let dropped = clock.take_dropped_events();
        if dropped > 0 {
            warn!("Event queue overflowed, {} events lost", dropped);
        }

        let now = Instant::now();
        let elapsed = u32::try_from((now - last_update).as_millis()).unwrap_or(u32::MAX);
        last_update = now;
        monitor.update_time(elapsed);

        let idle_window = step.allows_blocking_work(link_config.min_idle_slack_ms);
        match monitor.poll_action(idle_window) {
            LinkAction::RequestTime => {
                debug!("Requesting time sample");
                send(&mut link, &ClockMessage::TimeRequest);
            }
            LinkAction::Reconnect => {
                warn!("Bridge link down, requesting reconnect");
                send(&mut link, &ClockMessage::Reconnect);
            }
            LinkAction::None => {}
        }

        let wait_ms = step.poll_after_ms(MAX_POLL_MS);
        if wait_ms > 0 {
            Timer::after_millis(u64::from(wait_ms)).await;
        }
    }
}

fn handle_frame(frame: &Frame, clock: &mut Clock, monitor: &mut LinkMonitor, link: &mut BridgeLink) {
    let message = match BridgeMessage::from_frame(frame) {
        Ok(message) => message,
        Err(e) => {
            warn!("Failed to parse bridge message: {:?}", e);
            return;
        }
    };

    match message {
        BridgeMessage::Command(payload) => {
            // Rejections come back through the event queue
            if clock.handle_bytes(payload).is_ok() {
                debug!("Command accepted");
            }
        }
        BridgeMessage::TimeSync(sample) => {
            match clock.time_source_mut().sync_ntp(
                sample.ntp_seconds,
                sample.ntp_fraction,
                sample.round_trip_ms,
            ) {
                Ok(unix_ms) => {
                    monitor.time_sample_received();
                    info!("Time synced: {} ms", unix_ms);
                }
                Err(e) => warn!("Time sample rejected: {:?}", e),
            }
        }
        BridgeMessage::Ping => {
            trace!("PING received");
            send(link, &ClockMessage::Pong);
            if monitor.heartbeat_received() {
                info!("Bridge link recovered");
                publish_mode(link, clock.state().current_mode());
            }
        }
        BridgeMessage::BusState { connected } => {
            if monitor.bus_state(connected) {
                info!("Message bus connected");
                publish_mode(link, clock.state().current_mode());
            } else if !connected {
                warn!("Message bus disconnected");
            }
        }
    }
}

fn report_event(event: &ClockEvent, link: &mut BridgeLink) {
    match event {
        ClockEvent::Boundary { .. } | ClockEvent::RevolutionComplete { .. } => {
            debug!("{}", event)
        }
        ClockEvent::ScheduleRejected(_)
        | ClockEvent::TimeSyncDegraded
        | ClockEvent::CommandRejected(_) => warn!("{}", event),
        _ => info!("{}", event),
    }

    match event {
        ClockEvent::ModeChanged(change) => publish_mode(link, change.to),
        ClockEvent::Started { mode, .. } => publish_mode(link, *mode),
        _ => {}
    }

    let mut line: String<LOG_LINE_LEN> = String::new();
    // An overlong line is sent truncated
    let _ = write!(line, "{}", event);
    send(link, &ClockMessage::Log(&line));
}

/// Publish the active mode as retained status
fn publish_mode(link: &mut BridgeLink, mode: TickMode) {
    send(
        link,
        &ClockMessage::Mode {
            name: mode.name(),
            retained: true,
        },
    );
}

fn send(link: &mut BridgeLink, message: &ClockMessage<'_>) {
    if let Err(e) = link.send(message) {
        warn!("Failed to send to bridge: {:?}", e);
    }
}
