//! Single-threaded event reactor serializing all monitor work.
//!
//! Every mutation of the monitor happens on the thread running
//! [`Reactor::run`]; encoder threads, consoles and signal handlers only
//! enqueue events. Poll ticks fire through `recv_timeout` against the
//! current deadline, so an encoder edge and a poll tick can interleave in
//! either order but never overlap.

use crate::MotionMonitor;
use crate::error::Result;
use crate::timer::{Deadline, PollTimer};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use filawatch_traits::{PositionSource, PresenceSink};
use std::time::Instant;

/// Inputs to the reactor's single timeline.
#[derive(Debug)]
pub enum Event {
    /// The extruder position source is trustworthy from now on; arms the
    /// monitor. Edges arriving before this are tolerated no-ops.
    Ready,
    /// Raw encoder switch edge.
    EncoderEdge { at: Instant, level: bool },
    /// The machine started actively extruding; polling resumes immediately.
    PrintingStarted,
    /// The machine went idle/ready; polling parks until the next start.
    PrintingStopped,
    Command(Command),
    Shutdown,
}

/// Operator commands with their reply channels.
#[derive(Debug)]
pub enum Command {
    QueryStats { reply: Sender<String> },
    ResetStats { reply: Sender<String> },
    SetDetectionLength { value: f64, reply: Sender<String> },
    QueryStatus { reply: Sender<String> },
}

pub struct Reactor<P: PositionSource, N: PresenceSink> {
    monitor: MotionMonitor<P, N>,
    timer: PollTimer,
    events: Receiver<Event>,
}

impl<P: PositionSource, N: PresenceSink> Reactor<P, N> {
    pub fn new(monitor: MotionMonitor<P, N>, events: Receiver<Event>) -> Self {
        Self {
            monitor,
            timer: PollTimer::new(),
            events,
        }
    }

    /// Drain events and poll deadlines until shutdown or channel close.
    /// Returns the monitor so callers can inspect or report final state.
    pub fn run(mut self) -> Result<MotionMonitor<P, N>> {
        loop {
            let received = match self.timer.next_fire() {
                Deadline::Never => match self.events.recv() {
                    Ok(ev) => Some(ev),
                    Err(_) => break,
                },
                Deadline::At(at) => {
                    let now = self.monitor.clock.now();
                    if at <= now {
                        None
                    } else {
                        match self.events.recv_timeout(at - now) {
                            Ok(ev) => Some(ev),
                            Err(RecvTimeoutError::Timeout) => None,
                            Err(RecvTimeoutError::Disconnected) => break,
                        }
                    }
                }
            };
            match received {
                None => {
                    let now = self.monitor.clock.now();
                    let next = self.monitor.on_poll_tick(now);
                    self.timer.reschedule(next);
                }
                Some(Event::Shutdown) => {
                    tracing::debug!("reactor shutting down");
                    break;
                }
                Some(event) => self.handle(event)?,
            }
        }
        Ok(self.monitor)
    }

    fn handle(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Ready => self.monitor.arm()?,
            Event::EncoderEdge { at, level } => self.monitor.note_encoder_event(at, level),
            Event::PrintingStarted => {
                if self.monitor.is_armed() {
                    self.timer.resume(self.monitor.clock.now());
                    tracing::debug!("runout polling resumed");
                } else {
                    tracing::warn!("printing started before arm; polling not scheduled");
                }
            }
            Event::PrintingStopped => {
                self.timer.park();
                tracing::debug!("runout polling parked");
            }
            Event::Command(cmd) => self.handle_command(cmd),
            // Intercepted in run(); nothing to do if it slips through.
            Event::Shutdown => {}
        }
        Ok(())
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::QueryStats { reply } => {
                let _ = reply.send(self.monitor.report());
            }
            Command::ResetStats { reply } => {
                self.monitor.reset_stats();
                let _ = reply.send("Stats Reset".to_string());
            }
            Command::SetDetectionLength { value, reply } => {
                let msg = match self.monitor.set_detection_length(value) {
                    Ok(()) => format!(
                        "Detection length set to {value:.2} (reverts on restart)"
                    ),
                    Err(e) => format!("Error: {e}"),
                };
                let _ = reply.send(msg);
            }
            Command::QueryStatus { reply } => {
                let lines: Vec<String> = self
                    .monitor
                    .status()
                    .iter()
                    .map(|(key, value)| format!("{key}: {value}"))
                    .collect();
                let _ = reply.send(lines.join("\n"));
            }
        }
    }
}
