//! Merges bursts of update requests into a single render pass.
//!
//! [`CoalesceState`] holds the merge rules and is driven with explicit
//! instants, so it can be stepped deterministically. [`RenderCoalescer`]
//! wraps it with a timer thread that only ever reports "deadline reached for
//! epoch N"; the owner decides on its own thread whether that epoch is still
//! the current one.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// What a render pass has to do. Merged requests OR their flags together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateFlags {
    /// Re-render the map composition
    pub render: bool,
    /// Redraw the vector layer being edited
    pub render_vector: bool,
}

impl UpdateFlags {
    pub fn new(render: bool, render_vector: bool) -> Self {
        Self {
            render,
            render_vector,
        }
    }

    pub fn merge(&mut self, other: UpdateFlags) {
        self.render |= other.render;
        self.render_vector |= other.render_vector;
    }
}

/// Result of submitting a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Negative delay: run now with the merged flags
    RunNow(UpdateFlags),
    /// A timer for `epoch` must fire at `deadline`; older epochs are stale
    Scheduled { epoch: u64, deadline: Instant },
}

/// Pending merge state: Idle when no epoch is armed, Pending otherwise
#[derive(Debug, Clone, Default)]
pub struct CoalesceState {
    flags: UpdateFlags,
    delay: Duration,
    last_request: Option<Instant>,
    armed: Option<u64>,
    epoch: u64,
}

impl CoalesceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges one request.
    ///
    /// While a timer is armed the smaller of the pending and the new delay
    /// wins; the deadline is always measured from the latest request.
    pub fn request(&mut self, flags: UpdateFlags, delay_ms: i64, now: Instant) -> Admission {
        self.flags.merge(flags);
        self.last_request = Some(now);

        if delay_ms < 0 {
            return Admission::RunNow(self.take());
        }

        let delay = Duration::from_millis(delay_ms as u64);
        if self.armed.is_none() || delay < self.delay {
            self.delay = delay;
        }

        self.epoch += 1;
        self.armed = Some(self.epoch);
        Admission::Scheduled {
            epoch: self.epoch,
            deadline: now + self.delay,
        }
    }

    /// Called when the timer of `epoch` expires. Returns the merged flags if
    /// that epoch is still current and its deadline has passed.
    pub fn fire(&mut self, epoch: u64, now: Instant) -> Option<UpdateFlags> {
        if self.armed != Some(epoch) {
            log::trace!("dropping stale render timer {}", epoch);
            return None;
        }
        match self.deadline() {
            Some(deadline) if now >= deadline => Some(self.take()),
            _ => None,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed?;
        self.last_request.map(|t| t + self.delay)
    }

    pub fn is_pending(&self) -> bool {
        self.armed.is_some()
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch
    }

    pub fn pending_flags(&self) -> UpdateFlags {
        self.flags
    }

    /// Back to Idle, handing out the accumulated flags
    fn take(&mut self) -> UpdateFlags {
        self.armed = None;
        std::mem::take(&mut self.flags)
    }
}

#[derive(Debug)]
enum TimerCommand {
    Arm { epoch: u64, deadline: Instant },
}

/// Timer thread plus the merge state it serves.
///
/// The thread never runs the render itself: it posts expired epochs on a
/// channel that the owner drains with [`poll`](Self::poll).
#[derive(Debug)]
pub struct RenderCoalescer {
    state: CoalesceState,
    command_tx: Option<Sender<TimerCommand>>,
    fired_rx: Receiver<u64>,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl RenderCoalescer {
    pub fn new() -> Self {
        let (command_tx, command_rx) = unbounded();
        let (fired_tx, fired_rx) = unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_shutdown = shutdown.clone();

        let worker = thread::Builder::new()
            .name("render-coalescer".into())
            .spawn(move || timer_loop(command_rx, fired_tx, worker_shutdown))
            .map_err(|e| log::error!("failed to start render timer thread: {}", e))
            .ok();

        Self {
            state: CoalesceState::new(),
            command_tx: Some(command_tx),
            fired_rx,
            shutdown,
            worker,
        }
    }

    /// Submits a request. Returns flags to run right away for negative delays.
    pub fn request(&mut self, flags: UpdateFlags, delay_ms: i64) -> Option<UpdateFlags> {
        match self.state.request(flags, delay_ms, Instant::now()) {
            Admission::RunNow(flags) => Some(flags),
            Admission::Scheduled { epoch, deadline } => {
                let armed = self.worker.is_some()
                    && self
                        .command_tx
                        .as_ref()
                        .is_some_and(|tx| tx.send(TimerCommand::Arm { epoch, deadline }).is_ok());
                if !armed {
                    // Without a timer the request is served on the next poll
                    log::warn!("render timer unavailable, epoch {} polled directly", epoch);
                }
                None
            }
        }
    }

    /// Drains expired timers; returns flags when the current epoch fired
    pub fn poll(&mut self) -> Option<UpdateFlags> {
        let now = Instant::now();
        let mut due = None;
        while let Ok(epoch) = self.fired_rx.try_recv() {
            if let Some(flags) = self.state.fire(epoch, now) {
                due = Some(flags);
            }
        }
        if due.is_none() && self.worker.is_none() {
            due = self.state.fire(self.state.current_epoch(), now);
        }
        due
    }

    /// Blocks until the current epoch fires or `timeout` elapses
    pub fn wait(&mut self, timeout: Duration) -> Option<UpdateFlags> {
        let until = Instant::now() + timeout;
        loop {
            if let Some(flags) = self.poll() {
                return Some(flags);
            }
            if !self.state.is_pending() {
                return None;
            }
            let now = Instant::now();
            if now >= until {
                return None;
            }
            match self.fired_rx.recv_timeout(until - now) {
                Ok(epoch) => {
                    if let Some(flags) = self.state.fire(epoch, Instant::now()) {
                        return Some(flags);
                    }
                }
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => return self.poll(),
            }
        }
    }

    /// Channel of expired epochs, for hosts that want to select on it
    pub fn fired(&self) -> &Receiver<u64> {
        &self.fired_rx
    }

    pub fn is_pending(&self) -> bool {
        self.state.is_pending()
    }

    pub fn state(&self) -> &CoalesceState {
        &self.state
    }
}

impl Default for RenderCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RenderCoalescer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // Closing the command channel wakes the worker
        self.command_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Sleeps until the newest armed deadline. Arming a new epoch supersedes the
/// previous one, which is simply forgotten.
fn timer_loop(commands: Receiver<TimerCommand>, fired: Sender<u64>, shutdown: Arc<AtomicBool>) {
    let mut armed: Option<(u64, Instant)> = None;

    while !shutdown.load(Ordering::SeqCst) {
        let command = match armed {
            Some((epoch, deadline)) => {
                let now = Instant::now();
                if now >= deadline {
                    armed = None;
                    if fired.send(epoch).is_err() {
                        break;
                    }
                    continue;
                }
                match commands.recv_timeout(deadline - now) {
                    Ok(command) => command,
                    Err(RecvTimeoutError::Timeout) => continue,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match commands.recv() {
                Ok(command) => command,
                Err(_) => break,
            },
        };

        match command {
            TimerCommand::Arm { epoch, deadline } => armed = Some((epoch, deadline)),
        }
    }
    log::debug!("render timer thread stopped");
}
