//! Signal registry and dispatch cycle
//!
//! The registry owns its signals in an insertion-ordered, append-only arena;
//! [`SignalHandle`]s are stable indices handed out at registration and are
//! the application's way back to a signal for mutation. There are no links
//! from signals to the registry or to any queue: whatever a signal needs to
//! transmit is passed down per cycle through [`CyclicContext`].
//!
//! One [`cyclic`](SignalRegistry::cyclic) call first drains the bus RX queue
//! completely, mirroring every frame to the host link and applying it to
//! every signal with a matching identifier, and only then runs each signal's
//! periodic update. A value that arrived this cycle is therefore already in
//! place when change detection compares against the previous cycle's
//! snapshot.

use canmux_driver::frame::Frame;
use canmux_driver::time::{Duration, Instant};
use heapless::Vec;

use crate::monitor;
use crate::ring::{Consumer, Producer};
use crate::signal::{BoolSignal, FrameQueueSignal, Int32Signal, Signal};

/// Everything a dispatch cycle may touch outside the registry
///
/// Built fresh by the caller for every cycle; `now` is sampled once and
/// stamps every frame the cycle originates.
pub struct CyclicContext<'a, 'q> {
    pub now: Instant,
    pub bus_rx: &'a mut Consumer<'q, Frame>,
    pub bus_tx: &'a mut Producer<'q, Frame>,
    pub host_tx: &'a mut Producer<'q, u8>,
}

/// Stable reference to a registered signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalHandle(usize);

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegistryFull;

/// Insertion-ordered collection of signals
///
/// Membership is monotonic: signals are added at startup and never removed.
/// Identifier uniqueness is not enforced; during dispatch every matching
/// signal is updated, in insertion order.
pub struct SignalRegistry<const N: usize> {
    signals: Vec<Signal, N>,
}

impl<const N: usize> SignalRegistry<N> {
    pub const fn new() -> Self {
        Self {
            signals: Vec::new(),
        }
    }

    pub fn add(&mut self, signal: impl Into<Signal>) -> Result<SignalHandle, RegistryFull> {
        let handle = SignalHandle(self.signals.len());
        self.signals
            .push(signal.into())
            .map_err(|_| RegistryFull)?;
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn get(&self, handle: SignalHandle) -> Option<&Signal> {
        self.signals.get(handle.0)
    }

    /// The signal behind `handle`, if it is a boolean signal.
    pub fn bool_signal(&mut self, handle: SignalHandle) -> Option<&mut BoolSignal> {
        match self.signals.get_mut(handle.0)? {
            Signal::Bool(signal) => Some(signal),
            _ => None,
        }
    }

    /// The signal behind `handle`, if it is an integer signal.
    pub fn int32_signal(&mut self, handle: SignalHandle) -> Option<&mut Int32Signal> {
        match self.signals.get_mut(handle.0)? {
            Signal::Int32(signal) => Some(signal),
            _ => None,
        }
    }

    /// The signal behind `handle`, if it is a frame queue signal.
    pub fn frame_queue_signal(&mut self, handle: SignalHandle) -> Option<&mut FrameQueueSignal> {
        match self.signals.get_mut(handle.0)? {
            Signal::FrameQueue(signal) => Some(signal),
            _ => None,
        }
    }

    /// Runs one dispatch cycle.
    ///
    /// `period` is the time since the previous call, in the caller's
    /// scheduling units; it drives change detection snapshots and keep-alive
    /// accounting. Not re-entrant, and must not run concurrently with
    /// [`add`](Self::add).
    pub fn cyclic(&mut self, period: Duration, ctx: &mut CyclicContext<'_, '_>) {
        while let Some(frame) = ctx.bus_rx.pop() {
            // Every observed frame goes to the host, matched or not.
            monitor::forward(&frame, ctx.host_tx);

            for signal in &mut self.signals {
                if signal.id() == frame.id {
                    signal.parse_from_frame(&frame);
                }
            }
        }

        for signal in &mut self.signals {
            signal.cyclic(period, ctx);
        }
    }
}

impl<const N: usize> Default for SignalRegistry<N> {
    fn default() -> Self {
        Self::new()
    }
}
