//! Signal variants bound to bus identifiers
//!
//! A signal binds one application-level value to one bus identifier. It
//! decodes matching inbound frames into its value and, if transmit-enabled,
//! originates frames of its own: immediately when the value changes between
//! two dispatch cycles, and as a keep-alive when no matching inbound frame
//! has refreshed it within the republish threshold.
//!
//! The first payload byte is a type tag (`0` boolean, `1` 32-bit integer);
//! frames whose payload does not match the expected shape are ignored.
//!
//! The set of signal kinds is closed, so dispatch goes through the [`Signal`]
//! enum rather than an open trait object.

use canmux_driver::frame::{CanId, Data, Frame};
use canmux_driver::time::Duration;

use crate::monitor;
use crate::registry::CyclicContext;
use crate::ring::RingBuffer;

const TAG_BOOL: u8 = 0;
const TAG_INT32: u8 = 1;

/// Maximum idle time before a transmit-enabled signal resends its current
/// value even absent a change. A signal's own transmissions loop back
/// through the bus RX path and refresh the timer, so in steady state this is
/// the republish period.
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_millis(9_900);

const FRAME_QUEUE_DEPTH: usize = 8;

/// Boolean signal with rising/falling edge detection
pub struct BoolSignal {
    id: CanId,
    transmit: bool,
    keep_alive: Duration,
    since_update: Duration,
    value: bool,
    previous: bool,
    rising: bool,
    falling: bool,
}

impl BoolSignal {
    pub const fn new(id: CanId, transmit: bool) -> Self {
        Self {
            id,
            transmit,
            keep_alive: DEFAULT_KEEP_ALIVE,
            since_update: Duration::from_ticks(0),
            value: false,
            previous: false,
            rising: false,
            falling: false,
        }
    }

    pub const fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub const fn id(&self) -> CanId {
        self.id
    }

    pub const fn get(&self) -> bool {
        self.value
    }

    pub fn set(&mut self, value: bool) {
        self.value = value;
    }

    pub fn toggle(&mut self) {
        self.value = !self.value;
    }

    /// True for one cycle after the value went from false to true
    pub const fn rising(&self) -> bool {
        self.rising
    }

    /// True for one cycle after the value went from true to false
    pub const fn falling(&self) -> bool {
        self.falling
    }

    /// Time accumulated since the last matching inbound frame
    pub const fn since_update(&self) -> Duration {
        self.since_update
    }

    fn parse(&mut self, frame: &Frame) -> bool {
        let data = &frame.data;
        if data.length() >= 2 && data[0] == TAG_BOOL {
            self.value = data[1] != 0;
            self.since_update = Duration::from_ticks(0);
            true
        } else {
            false
        }
    }

    fn cyclic(&mut self, period: Duration, ctx: &mut CyclicContext<'_, '_>) {
        self.since_update += period;

        let keep_alive_due = self.since_update > self.keep_alive;
        let changed = self.value != self.previous;
        if self.transmit && (changed || keep_alive_due) {
            send(self.id, &[TAG_BOOL, self.value as u8], ctx);
        }

        self.rising = self.value && !self.previous;
        self.falling = !self.value && self.previous;
        self.previous = self.value;
    }
}

/// 32-bit integer signal, big-endian on the bus
pub struct Int32Signal {
    id: CanId,
    transmit: bool,
    keep_alive: Duration,
    since_update: Duration,
    value: i32,
    previous: i32,
}

impl Int32Signal {
    pub const fn new(id: CanId, transmit: bool) -> Self {
        Self {
            id,
            transmit,
            keep_alive: DEFAULT_KEEP_ALIVE,
            since_update: Duration::from_ticks(0),
            value: 0,
            previous: 0,
        }
    }

    pub const fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub const fn id(&self) -> CanId {
        self.id
    }

    pub const fn get(&self) -> i32 {
        self.value
    }

    pub fn set(&mut self, value: i32) {
        self.value = value;
    }

    pub fn increment(&mut self, delta: i32) {
        self.value = self.value.wrapping_add(delta);
    }

    /// Time accumulated since the last matching inbound frame
    pub const fn since_update(&self) -> Duration {
        self.since_update
    }

    fn parse(&mut self, frame: &Frame) -> bool {
        let data = &frame.data;
        if data.length() == 5 && data[0] == TAG_INT32 {
            self.value = i32::from_be_bytes([data[1], data[2], data[3], data[4]]);
            self.since_update = Duration::from_ticks(0);
            true
        } else {
            false
        }
    }

    fn cyclic(&mut self, period: Duration, ctx: &mut CyclicContext<'_, '_>) {
        self.since_update += period;

        let keep_alive_due = self.since_update > self.keep_alive;
        let changed = self.value != self.previous;
        if self.transmit && (changed || keep_alive_due) {
            let value = self.value.to_be_bytes();
            send(
                self.id,
                &[TAG_INT32, value[0], value[1], value[2], value[3]],
                ctx,
            );
        }

        self.previous = self.value;
    }
}

/// Verbatim capture of matching frames for out-of-band consumption
///
/// Never transmits and has no periodic behavior. Inbound matches are copied
/// into a small queue; when the queue is full the newest frame is dropped.
pub struct FrameQueueSignal {
    id: CanId,
    queue: RingBuffer<Frame, FRAME_QUEUE_DEPTH>,
}

impl FrameQueueSignal {
    pub const fn new(id: CanId) -> Self {
        Self {
            id,
            queue: RingBuffer::new(),
        }
    }

    pub const fn id(&self) -> CanId {
        self.id
    }

    /// Takes the oldest captured frame.
    pub fn pop(&mut self) -> Option<Frame> {
        self.queue.pop()
    }

    pub fn occupied(&self) -> usize {
        self.queue.occupied()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn parse(&mut self, frame: &Frame) -> bool {
        if !self.queue.push(*frame) {
            debug!("frame queue signal full, frame dropped");
        }
        true
    }
}

/// Builds a frame and sends it both to the bus TX queue and to the host
/// monitoring link. A full bus queue drops the frame; a value change will be
/// caught up by the keep-alive, a keep-alive simply recurs.
fn send(id: CanId, payload: &[u8], ctx: &mut CyclicContext<'_, '_>) {
    let data = unwrap!(Data::new(payload));
    let frame = Frame::new(id, data, ctx.now);
    if !ctx.bus_tx.push(frame) {
        warn!("signal {}: bus TX queue full, frame dropped", id.value());
    }
    monitor::forward(&frame, ctx.host_tx);
}

/// One registered signal
///
/// Closed set of variants; the registry dispatches over this enum.
pub enum Signal {
    Bool(BoolSignal),
    Int32(Int32Signal),
    FrameQueue(FrameQueueSignal),
}

impl Signal {
    pub fn id(&self) -> CanId {
        match self {
            Signal::Bool(signal) => signal.id(),
            Signal::Int32(signal) => signal.id(),
            Signal::FrameQueue(signal) => signal.id(),
        }
    }

    /// Applies a matching inbound frame. Returns whether the payload was
    /// accepted by the variant.
    pub(crate) fn parse_from_frame(&mut self, frame: &Frame) -> bool {
        match self {
            Signal::Bool(signal) => signal.parse(frame),
            Signal::Int32(signal) => signal.parse(frame),
            Signal::FrameQueue(signal) => signal.parse(frame),
        }
    }

    pub(crate) fn cyclic(&mut self, period: Duration, ctx: &mut CyclicContext<'_, '_>) {
        match self {
            Signal::Bool(signal) => signal.cyclic(period, ctx),
            Signal::Int32(signal) => signal.cyclic(period, ctx),
            Signal::FrameQueue(_) => {}
        }
    }
}

impl From<BoolSignal> for Signal {
    fn from(value: BoolSignal) -> Self {
        Signal::Bool(value)
    }
}

impl From<Int32Signal> for Signal {
    fn from(value: Int32Signal) -> Self {
        Signal::Int32(value)
    }
}

impl From<FrameQueueSignal> for Signal {
    fn from(value: FrameQueueSignal) -> Self {
        Signal::FrameQueue(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canmux_driver::time::Instant;

    fn frame(id: CanId, payload: &[u8]) -> Frame {
        Frame::new(id, Data::new(payload).unwrap(), Instant::from_micros(0))
    }

    #[test]
    fn test_bool_parse_resets_update_timer() {
        let id = CanId::new_extended(1000).unwrap();
        let mut signal = BoolSignal::new(id, false);
        signal.since_update = Duration::from_millis(500);

        assert!(signal.parse(&frame(id, &[0x00, 0x01])));
        assert!(signal.get());
        assert_eq!(signal.since_update(), Duration::from_ticks(0));
    }

    #[test]
    fn test_bool_parse_rejects_foreign_tag() {
        let id = CanId::new_extended(1000).unwrap();
        let mut signal = BoolSignal::new(id, false);

        assert!(!signal.parse(&frame(id, &[0x01, 0x01])));
        assert!(!signal.parse(&frame(id, &[0x00])));
        assert!(!signal.get());
    }

    #[test]
    fn test_int32_parse_big_endian() {
        let id = CanId::new_extended(2000).unwrap();
        let mut signal = Int32Signal::new(id, false);

        assert!(signal.parse(&frame(id, &[0x01, 0x01, 0x02, 0x03, 0x04])));
        assert_eq!(signal.get(), 0x0102_0304);

        // Wrong length is ignored
        assert!(!signal.parse(&frame(id, &[0x01, 0x01, 0x02, 0x03])));
        assert_eq!(signal.get(), 0x0102_0304);
    }

    #[test]
    fn test_int32_increment_wraps() {
        let id = CanId::new_extended(2000).unwrap();
        let mut signal = Int32Signal::new(id, false);
        signal.set(i32::MAX);
        signal.increment(1);
        assert_eq!(signal.get(), i32::MIN);
    }

    #[test]
    fn test_frame_queue_captures_verbatim() {
        let id = CanId::new_extended(3000).unwrap();
        let mut signal = FrameQueueSignal::new(id);

        let captured = frame(id, &[0xde, 0xad]);
        assert!(signal.parse(&captured));
        assert_eq!(signal.occupied(), 1);
        assert_eq!(signal.pop(), Some(captured));
        assert!(signal.is_empty());
    }

    #[test]
    fn test_frame_queue_drops_when_full() {
        let id = CanId::new_extended(3000).unwrap();
        let mut signal = FrameQueueSignal::new(id);

        for value in 0..10u8 {
            signal.parse(&frame(id, &[value]));
        }
        assert_eq!(signal.occupied(), FRAME_QUEUE_DEPTH - 1);
        assert_eq!(signal.pop().unwrap().data[0], 0);
    }
}
