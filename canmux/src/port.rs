//! Queued ports between interrupt-context drivers and the dispatch cycle
//!
//! A port owns the RX and TX ring buffers for one peripheral and splits them
//! into a driver end and a stack end. The driver end lives in the driver's
//! execution context (typically an interrupt or a fast tick) and moves data
//! between the queues and the hardware through the
//! [`canmux_driver::link`] traits. The stack end is handed to the dispatch
//! cycle. Splitting fixes the producer and consumer of each queue for its
//! lifetime, which is what keeps the lock-free buffers sound.

use canmux_driver::frame::Frame;
use canmux_driver::link::{CanBus, Serial};
use canmux_driver::time::Instant;

use crate::ring::{Consumer, Producer, RingBuffer};

/// Bus controller port: a frame queue pair
pub struct CanPort<const N: usize> {
    rx: RingBuffer<Frame, N>,
    tx: RingBuffer<Frame, N>,
}

impl<const N: usize> CanPort<N> {
    pub const fn new() -> Self {
        Self {
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
        }
    }

    pub fn split(&mut self) -> (CanDriverEnd<'_>, CanStackEnd<'_>) {
        let (rx_producer, rx_consumer) = self.rx.split();
        let (tx_producer, tx_consumer) = self.tx.split();
        (
            CanDriverEnd {
                rx: rx_producer,
                tx: tx_consumer,
                pending: None,
            },
            CanStackEnd {
                rx: rx_consumer,
                tx: tx_producer,
            },
        )
    }
}

impl<const N: usize> Default for CanPort<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Driver end of a [`CanPort`], serviced from the driver's context
pub struct CanDriverEnd<'a> {
    rx: Producer<'a, Frame>,
    tx: Consumer<'a, Frame>,
    pending: Option<Frame>,
}

impl CanDriverEnd<'_> {
    /// Moves frames between the hardware and the queues. Call on every bus
    /// interrupt or driver tick; `now` stamps received frames.
    ///
    /// A frame the hardware would not accept is parked and retried on the
    /// next call, ahead of anything queued after it, so TX stays FIFO.
    ///
    /// A successfully transmitted frame is looped back into the RX queue
    /// with its transmit timestamp. The local node thereby observes its own
    /// traffic exactly like foreign traffic: it is mirrored to the host and
    /// refreshes the keep-alive timer of the signal that sent it.
    pub fn service<B: CanBus>(&mut self, bus: &mut B, now: Instant) {
        while let Some((id, data)) = bus.try_receive() {
            if !self.rx.push(Frame::new(id, data, now)) {
                warn!("can port: RX queue full, frame dropped");
            }
        }

        let Some(mut frame) = self.pending.take().or_else(|| self.tx.pop()) else {
            return;
        };
        if bus.try_send(&frame) {
            frame.timestamp = now;
            if !self.rx.push(frame) {
                debug!("can port: RX queue full, loop-back dropped");
            }
        } else {
            self.pending = Some(frame);
        }
    }
}

/// Stack end of a [`CanPort`], consumed by the dispatch cycle
pub struct CanStackEnd<'a> {
    pub rx: Consumer<'a, Frame>,
    pub tx: Producer<'a, Frame>,
}

/// Host serial port: a byte queue pair
pub struct SerialPort<const N: usize> {
    rx: RingBuffer<u8, N>,
    tx: RingBuffer<u8, N>,
}

impl<const N: usize> SerialPort<N> {
    pub const fn new() -> Self {
        Self {
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
        }
    }

    pub fn split(&mut self) -> (SerialDriverEnd<'_>, SerialStackEnd<'_>) {
        let (rx_producer, rx_consumer) = self.rx.split();
        let (tx_producer, tx_consumer) = self.tx.split();
        (
            SerialDriverEnd {
                rx: rx_producer,
                tx: tx_consumer,
                pending: None,
            },
            SerialStackEnd {
                rx: rx_consumer,
                tx: tx_producer,
            },
        )
    }
}

impl<const N: usize> Default for SerialPort<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Driver end of a [`SerialPort`], serviced from the driver's context
pub struct SerialDriverEnd<'a> {
    rx: Producer<'a, u8>,
    tx: Consumer<'a, u8>,
    pending: Option<u8>,
}

impl SerialDriverEnd<'_> {
    /// Moves bytes between the hardware and the queues. A byte the hardware
    /// would not accept is parked and retried on the next call.
    pub fn service<S: Serial>(&mut self, serial: &mut S) {
        while let Some(byte) = serial.try_read() {
            if !self.rx.push(byte) {
                warn!("serial port: RX queue full, byte dropped");
            }
        }

        loop {
            let Some(byte) = self.pending.take().or_else(|| self.tx.pop()) else {
                return;
            };
            if serial.try_write(&[byte]) == 0 {
                self.pending = Some(byte);
                return;
            }
        }
    }
}

/// Stack end of a [`SerialPort`]
///
/// `tx` feeds the monitoring mirror; `rx` carries host-originated bytes for
/// the application to deframe (see [`crate::monitor::Deframer`]).
pub struct SerialStackEnd<'a> {
    pub rx: Consumer<'a, u8>,
    pub tx: Producer<'a, u8>,
}
