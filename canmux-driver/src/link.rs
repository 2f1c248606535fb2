//! Contracts between hardware drivers and the canmux stack
//!
//! The stack never touches hardware registers. It sees the bus controller and
//! the host serial line only through these traits, which a driver crate
//! implements over its peripheral handles. All operations are non-blocking
//! and are expected to be called from the driver's own execution context
//! (typically an interrupt handler or a high-priority tick).
//!
//! There is no clock contract: wherever the stack needs the current time, an
//! [`Instant`](crate::time::Instant) is passed down by the caller.

use crate::frame::{CanId, Data, Frame};

/// Bus controller access
///
/// Both operations map to single hardware FIFO interactions and must not
/// block. `try_send` returning `false` means the hardware queue is full and
/// the caller retries later; the frame is not consumed.
pub trait CanBus {
    /// Attempts to take one received frame from the hardware.
    fn try_receive(&mut self) -> Option<(CanId, Data)>;

    /// Attempts to hand one frame to the hardware for transmission.
    fn try_send(&mut self, frame: &Frame) -> bool;
}

/// Host-link serial line access
///
/// The serial line is a raw byte stream; message boundaries are the stack's
/// concern.
pub trait Serial {
    /// Attempts to take one received byte from the hardware.
    fn try_read(&mut self) -> Option<u8>;

    /// Writes as many bytes as the hardware currently accepts, returning the
    /// accepted count.
    fn try_write(&mut self, bytes: &[u8]) -> usize;
}
