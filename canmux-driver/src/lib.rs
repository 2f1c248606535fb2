//! Canmux driver interface
//!
//! The crate provides the interface between hardware drivers and the canmux
//! stack. Limited scope facilitates compatibility across versions.
//! Driver crates should depend on this crate. Canmux stack users should
//! depend on the `canmux` crate instead.
//!
//! The interface consists of the bus frame value types ([`frame`]) and the
//! two collaborator contracts ([`link`]): a bus controller that can attempt
//! to receive or transmit one frame, and a serial line that can move raw
//! bytes. Everything else about the hardware, including initialization,
//! filters, and interrupt wiring, is the driver's own business.

#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod frame;
pub mod link;

pub mod time {
    pub use embassy_time::{Duration, Instant};
}
