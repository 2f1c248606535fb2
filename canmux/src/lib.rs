//! # Canmux
//!
//! This library multiplexes a small set of logical data points ("signals")
//! onto a shared CAN-style bus and mirrors all observed bus traffic to a
//! host over a byte-oriented serial link, using a self-synchronizing COBS
//! framing with a CRC-32 integrity trailer. It targets no_std environments,
//! uses no dynamic allocation, and keeps every operation non-blocking and
//! O(1) so the stack can be driven from interrupt handlers and a periodic
//! task without locks.
//!
//! ## Architecture
//!
//! ```text
//!  bus IRQ context          task context               host
//! ┌─────────────┐      ┌──────────────────┐
//! │ CanDriverEnd├─rx──►│  SignalRegistry  │
//! │  .service() │◄─tx──┤     .cyclic()    │
//! └──────┬──────┘      │   ┌──────────┐   │
//!        ▼             │   │ signals  │   │
//!    [CanBus]          │   └──────────┘   │
//!                      │        │ monitor │
//! ┌───────────────┐    └────────┼─────────┘
//! │SerialDriverEnd│◄─tx─────────┘
//! │   .service()  ├─rx──► Deframer (app)
//! └──────┬────────┘
//!        ▼
//!     [Serial]
//! ```
//!
//! Components:
//! * [`ring`] is the single-producer single-consumer bounded queue that is
//!   the only state shared between execution contexts.
//! * [`cobs`] and [`crc`] implement the stuffing codec and the integrity
//!   checksum of the monitoring link; [`monitor`] layers them into the wire
//!   format and its verified inbound counterpart.
//! * [`signal`] defines the signal variants (boolean, 32-bit integer, raw
//!   frame queue) with change detection and keep-alive retransmission.
//! * [`registry`] owns the signals and runs the dispatch cycle.
//! * [`port`] connects the queues to hardware drivers implementing the
//!   [`canmux_driver::link`] contracts.
//!
//! All pieces are explicitly constructed and wired at one composition point
//! at startup; there is no global state. A typical setup creates the ports
//! and the registry as statics or in `main`, splits the ports, services the
//! driver ends from interrupts, and calls
//! [`SignalRegistry::cyclic`](registry::SignalRegistry::cyclic) from a
//! periodic task.

#![no_std]

pub use canmux_driver as driver;
pub use canmux_driver::{frame, time};

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod cobs;
pub mod crc;
pub mod monitor;
pub mod port;
pub mod registry;
pub mod ring;
pub mod signal;
