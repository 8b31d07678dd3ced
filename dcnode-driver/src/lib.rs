//! dcnode driver interface
//!
//! The crate provides an interface between a CAN device driver and the dcnode stack.
//! Limited scope facilitates compatibility across versions.
//! Driver crates should depend on this crate. Stack users should depend on
//! the `dcnode` crate instead.
//!
//! A driver is polled by the node: the node pulls received frames and pushes frames for
//! transmission from its spin context. Neither direction may block. A full hardware
//! mailbox is reported as [`driver::TxStatus::Busy`] and the node simply retries on the
//! next spin.
//!
//! Any peripheral implementing [`embedded_can::nb::Can`] can be attached through
//! [`embedded::EmbeddedCan`].

#![no_std]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod driver;
pub mod embedded;
pub mod frame;

pub mod time {
    pub use embassy_time::{Duration, Instant};
}
