//! # dcnode
//!
//! This library implements a DroneCAN (UAVCAN v0) node for no_std targets. It keeps
//! the node status, answers the standard node services and dispatches received
//! transfers to application handlers. All storage is statically sized, no dynamic
//! memory allocation is required.
//!
//! ## Architecture
//!
//! ```text
//!               ┌───────────┐
//!               │ Main loop │
//!               └─────┬─────┘
//!                     ▼ spin_once
//! ┌────────┐   ┌─────────────┐   ┌──────────────────┐
//! │ Driver │◄─►│    Node     ├──►│ Handlers         │
//! └────────┘   │  ┌───────┐  │   │ (built-in, user) │
//!              │  │Engine │  │   └──────────────────┘
//!              │  └───────┘  │
//!              └──┬───────┬──┘
//!                 ▼       ▼
//!          ┌──────────┐ ┌──────────────┐
//!          │ Platform │ │ ParamStorage │
//!          └──────────┘ └──────────────┘
//! ```
//! Components:
//! * _Node_ owns everything below and is the only entry point. It holds the node status,
//!   the transport statistics and the subscription registry.
//! * _Driver_ is a polled CAN peripheral implementing [`driver::CanDriver`].
//! * _Engine_ splits outgoing transfers into frames, keeps them in a priority queue and
//!   reassembles incoming frames. See [`transfer::TransferEngine`] and [`transfer::Canard`].
//! * _Platform_ provides the millisecond clock and optional board hooks.
//! * _ParamStorage_ backs the parameter services.
//! * _Handlers_ are plain functions invoked synchronously for every matching transfer.
//!
//! ## Concurrency model
//!
//! The stack is single-threaded and cooperative. The application calls
//! [`node::Node::spin_once`] periodically; no call ever blocks, every loop inside is
//! bounded. Synchronization with interrupt handlers that touch the CAN peripheral is
//! up to the driver.
//!
//! ## Limitations
//!
//! * Anonymous transmission and dynamic node ID allocation are not supported.
//! * Redundant interfaces are not supported, the node drives a single interface.
//! * Firmware update and file services are not implemented.
#![no_std]

pub use dcnode_core as core;
pub use dcnode_driver::{driver, frame, time};
pub use dcnode_encoding as encoding;

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod data_types;
mod format;
pub mod node;
pub mod params;
pub mod platform;
pub mod publisher;
pub mod subscriber;
pub mod transfer;
