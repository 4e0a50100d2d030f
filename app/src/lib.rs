//! Mini ECU application logic.
//!
//! Everything here is hardware-free: the vehicle model, the telemetry
//! codec, the CLI and the logger all work against plain values and
//! [`core::fmt::Write`] sinks, so the whole layer tests on the host. The
//! RTIC binary in `main.rs` wires these pieces to the F446RE peripherals.

#![cfg_attr(all(not(test), target_arch = "arm"), no_std)]

pub mod cli;
pub mod logger;
pub mod telemetry;
pub mod vehicle;
