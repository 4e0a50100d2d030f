//! First-stage bootloader for the Mini ECU on the NUCLEO-F446RE.
//!
//! The boot flow is deliberately small: sample the user button, validate the
//! vector table at the application base, quiesce the peripherals this stage
//! touched, then hand the core to the application image. All hardware effects
//! go through the [`port::BootPort`] trait, so the flow itself compiles and
//! tests on the host.

#![cfg_attr(all(not(test), target_arch = "arm"), no_std)]

pub mod boot;
pub mod image;
pub mod layout;
pub mod port;

#[cfg(target_arch = "arm")]
pub mod stm32;

#[cfg(test)]
pub mod sim;
