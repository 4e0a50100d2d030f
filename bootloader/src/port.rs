//! Hardware capability seam for the boot flow.

use crate::image::AppImage;

/// Everything the boot flow needs from the machine it runs on.
///
/// The native implementation ([`crate::stm32::Stm32Port`]) talks to the
/// F446RE registers; tests substitute a recording double. Methods that model
/// register writes take `&mut self` so every effect is attributable to a
/// caller holding the port.
pub trait BootPort {
    /// Read one 32-bit word from the flash address space.
    fn read_word(&self, addr: u32) -> u32;

    /// Best-effort console output. Must not block forever when no host is
    /// attached to the serial line.
    fn console_write(&mut self, text: &str);

    /// Sample the user button. `true` means pressed.
    fn boot_pin_high(&mut self) -> bool;

    /// Toggle the status indicator LED.
    fn toggle_indicator(&mut self);

    /// Busy-wait for roughly `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Return the clock tree to its reset state.
    fn deinit_clocks(&mut self);

    /// Stop SysTick and clear its reload and current-value registers.
    fn disable_systick(&mut self);

    /// Disable and un-pend every NVIC interrupt line.
    fn mask_interrupts(&mut self);

    /// Point the vector table base at `addr`, with the barriers the core
    /// needs before the new table is used.
    fn set_vector_base(&mut self, addr: u32);

    /// Load the image's initial stack pointer and branch to its reset
    /// handler. Does not return.
    fn launch(&mut self, image: &AppImage) -> !;
}
