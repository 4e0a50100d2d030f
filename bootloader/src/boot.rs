//! The boot flow: decide, validate, quiesce, jump.

use crate::image::{self, AppImage};
use crate::layout;
use crate::port::BootPort;

/// Outcome of sampling the user button at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootDecision {
    /// Button held: stay in the bootloader.
    Remain,
    /// Button released: try to hand over to the application.
    AttemptTransfer,
}

/// Map the button sample to a decision. Pressed means stay.
pub fn decide(button_pressed: bool) -> BootDecision {
    if button_pressed {
        BootDecision::Remain
    } else {
        BootDecision::AttemptTransfer
    }
}

/// Why the bootloader is parked in the error loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StayReason {
    /// The user held the button through reset.
    UserRequestedStay,
    /// No plausible image at the application base.
    NoValidImage,
}

impl StayReason {
    /// Blink half-period for the indicator LED. The two cadences let an
    /// operator tell the reasons apart without a serial console.
    pub fn blink_period_ms(self) -> u32 {
        match self {
            StayReason::UserRequestedStay => 300,
            StayReason::NoValidImage => 500,
        }
    }
}

/// Return the peripherals this stage touched to their reset state.
///
/// Order matters: clocks first so later register writes happen on the
/// default HSI tree, then SysTick, then the NVIC enable and pending banks.
pub fn teardown(port: &mut impl BootPort) {
    port.deinit_clocks();
    port.disable_systick();
    port.mask_interrupts();
}

/// Retarget the vector table at the image and branch into it.
pub fn transfer(port: &mut impl BootPort, image: &AppImage) -> ! {
    port.set_vector_base(image.base);
    port.launch(image)
}

/// Park forever, blinking the indicator at the reason's cadence.
pub fn error_loop(port: &mut impl BootPort, reason: StayReason) -> ! {
    let period = reason.blink_period_ms();
    loop {
        port.toggle_indicator();
        port.delay_ms(period);
    }
}

/// Run the whole boot flow. Diverges: every path ends in a jump or a loop.
pub fn run(mut port: impl BootPort) -> ! {
    port.console_write("\r\n[BOOT] Mini ECU v2 bootloader\r\n");
    port.console_write("[BOOT] Hold B1 during reset to stay in bootloader.\r\n");

    // Let the button's RC filter settle before sampling.
    port.delay_ms(10);

    match decide(port.boot_pin_high()) {
        BootDecision::Remain => {
            port.console_write("[BOOT] B1 is pressed: staying in bootloader.\r\n");
            port.console_write("[BOOT] (Future) OTA / firmware update mode.\r\n");
            error_loop(&mut port, StayReason::UserRequestedStay)
        }
        BootDecision::AttemptTransfer => {
            port.console_write("[BOOT] B1 not pressed: attempting to jump to application...\r\n");
            match image::validate(&port, layout::APP_BASE) {
                Ok(image) => {
                    teardown(&mut port);
                    transfer(&mut port, &image)
                }
                Err(_) => {
                    port.console_write(
                        "[BOOT] No valid application found. Staying in error loop.\r\n",
                    );
                    error_loop(&mut port, StayReason::NoValidImage)
                }
            }
        }
    }
}
