#![cfg_attr(target_arch = "arm", no_std)]
#![cfg_attr(target_arch = "arm", no_main)]

#[cfg(target_arch = "arm")]
mod arm {
    use cortex_m_rt::entry;
    use panic_halt as _;

    use mini_ecu_boot::boot;
    use mini_ecu_boot::stm32::Stm32Port;
    use stm32f4xx_hal::pac;

    #[entry]
    fn main() -> ! {
        let dp = pac::Peripherals::take().unwrap();
        match Stm32Port::initialize(dp) {
            Ok(port) => boot::run(port),
            Err(_) => init_failure_loop(),
        }
    }

    /// Bring-up failed before any console existed, so the only signal left
    /// is the LED: a steady 500 ms blink driven by raw register writes.
    fn init_failure_loop() -> ! {
        let rcc = unsafe { &*pac::RCC::ptr() };
        let gpioa = unsafe { &*pac::GPIOA::ptr() };

        rcc.ahb1enr().modify(|_, w| w.gpioaen().set_bit());
        gpioa.moder().modify(|_, w| unsafe { w.moder5().bits(0b01) });

        loop {
            gpioa.odr().modify(|r, w| w.odr5().bit(!r.odr5().bit()));
            // ~500 ms at the 16 MHz HSI the core resets on.
            cortex_m::asm::delay(8_000_000);
        }
    }
}

#[cfg(not(target_arch = "arm"))]
fn main() {}
