//! [`BootPort`] implementation for the NUCLEO-F446RE.

use core::ptr::{read_volatile, write_volatile};

use cortex_m::peripheral::{NVIC, SYST};
use stm32f4xx_hal::{
    gpio::{self, Input, Output, PushPull},
    pac::{self, TIM2, USART2},
    prelude::*,
    rcc::Config,
    serial::{config::Config as SerialConfig, Serial},
    timer,
};

use crate::image::AppImage;
use crate::port::BootPort;

/// Polls of the TXE flag before a console byte is dropped. At a 16 MHz
/// sysclk this is a couple of milliseconds, far longer than one character
/// time at 115200 baud, so it only ever fires when the UART is wedged.
const TX_POLL_BUDGET: u32 = 40_000;

/// Peripheral bring-up did not complete; no console or port exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeripheralInitFailure;

pub struct Stm32Port {
    // Owned for its pin and peripheral configuration; TX goes through the
    // bounded register poll in `console_write` instead of the blocking
    // `fmt::Write` path.
    _serial: Serial<USART2>,
    button: gpio::PC13<Input>,
    led: gpio::PA5<Output<PushPull>>,
    delay: timer::DelayMs<TIM2>,
}

impl Stm32Port {
    /// Bring up clocks, the indicator LED, the user button and the console
    /// UART (USART2, PA2/PA3, 115200-8N1).
    pub fn initialize(dp: pac::Peripherals) -> Result<Self, PeripheralInitFailure> {
        let rcc = dp.RCC.constrain();
        let mut rcc = rcc.freeze(Config::hsi().sysclk(16.MHz()).pclk1(8.MHz()));

        let delay = dp.TIM2.delay_ms(&mut rcc);

        let gpioa = dp.GPIOA.split(&mut rcc);
        let led = gpioa.pa5.into_push_pull_output();

        let gpioc = dp.GPIOC.split(&mut rcc);
        let button = gpioc.pc13.into_floating_input();

        let tx_pin = gpioa.pa2.into_alternate();
        let rx_pin = gpioa.pa3.into_alternate();
        let serial = Serial::new(
            dp.USART2,
            (tx_pin, rx_pin),
            SerialConfig::default().baudrate(115200.bps()),
            &mut rcc,
        )
        .map_err(|_| PeripheralInitFailure)?;

        Ok(Stm32Port {
            _serial: serial,
            button,
            led,
            delay,
        })
    }

    fn write_byte_bounded(byte: u8) -> bool {
        let usart = unsafe { &*USART2::ptr() };
        let mut budget = TX_POLL_BUDGET;
        while usart.sr().read().txe().bit_is_clear() {
            budget -= 1;
            if budget == 0 {
                return false;
            }
        }
        usart.dr().write(|w| unsafe { w.dr().bits(byte as u16) });
        true
    }
}

impl BootPort for Stm32Port {
    fn read_word(&self, addr: u32) -> u32 {
        unsafe { read_volatile(addr as *const u32) }
    }

    fn console_write(&mut self, text: &str) {
        for byte in text.bytes() {
            if !Self::write_byte_bounded(byte) {
                // UART wedged: drop the rest of the message rather than
                // stall the boot.
                return;
            }
        }
    }

    fn boot_pin_high(&mut self) -> bool {
        self.button.is_high()
    }

    fn toggle_indicator(&mut self) {
        self.led.toggle();
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn deinit_clocks(&mut self) {
        let rcc = unsafe { &*pac::RCC::ptr() };

        // Back onto HSI before the switches below take effect.
        rcc.cr().modify(|_, w| w.hsion().set_bit());
        while rcc.cr().read().hsirdy().bit_is_clear() {}

        rcc.cfgr().write(|w| unsafe { w.bits(0) });
        while rcc.cfgr().read().sws().bits() != 0 {}

        rcc.cr()
            .modify(|_, w| w.hseon().clear_bit().csson().clear_bit().pllon().clear_bit());
        rcc.cir().write(|w| unsafe { w.bits(0) });

        // Pulse every bus reset line so the application inherits
        // peripherals in their power-on state.
        rcc.ahb1rstr().write(|w| unsafe { w.bits(0xFFFF_FFFF) });
        rcc.ahb1rstr().write(|w| unsafe { w.bits(0) });
        rcc.ahb2rstr().write(|w| unsafe { w.bits(0xFFFF_FFFF) });
        rcc.ahb2rstr().write(|w| unsafe { w.bits(0) });
        rcc.ahb3rstr().write(|w| unsafe { w.bits(0xFFFF_FFFF) });
        rcc.ahb3rstr().write(|w| unsafe { w.bits(0) });
        rcc.apb1rstr().write(|w| unsafe { w.bits(0xFFFF_FFFF) });
        rcc.apb1rstr().write(|w| unsafe { w.bits(0) });
        rcc.apb2rstr().write(|w| unsafe { w.bits(0xFFFF_FFFF) });
        rcc.apb2rstr().write(|w| unsafe { w.bits(0) });
    }

    fn disable_systick(&mut self) {
        let syst = unsafe { &*SYST::PTR };
        unsafe {
            syst.csr.write(0);
            syst.rvr.write(0);
            syst.cvr.write(0);
        }
    }

    fn mask_interrupts(&mut self) {
        let nvic = unsafe { &*NVIC::PTR };
        for bank in 0..8 {
            unsafe {
                nvic.icer[bank].write(0xFFFF_FFFF);
                nvic.icpr[bank].write(0xFFFF_FFFF);
            }
        }
    }

    fn set_vector_base(&mut self, addr: u32) {
        const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
        unsafe { write_volatile(SCB_VTOR, addr) };
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
    }

    fn launch(&mut self, image: &AppImage) -> ! {
        // bootload reloads MSP from word 0 of the table and branches to
        // word 1, the same two words validation captured.
        unsafe { cortex_m::asm::bootload(image.base as *const u32) }
    }
}
