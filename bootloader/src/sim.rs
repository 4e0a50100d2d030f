//! Recording test double for [`BootPort`].
//!
//! The boot flow's interesting paths all diverge (jump or loop forever), so
//! the double turns both endings into typed unwinds: a launch panics with
//! [`SimExit::Launched`], and the delay budget running dry panics with
//! [`SimExit::OutOfFuel`]. Tests catch the unwind and assert on the journal.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, panic_any, AssertUnwindSafe};
use std::rc::Rc;

use crate::image::AppImage;
use crate::port::BootPort;

/// One observed hardware effect, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    FlashRead(u32),
    ConsoleWrite(String),
    PinSampled(bool),
    IndicatorToggled,
    Delay(u32),
    ClocksDeinitialized,
    SystickDisabled,
    InterruptsMasked,
    VectorBase(u32),
    Launched { stack_pointer: u32, reset_vector: u32 },
}

/// How a simulated boot run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimExit {
    /// Control was handed to the application image.
    Launched,
    /// The flow entered a blink loop and exhausted its delay budget.
    OutOfFuel,
}

pub struct SimPort {
    flash: BTreeMap<u32, u32>,
    button_pressed: bool,
    fuel: u32,
    journal: Rc<RefCell<Vec<Event>>>,
}

impl SimPort {
    pub fn new(button_pressed: bool) -> Self {
        SimPort {
            flash: BTreeMap::new(),
            button_pressed,
            fuel: 16,
            journal: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Stage a vector table: word 0 at `base`, word 1 at `base + 4`.
    pub fn with_image(mut self, base: u32, initial_sp: u32, reset_vector: u32) -> Self {
        self.flash.insert(base, initial_sp);
        self.flash.insert(base + 4, reset_vector);
        self
    }

    /// Cap the number of `delay_ms` calls before the run is cut off.
    pub fn with_fuel(mut self, fuel: u32) -> Self {
        self.fuel = fuel;
        self
    }

    /// Handle to the journal, usable after the port has been consumed.
    pub fn journal(&self) -> Rc<RefCell<Vec<Event>>> {
        Rc::clone(&self.journal)
    }

    fn record(&self, event: Event) {
        self.journal.borrow_mut().push(event);
    }
}

impl BootPort for SimPort {
    fn read_word(&self, addr: u32) -> u32 {
        self.record(Event::FlashRead(addr));
        // Unprogrammed flash reads all ones.
        self.flash.get(&addr).copied().unwrap_or(0xFFFF_FFFF)
    }

    fn console_write(&mut self, text: &str) {
        self.record(Event::ConsoleWrite(text.to_owned()));
    }

    fn boot_pin_high(&mut self) -> bool {
        self.record(Event::PinSampled(self.button_pressed));
        self.button_pressed
    }

    fn toggle_indicator(&mut self) {
        self.record(Event::IndicatorToggled);
    }

    fn delay_ms(&mut self, ms: u32) {
        if self.fuel == 0 {
            panic_any(SimExit::OutOfFuel);
        }
        self.fuel -= 1;
        self.record(Event::Delay(ms));
    }

    fn deinit_clocks(&mut self) {
        self.record(Event::ClocksDeinitialized);
    }

    fn disable_systick(&mut self) {
        self.record(Event::SystickDisabled);
    }

    fn mask_interrupts(&mut self) {
        self.record(Event::InterruptsMasked);
    }

    fn set_vector_base(&mut self, addr: u32) {
        self.record(Event::VectorBase(addr));
    }

    fn launch(&mut self, image: &AppImage) -> ! {
        self.record(Event::Launched {
            stack_pointer: image.initial_sp,
            reset_vector: image.reset_vector,
        });
        panic_any(SimExit::Launched);
    }
}

/// Drive [`crate::boot::run`] to its divergent end and report which end
/// it was.
pub fn run_boot(port: SimPort) -> SimExit {
    let outcome = catch_unwind(AssertUnwindSafe(move || crate::boot::run(port)));
    match outcome {
        Ok(never) => never,
        Err(payload) => match payload.downcast::<SimExit>() {
            Ok(exit) => *exit,
            Err(payload) => std::panic::resume_unwind(payload),
        },
    }
}
