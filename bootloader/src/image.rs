//! Application image inspection.

use core::fmt;

use crate::layout;
use crate::port::BootPort;

/// The two words of an application vector table that the bootloader cares
/// about, captured at validation time so the jump uses exactly the values
/// that were checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppImage {
    /// Base address of the image's vector table.
    pub base: u32,
    /// Word 0: initial main stack pointer.
    pub initial_sp: u32,
    /// Word 1: reset handler address.
    pub reset_vector: u32,
}

/// The vector table at the probed base did not look like an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidImage {
    /// The rejected word-0 value.
    pub stack_pointer: u32,
}

impl fmt::Display for InvalidImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "initial stack pointer 0x{:08X} outside SRAM",
            self.stack_pointer
        )
    }
}

/// Probe the vector table at `base` and decide whether it plausibly belongs
/// to a flashed application.
///
/// Only word 0 is judged: an erased or garbage image reads as a stack
/// pointer far outside SRAM, which is what distinguishes "nothing flashed
/// here" from a real build. The reset vector is captured but not range
/// checked; a corrupt second word slips through.
pub fn validate(port: &impl BootPort, base: u32) -> Result<AppImage, InvalidImage> {
    let initial_sp = port.read_word(base);
    let reset_vector = port.read_word(base + 4);

    if !layout::SRAM.accepts_stack_pointer(initial_sp) {
        return Err(InvalidImage {
            stack_pointer: initial_sp,
        });
    }

    Ok(AppImage {
        base,
        initial_sp,
        reset_vector,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::APP_BASE;
    use crate::sim::SimPort;

    fn validate_sp(sp: u32) -> Result<AppImage, InvalidImage> {
        let port = SimPort::new(false).with_image(APP_BASE, sp, 0x0800_8101);
        validate(&port, APP_BASE)
    }

    #[test]
    fn accepts_stack_pointer_anywhere_in_sram() {
        assert!(validate_sp(0x2000_0000).is_ok());
        assert!(validate_sp(0x2001_0000).is_ok());
        assert!(validate_sp(0x2001_FFFC).is_ok());
    }

    #[test]
    fn accepts_stack_pointer_at_top_of_sram() {
        // A full descending stack's initial SP is one word past the top.
        assert!(validate_sp(0x2002_0000).is_ok());
    }

    #[test]
    fn rejects_stack_pointer_outside_sram() {
        assert_eq!(
            validate_sp(0x2002_0004),
            Err(InvalidImage {
                stack_pointer: 0x2002_0004
            })
        );
        assert!(validate_sp(0x1FFF_FFFC).is_err());
        assert!(validate_sp(0).is_err());
    }

    #[test]
    fn rejects_erased_flash() {
        // Unprogrammed flash reads all ones.
        let port = SimPort::new(false);
        let err = validate(&port, APP_BASE).unwrap_err();
        assert_eq!(err.stack_pointer, 0xFFFF_FFFF);
    }

    #[test]
    fn captures_both_words_unchanged() {
        let port = SimPort::new(false).with_image(APP_BASE, 0x2001_8000, 0x0800_8235);
        let image = validate(&port, APP_BASE).unwrap();
        assert_eq!(
            image,
            AppImage {
                base: APP_BASE,
                initial_sp: 0x2001_8000,
                reset_vector: 0x0800_8235,
            }
        );
    }

    #[test]
    fn reset_vector_is_not_range_checked() {
        // Word 1 is taken on faith; only word 0 gates the jump.
        let port = SimPort::new(false).with_image(APP_BASE, 0x2001_0000, 0xDEAD_BEEF);
        assert!(validate(&port, APP_BASE).is_ok());
    }
}
