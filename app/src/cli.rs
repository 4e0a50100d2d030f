//! UART CLI with a live dashboard.
//!
//! Bytes arrive one at a time from the serial interrupt; [`Console::feed`]
//! assembles them into lines, echoes, parses commands and writes the
//! immediate responses. State changes (speed, fault injection, CAN logging)
//! are returned as an [`Action`] for the caller to apply against its own
//! resources.
//!
//! The dashboard overwrites the top terminal line with ANSI save/restore
//! sequences so it never disturbs what the user is typing.

use core::fmt::Write;

use crate::vehicle::VehicleState;

/// Maximum command line length, terminator included.
pub const LINE_CAP: usize = 32;

const HELP: &str = "\r\nCommands:\r\n\
    \x20 help          - show this help\r\n\
    \x20 veh speed X   - set target speed to X km/h\r\n\
    \x20 veh cool-hot  - inject coolant overheat\r\n\
    \x20 log on        - enable CAN RX logging\r\n\
    \x20 log off       - disable CAN RX logging\r\n> ";

/// A parsed command, to be applied by the owner of the vehicle state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    ShowHelp,
    SetSpeed(f32),
    InjectCoolantOverheat,
    CanLogging(bool),
}

/// Parse one complete command line.
pub fn parse(line: &str) -> Option<Action> {
    match line {
        "h" | "help" => Some(Action::ShowHelp),
        "veh cool-hot" => Some(Action::InjectCoolantOverheat),
        "log on" => Some(Action::CanLogging(true)),
        "log off" => Some(Action::CanLogging(false)),
        _ => line.strip_prefix("veh speed ").map(|rest| {
            // Lenient numeric parsing: a malformed value sets 0.0.
            Action::SetSpeed(rest.trim().parse().unwrap_or(0.0))
        }),
    }
}

/// Line assembler and command interpreter.
pub struct Console {
    line: [u8; LINE_CAP],
    len: usize,
}

impl Console {
    pub const fn new() -> Self {
        Console {
            line: [0; LINE_CAP],
            len: 0,
        }
    }

    /// Feed one received byte. Echoes and responds on `out`; returns the
    /// action to apply when the byte completed a command.
    pub fn feed<W: Write>(&mut self, out: &mut W, byte: u8) -> Option<Action> {
        if byte == b'\r' || byte == b'\n' {
            if self.len == 0 {
                out.write_str("\r\n> ").ok();
                return None;
            }

            let action = core::str::from_utf8(&self.line[..self.len])
                .ok()
                .and_then(parse);
            self.len = 0;

            match action {
                Some(Action::ShowHelp) => out.write_str(HELP).ok(),
                Some(Action::SetSpeed(_)) => out.write_str("\r\nOK: speed updated\r\n> ").ok(),
                Some(Action::InjectCoolantOverheat) => {
                    out.write_str("\r\nInjected: coolant overheat\r\n> ").ok()
                }
                Some(Action::CanLogging(true)) => {
                    out.write_str("\r\nCAN RX logging: ON\r\n> ").ok()
                }
                Some(Action::CanLogging(false)) => {
                    out.write_str("\r\nCAN RX logging: OFF\r\n> ").ok()
                }
                None => out.write_str("\r\nUnknown command. Try 'help'.\r\n> ").ok(),
            };

            return action;
        }

        // Normal character: accumulate and echo. A full line swallows the
        // extra characters.
        if self.len < LINE_CAP - 1 {
            self.line[self.len] = byte;
            self.len += 1;
            out.write_char(byte as char).ok();
        }
        None
    }
}

impl Default for Console {
    fn default() -> Self {
        Console::new()
    }
}

/// Redraw the dashboard on the top terminal line, preserving the cursor.
pub fn render_dashboard<W: Write>(out: &mut W, vs: &VehicleState) -> core::fmt::Result {
    out.write_str("\x1b[s\x1b[H")?;
    write!(
        out,
        "SPD: {:6.1} km/h | RPM: {:5} | TEMP: {:5.1} C   ",
        vs.speed_kph, vs.engine_rpm, vs.coolant_temp_c
    )?;
    out.write_str("\x1b[K\x1b[u")
}

/// Clear the terminal, draw the first dashboard and print the greeting.
pub fn render_greeting<W: Write>(out: &mut W, vs: &VehicleState) -> core::fmt::Result {
    out.write_str("\x1b[2J\x1b[H")?;
    render_dashboard(out, vs)?;
    out.write_str("\r\nCLI ready. Type 'help' and press Enter.\r\n> ")
}
