use std::{backtrace::BacktraceStatus, fmt};

use console::style;
use grog_emul::{LoadError, TrapCause};

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_IMAGE_TOO_LARGE: i32 = 2;
pub const EXIT_FAULT: i32 = 3;

/// Process exit status for a failed command, picked from the first typed
/// error found in the chain.
pub fn exit_code(e: &anyhow::Error) -> i32 {
    for cause in e.chain() {
        if let Some(LoadError::ImageTooLarge { .. }) = cause.downcast_ref::<LoadError>() {
            return EXIT_IMAGE_TOO_LARGE;
        }
        if cause.downcast_ref::<TrapCause>().is_some() {
            return EXIT_FAULT;
        }
    }
    EXIT_FAILURE
}

pub fn print_cargo_message(status: &str, msg: fmt::Arguments) {
    eprintln!("{:>12} {msg}", style(status).green().bold());
}

pub fn print_error(e: anyhow::Error) {
    for e in e.chain().rev() {
        eprintln!(
            "{}{} {}",
            style("error").red().bold(),
            style(":").white().bold(),
            e
        );
    }
    let bt = e.backtrace();
    if bt.status() == BacktraceStatus::Captured {
        eprintln!("error backtrace:");
        eprintln!("{bt}");
    }
}
