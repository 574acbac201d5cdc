use gbshooper::operation::Operation;

use crate::cli;
use crate::commands::run_operation;
use crate::context;
use crate::exit_codes;
use crate::output::{Event, Reporter};

pub fn status(args: cli::QueryArgs, out: &mut dyn Reporter) -> i32 {
    let flasher = context::flasher(&args.link);
    match run_operation(Operation::Status, None, out, move |_| flasher.status()) {
        Ok(s) => {
            out.emit(Event::Status(s));
            exit_codes::EXIT_OK
        }
        Err(code) => code,
    }
}

pub fn chip_id(args: cli::QueryArgs, out: &mut dyn Reporter) -> i32 {
    let flasher = context::flasher(&args.link);
    match run_operation(Operation::ChipId, None, out, move |_| flasher.chip_id()) {
        Ok(id) => {
            out.emit(Event::ChipId(id));
            exit_codes::EXIT_OK
        }
        Err(code) => code,
    }
}

pub fn header(args: cli::QueryArgs, out: &mut dyn Reporter) -> i32 {
    let flasher = context::flasher(&args.link);
    match run_operation(Operation::ReadHeader, None, out, move |_| {
        flasher.read_header()
    }) {
        Ok(h) => {
            out.emit(Event::Header(h));
            exit_codes::EXIT_OK
        }
        Err(code) => code,
    }
}
