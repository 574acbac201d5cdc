use gbshooper::operation::{Memory, Operation};

use crate::cli;
use crate::commands::run_operation;
use crate::context;
use crate::exit_codes;
use crate::output::{Event, Reporter};

pub fn flash(args: cli::QueryArgs, out: &mut dyn Reporter) -> i32 {
    let flasher = context::flasher(&args.link);
    let detail = Some("this can take up to a minute".to_string());
    match run_operation(Operation::EraseFlash, detail, out, move |_| {
        flasher.erase_flash()
    }) {
        Ok(()) => {
            out.emit(Event::Erased {
                memory: Memory::Flash,
            });
            exit_codes::EXIT_OK
        }
        Err(code) => code,
    }
}

pub fn ram(args: cli::EraseRamArgs, out: &mut dyn Reporter) -> i32 {
    let flasher = context::flasher(&args.link);
    let size = cli::ram_size(args.size);
    let detail = Some(size.class().label);
    match run_operation(Operation::EraseRam, detail, out, move |_| {
        flasher.erase_ram(size)
    }) {
        Ok(()) => {
            out.emit(Event::Erased {
                memory: Memory::Ram,
            });
            exit_codes::EXIT_OK
        }
        Err(code) => code,
    }
}
