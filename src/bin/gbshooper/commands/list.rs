use gbshooper::serial;

use crate::cli;
use crate::exit_codes;
use crate::output::{Event, Reporter};

pub fn run(_args: cli::ListArgs, out: &mut dyn Reporter) -> i32 {
    match serial::list_devices() {
        Ok(ports) => {
            out.emit(Event::ListDevices(ports));
            exit_codes::EXIT_OK
        }
        Err(e) => {
            out.emit(Event::Error {
                code: exit_codes::EXIT_IO,
                kind: None,
                message: e.to_string(),
            });
            exit_codes::EXIT_IO
        }
    }
}
