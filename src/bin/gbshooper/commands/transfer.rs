use gbshooper::operation::{Memory, Operation};

use crate::cli;
use crate::commands::run_operation;
use crate::context;
use crate::exit_codes;
use crate::output::{Event, Reporter};

pub fn write(memory: Memory, args: cli::WriteArgs, out: &mut dyn Reporter) -> i32 {
    let flasher = context::flasher(&args.link);
    let operation = Operation::write(memory);
    let path = args.file.clone();
    let detail = Some(path.display().to_string());

    let r = run_operation(operation, detail, out, move |on_event| match memory {
        Memory::Flash => flasher.write_flash_file(&path, on_event),
        Memory::Ram => flasher.write_ram_file(&path, on_event),
    });

    match r {
        Ok(bytes) => {
            out.emit(Event::Transferred {
                operation,
                path: args.file,
                bytes,
            });
            exit_codes::EXIT_OK
        }
        Err(code) => code,
    }
}

pub fn read_flash(args: cli::ReadFlashArgs, out: &mut dyn Reporter) -> i32 {
    let flasher = context::flasher(&args.link);
    let size = cli::rom_size(args.size);
    let path = args.file.clone();
    let detail = Some(format!("{} into {}", size.class(), path.display()));

    let r = run_operation(Operation::ReadFlash, detail, out, move |on_event| {
        flasher.read_flash_file(&path, size, on_event)
    });

    match r {
        Ok(bytes) => {
            out.emit(Event::Transferred {
                operation: Operation::ReadFlash,
                path: args.file,
                bytes,
            });
            exit_codes::EXIT_OK
        }
        Err(code) => code,
    }
}

pub fn read_ram(args: cli::ReadRamArgs, out: &mut dyn Reporter) -> i32 {
    let flasher = context::flasher(&args.link);
    let size = cli::ram_size(args.size);
    let path = args.file.clone();
    let detail = Some(format!("{} into {}", size.class(), path.display()));

    let r = run_operation(Operation::ReadRam, detail, out, move |on_event| {
        flasher.read_ram_file(&path, size, on_event)
    });

    match r {
        Ok(bytes) => {
            out.emit(Event::Transferred {
                operation: Operation::ReadRam,
                path: args.file,
                bytes,
            });
            exit_codes::EXIT_OK
        }
        Err(code) => code,
    }
}
