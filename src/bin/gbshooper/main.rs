use std::process;

use clap::Parser;
use gbshooper::operation::Memory;

mod cli;
mod commands;
mod context;
mod exit_codes;
mod logging;
mod output;

fn main() {
    logging::init_tracing();

    let cli = cli::Cli::parse();

    let exit_code = match cli.command {
        cli::Command::Status(args) => {
            let mut out = output::make(&args.out);
            let code = commands::query::status(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::Id(args) => {
            let mut out = output::make(&args.out);
            let code = commands::query::chip_id(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::Header(args) => {
            let mut out = output::make(&args.out);
            let code = commands::query::header(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::EraseFlash(args) => {
            let mut out = output::make(&args.out);
            let code = commands::erase::flash(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::EraseRam(args) => {
            let mut out = output::make(&args.out);
            let code = commands::erase::ram(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::ReadFlash(args) => {
            let mut out = output::make(&args.out);
            let code = commands::transfer::read_flash(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::WriteFlash(args) => {
            let mut out = output::make(&args.out);
            let code = commands::transfer::write(Memory::Flash, args, &mut *out);
            out.finish();
            code
        }
        cli::Command::ReadRam(args) => {
            let mut out = output::make(&args.out);
            let code = commands::transfer::read_ram(args, &mut *out);
            out.finish();
            code
        }
        cli::Command::WriteRam(args) => {
            let mut out = output::make(&args.out);
            let code = commands::transfer::write(Memory::Ram, args, &mut *out);
            out.finish();
            code
        }
        cli::Command::List(args) => {
            let mut out = output::make_for_list(&args);
            let code = commands::list::run(args, &mut *out);
            out.finish();
            code
        }
    };

    process::exit(exit_code);
}
