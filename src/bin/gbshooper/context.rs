use std::time::Duration;

use gbshooper::api::{Flasher, FlasherOptions, Timeouts};
use gbshooper::link::LinkOptions;
use gbshooper::serial::{self, SerialConnector};

use crate::cli;

pub fn baud_rate(arg: cli::BaudArg) -> u32 {
    match arg {
        cli::BaudArg::B115200 => serial::BAUD_115_2K,
        cli::BaudArg::B230400 => serial::BAUD_230_4K,
        cli::BaudArg::B1000000 => serial::BAUD_1M,
    }
}

pub fn flasher_options(args: &cli::LinkArgs) -> FlasherOptions {
    FlasherOptions {
        link: LinkOptions {
            baud_rate: baud_rate(args.baud),
            ..Default::default()
        },
        timeouts: Timeouts {
            exchange: Duration::from_millis(args.timeout_ms),
            erase: Duration::from_millis(args.erase_timeout_ms),
        },
    }
}

pub fn flasher(args: &cli::LinkArgs) -> Flasher<SerialConnector> {
    Flasher::serial(flasher_options(args))
}
