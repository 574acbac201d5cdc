use std::path::PathBuf;

use gbshooper::api::{ChipId, ErrorKind, RomHeader, Status};
use gbshooper::operation::{Memory, Operation};
use gbshooper::serial::FlasherPort;

use crate::cli;

pub mod human;
pub mod json;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub verbose: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub enum Event {
    Start {
        operation: Operation,
        detail: Option<String>,
    },
    Progress {
        operation: Operation,
        percent: u8,
    },
    Status(Status),
    ChipId(ChipId),
    Header(RomHeader),
    Erased {
        memory: Memory,
    },
    Transferred {
        operation: Operation,
        path: PathBuf,
        bytes: u64,
    },
    ListDevices(Vec<FlasherPort>),
    Error {
        code: i32,
        kind: Option<ErrorKind>,
        message: String,
    },
}

pub trait Reporter {
    fn emit(&mut self, event: Event);
    fn finish(&mut self);
}

pub fn make(args: &cli::OutputArgs) -> Box<dyn Reporter> {
    let opts = OutputOptions {
        verbose: args.verbose,
        quiet: args.quiet,
    };
    if args.json {
        Box::new(json::JsonOutput::new(opts))
    } else {
        Box::new(human::HumanOutput::new(opts))
    }
}

pub fn make_for_list(args: &cli::ListArgs) -> Box<dyn Reporter> {
    let opts = OutputOptions {
        verbose: false,
        quiet: false,
    };
    if args.json {
        Box::new(json::JsonOutput::new(opts))
    } else {
        Box::new(human::HumanOutput::new(opts))
    }
}

pub fn port_to_value(index: usize, p: &FlasherPort) -> serde_json::Value {
    let mut v = serde_json::to_value(p)
        .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));
    if let serde_json::Value::Object(obj) = &mut v {
        obj.insert("index".to_string(), serde_json::Value::from(index as u64));
    }
    v
}

pub fn format_port_line(index: usize, p: &FlasherPort) -> String {
    format!(
        "[{index}] {} {:04X}:{:04X} {}",
        p.port_name,
        p.vid,
        p.pid,
        p.serial_number.as_deref().unwrap_or("")
    )
    .trim_end()
    .to_string()
}

/// Verb for progress lines ("reading flash", "erasing RAM").
pub fn describe(operation: Operation) -> &'static str {
    match operation {
        Operation::Status => "checking status",
        Operation::ChipId => "identifying flash chip",
        Operation::ReadHeader => "reading header",
        Operation::EraseFlash => "erasing flash",
        Operation::EraseRam => "erasing RAM",
        Operation::WriteFlash => "writing flash",
        Operation::ReadFlash => "reading flash",
        Operation::WriteRam => "writing RAM",
        Operation::ReadRam => "reading RAM",
    }
}
