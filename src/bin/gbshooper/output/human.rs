use std::io::{IsTerminal, Write};

use gbshooper::api::{ChipId, RomHeader, Status};
use gbshooper::operation::Operation;
use gbshooper::serial::{self, FlasherPort};

use crate::output::{describe, format_port_line, Event, OutputOptions, Reporter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Quiet,
    Verbose,
    Progress,
}

pub struct HumanOutput {
    opts: OutputOptions,
    is_tty: bool,
    progress_active: bool,
    last_percent: Option<u8>,
}

impl HumanOutput {
    pub fn new(opts: OutputOptions) -> Self {
        Self {
            opts,
            is_tty: std::io::stderr().is_terminal(),
            progress_active: false,
            last_percent: None,
        }
    }

    fn mode(&self) -> Mode {
        if self.opts.quiet {
            Mode::Quiet
        } else if self.opts.verbose {
            Mode::Verbose
        } else {
            Mode::Progress
        }
    }

    fn finish_line(&mut self) {
        if self.progress_active {
            eprintln!();
            self.progress_active = false;
        }
    }

    fn println(&mut self, msg: &str) {
        if self.mode() == Mode::Quiet {
            return;
        }
        self.finish_line();
        eprintln!("{msg}");
    }

    /// Results go to stdout regardless of `--quiet`.
    fn result_line(&mut self, msg: &str) {
        self.finish_line();
        println!("{msg}");
    }

    fn progress_update(&mut self, operation: Operation, percent: u8) {
        match self.mode() {
            Mode::Quiet => {}
            Mode::Verbose => {
                self.println(&format!("  {} {percent:3}%", describe(operation)));
            }
            Mode::Progress if self.is_tty => {
                eprint!("\r  {} {percent:3}%", describe(operation));
                let _ = std::io::stderr().flush();
                self.progress_active = true;
                self.last_percent = Some(percent);
            }
            Mode::Progress => {
                let last = self.last_percent.unwrap_or(0);
                if percent == 0 || percent == 100 || percent >= last.saturating_add(10) {
                    self.last_percent = Some(percent);
                    self.println(&format!("  {} {percent:3}%", describe(operation)));
                }
            }
        }
    }

    pub(crate) fn status_lines(s: &Status) -> Vec<String> {
        vec![
            format!("GB Shooper (id 0x{:02X})", s.device_id),
            format!("firmware version: {}.{}", s.major, s.minor),
        ]
    }

    pub(crate) fn chip_lines(c: &ChipId) -> Vec<String> {
        vec![
            format!("manufacturer: {} (0x{:02X})", c.manufacturer, c.manufacturer.code),
            format!("flash chip: {} (0x{:02X})", c.chip, c.chip.code),
        ]
    }

    pub(crate) fn header_lines(h: &RomHeader) -> Vec<String> {
        vec![
            format!("title: {}", h.title),
            format!("cart type: {} (0x{:02X})", h.cart, h.cart.code),
            format!("ROM size: {}", h.rom),
            format!("RAM size: {}", h.ram),
        ]
    }

    fn emit_list(&mut self, ports: &[FlasherPort]) {
        if ports.is_empty() {
            self.println(&format!(
                "No flasher found ({} / {}, FTDI {:04X}:{:04X})",
                serial::ID_MANUFACTURER,
                serial::ID_PRODUCT,
                serial::FTDI_VID,
                serial::FTDI_PID
            ));
            return;
        }
        for (i, p) in ports.iter().enumerate() {
            self.result_line(&format_port_line(i, p));
        }
    }
}

impl Reporter for HumanOutput {
    fn emit(&mut self, event: Event) {
        match event {
            Event::Start { operation, detail } => {
                self.last_percent = None;
                let query = matches!(
                    operation,
                    Operation::Status | Operation::ChipId | Operation::ReadHeader
                );
                match (self.mode(), detail) {
                    (Mode::Verbose, Some(d)) => {
                        self.println(&format!("{}: {d}", describe(operation)))
                    }
                    (Mode::Verbose, None) => self.println(&format!("{}...", describe(operation))),
                    (Mode::Progress, _) if !query => {
                        self.println(&format!("{}...", describe(operation)))
                    }
                    _ => {}
                }
            }
            Event::Progress { operation, percent } => self.progress_update(operation, percent),
            Event::Status(s) => {
                for line in Self::status_lines(&s) {
                    self.result_line(&line);
                }
            }
            Event::ChipId(c) => {
                for line in Self::chip_lines(&c) {
                    self.result_line(&line);
                }
            }
            Event::Header(h) => {
                for line in Self::header_lines(&h) {
                    self.result_line(&line);
                }
            }
            Event::Erased { memory } => {
                self.finish_line();
                self.println(&format!("{memory} erased"));
            }
            Event::Transferred {
                operation,
                path,
                bytes,
            } => {
                self.finish_line();
                let verb = match operation {
                    Operation::ReadFlash | Operation::ReadRam => "saved to",
                    _ => "written from",
                };
                self.println(&format!("ok: {bytes} bytes {verb} {}", path.display()));
            }
            Event::ListDevices(ports) => self.emit_list(&ports),
            Event::Error { message, .. } => {
                self.finish_line();
                eprintln!("error: {message}");
            }
        }
    }

    fn finish(&mut self) {
        self.finish_line();
    }
}
