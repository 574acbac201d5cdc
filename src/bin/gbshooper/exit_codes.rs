use gbshooper::api::{ErrorKind, OperationError};

pub const EXIT_OK: i32 = 0;
pub const EXIT_NO_DEVICE: i32 = 10;
pub const EXIT_OPEN_FAILED: i32 = 11;
pub const EXIT_TIMEOUT: i32 = 12;
pub const EXIT_PROTOCOL_MISMATCH: i32 = 13;
pub const EXIT_BAD_CHECKSUM: i32 = 14;
pub const EXIT_HARDWARE: i32 = 15;
pub const EXIT_IO: i32 = 16;

pub fn for_kind(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::DeviceNotFound => EXIT_NO_DEVICE,
        ErrorKind::OpenFailed => EXIT_OPEN_FAILED,
        ErrorKind::Timeout => EXIT_TIMEOUT,
        ErrorKind::ProtocolMismatch => EXIT_PROTOCOL_MISMATCH,
        ErrorKind::BadChecksum => EXIT_BAD_CHECKSUM,
        ErrorKind::HardwareError => EXIT_HARDWARE,
        ErrorKind::Io => EXIT_IO,
    }
}

pub fn for_error(e: &OperationError) -> i32 {
    for_kind(e.kind())
}
