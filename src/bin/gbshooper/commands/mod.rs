use gbshooper::api::OperationError;
use gbshooper::operation::{Operation, OperationEvent};
use gbshooper::runner;

use crate::exit_codes;
use crate::output::{Event, Reporter};

pub mod erase;
pub mod list;
pub mod query;
pub mod transfer;

/// Run `op` on a worker, render its progress, and report a failure.
/// Returns the exit code on error.
pub(crate) fn run_operation<T, Op>(
    operation: Operation,
    detail: Option<String>,
    out: &mut dyn Reporter,
    op: Op,
) -> Result<T, i32>
where
    T: Send + 'static,
    Op: FnOnce(&mut dyn FnMut(OperationEvent)) -> Result<T, OperationError> + Send + 'static,
{
    out.emit(Event::Start { operation, detail });

    let result = match runner::spawn(operation.as_str(), op) {
        Ok(handle) => handle.wait(|percent| out.emit(Event::Progress { operation, percent })),
        Err(e) => Err(e),
    };

    result.map_err(|e| report_error(&e, out))
}

pub(crate) fn report_error(e: &OperationError, out: &mut dyn Reporter) -> i32 {
    let code = exit_codes::for_error(e);
    out.emit(Event::Error {
        code,
        kind: Some(e.kind()),
        message: e.to_string(),
    });
    code
}
