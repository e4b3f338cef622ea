// runner-sdk: foundation layer for runner-setup.
// No dependencies on the other workspace crates; provides the trace trait,
// child-process invocation and small string helpers.

pub mod build_constants;
pub mod process_invoker;
pub mod string_util;
pub mod trace;

pub use build_constants::{SetupPackage, Source};
pub use process_invoker::{
    OutputStream, ProcessDataReceivedEventArgs, ProcessExitCodeError, ProcessInvoker,
    ProcessOutput,
};
pub use string_util::StringUtil;
pub use trace::TraceWriter;
