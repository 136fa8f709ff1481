pub mod cancel;
pub(crate) mod thread_name;

pub use cancel::CancellationToken;
