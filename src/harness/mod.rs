pub mod run;
pub mod types;

pub use run::{run_harness, upload_all};
pub use types::{HarnessConfig, HarnessError, HarnessResult};
