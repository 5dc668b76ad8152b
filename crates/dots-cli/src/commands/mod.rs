//! Command implementations

mod connection;
mod profiles;
mod resolve;
mod scan;
mod secrets;
mod status;
mod transfer;
mod watch;

pub use connection::run_test_connection;
pub use profiles::run_profiles;
pub use resolve::run_resolve;
pub use scan::run_scan;
pub use secrets::{run_check_secrets, run_sanitize};
pub use status::run_status;
pub use transfer::{TransferDirection, run_transfer};
pub use watch::run_watch;
