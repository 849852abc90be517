//! Handlers 模块

pub mod control;
pub mod devices;
pub mod provisioning;
pub mod scan;
pub mod status;
pub mod system;

pub use control::*;
pub use devices::*;
pub use provisioning::*;
pub use scan::*;
pub use status::*;
pub use system::*;
