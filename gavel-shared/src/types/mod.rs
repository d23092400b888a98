pub mod api;
pub mod report;
pub mod target;
pub mod thing;

pub use report::*;
pub use target::*;
pub use thing::*;
