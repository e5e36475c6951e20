pub mod signals;
pub mod analysis;
pub mod report;

pub use signals::*;
pub use analysis::*;
pub use report::*;
