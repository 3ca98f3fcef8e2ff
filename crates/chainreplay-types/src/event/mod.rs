mod domain;
mod projected;
mod raw;

pub use domain::*;
pub use projected::*;
pub use raw::*;
