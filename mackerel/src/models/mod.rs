mod candidate;
mod queue;
mod resolution;

pub use candidate::*;
pub use queue::*;
pub use resolution::*;
