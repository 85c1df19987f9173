pub mod ads;
pub mod business;
pub mod order;

pub use ads::*;
pub use business::*;
pub use order::*;
