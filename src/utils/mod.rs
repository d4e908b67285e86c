// Shared utils

pub mod clock;
pub mod constants;
pub mod storage;

pub use clock::*;
pub use constants::*;
pub use storage::*;
