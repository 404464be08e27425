pub mod constants;
pub mod controller;
pub mod rom;
pub mod runtime;

pub use self::rom::Rom;
pub use self::runtime::{Emulator, Scheduler};
