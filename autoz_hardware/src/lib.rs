pub mod error;
pub mod hx711;
pub mod pins;
pub mod sim;
pub mod util;

pub use error::HwError;
pub use hx711::Hx711;
pub use pins::PinRegistry;
pub use sim::{SimHandle, SimParams, SimState, SimulatedLoadCell, SimulatedPrinter, simulated};
