pub mod controller;
pub mod monitor;

pub use controller::SessionController;
pub use monitor::ProctorMonitor;
