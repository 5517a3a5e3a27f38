pub mod config;
pub mod progress;

pub use config::load_config;
pub use progress::BarProgress;
