pub mod tikwm;

pub use tikwm::TikwmExtractor;
