//! Headless device stand-ins that let the core run without chip emulations.

/// Plain register-file device.
pub mod latch;
/// Register-file video chip with `INT1` interrupt logic.
pub mod video;

pub use latch::RegisterLatch;
pub use video::LatchedVideo;
