mod backend;
mod backends;
mod result;

pub use backend::DetectorBackend;
pub use backends::{ReplayBackend, StubBackend};
pub use result::RawDetection;
