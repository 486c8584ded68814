pub mod delta;
pub mod vbyte;

pub use delta::DeltaEncoder;
pub use vbyte::VByteEncoder;
