pub mod decoder;
pub mod frame;

pub use decoder::LineDecoder;
pub use frame::FrameParser;
