mod event;

pub use event::{StreamEvent, COMPLETE_STAGE};
