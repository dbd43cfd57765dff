pub mod clock;
pub mod engine;
pub mod retry;
pub mod sizer;
