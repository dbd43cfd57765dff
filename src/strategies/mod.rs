pub mod rotation;
pub mod traits;
