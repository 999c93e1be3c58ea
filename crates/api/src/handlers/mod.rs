pub mod debug;
pub mod status;
