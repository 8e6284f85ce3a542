pub mod frame;
pub mod push;
