pub mod codec;
pub mod entity;
