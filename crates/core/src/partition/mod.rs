pub mod entity;
pub mod namer;
