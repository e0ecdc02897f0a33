pub mod core;
pub mod input;
pub mod prelude;
pub mod quantity;
pub mod tables;
