#[macro_use]
mod macros;

pub mod cost;
pub mod energy;
pub mod percent;
pub mod price;
mod zero;

pub use self::zero::Zero;
