pub mod action;
pub mod error;
pub mod problem;
pub mod schedule;
pub mod site;
pub mod slot;
pub mod solver;
pub mod transition;
