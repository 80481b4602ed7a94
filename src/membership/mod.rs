pub mod gate;
pub mod join;
