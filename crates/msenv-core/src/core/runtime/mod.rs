pub mod effects;
pub mod process;
