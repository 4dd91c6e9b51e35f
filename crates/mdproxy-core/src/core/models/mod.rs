pub mod grid;
pub mod ids;
pub mod particle;
