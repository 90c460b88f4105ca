pub mod geometry;
pub mod index_stack;
