pub mod catalog;
pub mod interview;
