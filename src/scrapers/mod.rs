pub mod base;
pub mod wikipedia;
pub mod yahoo;
