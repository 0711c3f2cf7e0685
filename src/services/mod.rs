pub mod etl_service;
pub mod loader;
pub mod transform;
