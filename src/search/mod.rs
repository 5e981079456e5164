pub mod postgres;
pub mod store;
pub mod vector;
