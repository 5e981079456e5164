pub mod health;
pub mod semantic;
