pub mod builder;
pub mod health;
