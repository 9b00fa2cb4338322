pub mod cache;
pub mod events;
pub mod factory;
pub mod lock;
pub mod repositories;
