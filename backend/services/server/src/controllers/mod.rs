pub mod health_controller;
pub mod index_controller;
pub mod market_controller;
