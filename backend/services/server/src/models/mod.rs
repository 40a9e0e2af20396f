pub mod cache_model;
pub mod question_model;
