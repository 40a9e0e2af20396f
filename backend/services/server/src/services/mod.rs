pub mod question_cache;
pub mod refresh_worker;
