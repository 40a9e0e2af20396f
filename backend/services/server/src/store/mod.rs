pub mod pg_store;

pub use pg_store::PgMarketStore;
