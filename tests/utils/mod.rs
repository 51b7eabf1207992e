pub mod factories;
pub mod test_db;
