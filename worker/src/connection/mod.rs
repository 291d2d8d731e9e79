pub mod worker_connection;
