
pub use test_connection::{SentCommand, TestConnection};
pub use test_receiver::TestReceiver;
