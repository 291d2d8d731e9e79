pub mod pending_requests;
