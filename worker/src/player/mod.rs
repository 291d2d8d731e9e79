pub mod player_connections;
