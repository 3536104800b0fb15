pub mod health;
pub mod node_chat;
pub mod strategy;
pub mod strategy_stream;
