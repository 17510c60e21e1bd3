pub mod follow_store;
pub mod stack_client;
pub mod store;
pub mod ui;
