pub mod conversations;
pub mod follows;
pub mod messages;
pub mod rooms;
