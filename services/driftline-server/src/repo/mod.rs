pub mod calls;
pub mod friendships;
pub mod messages;
pub mod notifications;
pub mod rooms;
pub mod users;
