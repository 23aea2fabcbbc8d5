pub mod connection;
pub mod message;
pub mod notification;

pub use connection::{
    canonical_id, display_name, ConnectionRequest, MutualConnection, RequestStatus,
};
pub use message::{Message, MessageKind};
pub use notification::{Notification, NotificationKind};
