//! Sea-ORM entities for huddle-store

pub mod ai_messages;
pub mod attachments;
pub mod messages;
pub mod notifications;
pub mod participants;
pub mod read_status;
pub mod relationships;
pub mod sessions;
pub mod users;

pub use ai_messages::Entity as AiMessages;
pub use attachments::Entity as Attachments;
pub use messages::Entity as Messages;
pub use notifications::Entity as Notifications;
pub use participants::Entity as Participants;
pub use read_status::Entity as ReadStatus;
pub use relationships::Entity as Relationships;
pub use sessions::Entity as Sessions;
pub use users::Entity as Users;
