pub use super::certificates::Entity as Certificates;
pub use super::event_participants::Entity as EventParticipants;
pub use super::events::Entity as Events;
pub use super::invites::Entity as Invites;
pub use super::student_roster::Entity as StudentRoster;
pub use super::users::Entity as Users;
