pub mod prelude;

pub mod certificates;
pub mod event_participants;
pub mod events;
pub mod invites;
pub mod student_roster;
pub mod users;
