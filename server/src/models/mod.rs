pub mod event;
pub mod feedback;
pub mod notification;
pub mod registration;
pub mod user;

pub use event::{Category, Event, EventFilter, EventStatus, EventUpdate, NewEvent};
pub use feedback::{Feedback, NewFeedback};
pub use notification::{Notification, NotificationKind};
pub use registration::{Admission, Registration, RegistrationStatus, StatusTransition};
pub use user::{Identity, NewProfile, Profile, ProfileUpdate, Role};
