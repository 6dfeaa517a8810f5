// Repository layer: one repository per aggregate, all sharing the same DbPool

pub mod album;
pub mod calendar;
pub mod couple;
pub mod date_place;
pub mod inquiry;
pub mod user;

pub use album::{AlbumRepository, NewPhoto};
pub use calendar::{CalendarRepository, DateWindow, EventInput};
pub use couple::CoupleRepository;
pub use date_place::DatePlaceRepository;
pub use inquiry::InquiryRepository;
pub use user::{ProfileUpdate, UserRepository};
