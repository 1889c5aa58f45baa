pub mod attempt;
pub mod delivery_marker;
pub mod recipient;
pub mod user_timezone;

pub use attempt::*;
pub use delivery_marker::*;
pub use recipient::*;
pub use user_timezone::*;
