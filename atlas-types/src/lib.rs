pub mod country;
pub mod errors;
pub mod messages;
pub mod room;

// Re-export all types
pub use country::*;
pub use errors::*;
pub use messages::*;
pub use room::*;
