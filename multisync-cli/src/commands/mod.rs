pub mod profile;
pub mod rule;
pub mod sync;
pub mod watch;
