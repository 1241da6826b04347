//! One module per subcommand.

pub mod compare;
pub mod create;
pub mod info;
pub mod verify;
