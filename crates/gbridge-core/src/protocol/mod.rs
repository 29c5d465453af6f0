//! Protocol module containing the RF tristate code encoding.

pub mod tristate;

pub use tristate::{command_code, TristateCode, TristateError, ADDRESS_LEN, COMMAND_LEN};
