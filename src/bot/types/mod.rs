pub mod types;
pub mod builtin;
pub mod role;
