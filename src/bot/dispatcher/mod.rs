pub mod dispatcher;
pub mod links;
