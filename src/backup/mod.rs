mod logic;
pub(crate) mod commands; // Administrative SQL and artifact naming
pub(crate) mod handler;
pub(crate) mod model;
pub(crate) mod status; // Task status classification

pub use handler::{handle_invocation, Collaborators, InvocationEvent, InvocationResponse};
