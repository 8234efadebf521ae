pub mod errors;
pub mod graphql;
pub mod objects;
pub mod resources;
pub mod server;
mod server_handler;
pub mod tools;
pub mod workspace;
