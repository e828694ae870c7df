pub mod archive;
pub mod config;
pub mod fetcher;
pub mod followers;
pub mod gql;
pub mod model;
pub mod pipeline;
