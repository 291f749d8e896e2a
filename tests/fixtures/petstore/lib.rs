//! Petstore API.
//!
//! swag:meta
//! title: Petstore
//! version: 1.0.0
//! description: Sample store used by the integration tests
//! host: petstore.example.com
//! basePath: /v1
//! schemes: http, https
//! produces: application/json

mod handlers;
mod models;

pub use handlers::PetHandlers;
