pub mod embedding;
pub mod http;
pub mod index;
pub mod logging;
pub mod mapping;
pub mod payload;
pub mod services;
