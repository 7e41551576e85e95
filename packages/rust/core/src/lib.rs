//! Copydesk core: turns company records into marketing copy.
//!
//! [`generator::DescriptionGenerator`] walks a company directory, asks a chat
//! completion service for an HTML description plus SEO metadata per company,
//! and keeps a CSV of the results up to date as it goes.

pub mod client;
pub mod employees;
pub mod generator;
pub mod output;
pub mod prompt;
