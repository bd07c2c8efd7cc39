//! Relay module - picks a reply for each incoming message.

pub mod client;
pub mod endpoint;
pub mod engine;
pub mod history;
pub mod selector;

pub use client::{RemoteClient, RemoteConfig, RemoteError};
pub use endpoint::{EndpointDescriptor, EndpointPool, PayloadShape};
pub use engine::{ResponseEngine, Stats};
pub use selector::{ChatContext, Intent};
