//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the session core and external systems.
//! Each port is a trait implemented by adapters in the infrastructure layer
//! or by the host application.

mod clock;
mod http_client;
mod storage;

pub use clock::Clock;
pub use http_client::{HttpClient, HttpRequest, HttpResponse, ResponseType};
pub use storage::KeyValueStore;
