//! qiot-server: Post-quantum telemetry ingestion server
//!
//! Publishes an ML-KEM public key, decapsulates per-message secrets, unmasks
//! device payloads and keeps a lock-free ledger of counters plus the latest
//! record.

pub mod error;
pub mod ingest;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ServerError;
pub use ingest::{ingest, Ingested};
pub use routes::create_router;
pub use server::{IngestServer, ServerBuilder};
pub use state::{create_shared_state, ServerState, SharedState};
