//! Alert Service
//!
//! Video alert ingestion service for retail camera analytics. The service
//! accepts alert events referencing a video clip on a remote video server,
//! resolves the clip's pixel resolution, persists a durable record keyed by
//! the caller-supplied uuid, and emits a notification event.
//!
//! ## Features
//!
//! - **Strict Validation**: alert submissions are checked against the video
//!   extension allow-list before any I/O happens
//! - **Idempotent Ingestion**: the database unique constraint on the alert
//!   uuid is the single atomic duplicate check, safe under concurrent
//!   submissions of the same identifier
//! - **Isolated Decoding**: resolution extraction spills bytes to a per-call
//!   scratch file that is removed on every exit path
//! - **Structured Notifications**: successful ingestions emit a one-way
//!   notification event that can never fail the request
//!
//! ## Architecture
//!
//! ```text
//! POST /api/v1/alerts          Video Server              PostgreSQL
//! ┌──────────────┐           ┌──────────────┐          ┌──────────────┐
//! │ Ingestion    │──GET────▶│ /videos/...  │          │ alerts       │
//! │ Handler      │           └──────────────┘          │ (uuid UNIQUE)│
//! └──────────────┘                                     └──────────────┘
//!        │                                                    ▲
//!        ▼                                                    │
//! ┌──────────────┐           ┌──────────────┐                │
//! │ Resolution   │           │ Alert        │────────────────┘
//! │ Extractor    │──────────▶│ Store        │
//! └──────────────┘           └──────────────┘
//!        │                          │
//!        ▼                          ▼
//! ┌──────────────┐           ┌──────────────┐
//! │ ffprobe      │           │ Notifier     │
//! │ (scratch)    │           │ (log sink)   │
//! └──────────────┘           └──────────────┘
//! ```

pub mod alert_store;
pub mod api;
pub mod config;
pub mod notifier;
pub mod resolution;
pub mod video_fetcher;

pub use alert_store::{AlertRecord, AlertStore, NewAlert, PgAlertStore, StoreError};
pub use api::{create_router, start_api_server, AppState, SubmitResponse};
pub use config::Config;
pub use notifier::{LogNotifier, NotificationEvent, Notifier};
pub use resolution::{DecodeError, FfprobeExtractor, Resolution, ResolutionExtractor};
pub use video_fetcher::{FetchError, HttpVideoFetcher, VideoFetcher};
