//! ============================================================================
//! PORTAL-CORE: Course portal access gate
//! ============================================================================
//! Client-side logic for the payment-gated account page:
//! - Access state resolution against the payment service
//! - Locked / unlocked rendering of courses and materials
//! - One-time "payment verified" notice backed by persisted flags
//! - Return-from-checkout handling and bounded status polling
//! ============================================================================

pub mod access;
pub mod config;
pub mod error;
pub mod location;
pub mod notify;
pub mod storage;

// Re-export main types for convenience
pub use access::{AccessGateController, AccessState, HttpPortalApi, PortalApi};
pub use config::PortalConfig;
pub use error::{ApiError, ErrorKind, GateError};
pub use location::PageLocation;
pub use notify::{Notice, NoticeLevel, Notifier, TracingNotifier};
pub use storage::{FlagStore, MemoryFlagStore, RedbFlagStore};
