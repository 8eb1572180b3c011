//! ============================================================================
//! Access Module - Payment-gated course access for the account page
//! ============================================================================
//! Decides which course content a viewer may open, based on the payment
//! status reported by the backend.
//!
//! ## States
//! - **Unknown**: not resolved yet, or the last check failed (locked)
//! - **Unpaid**: payment required (locked)
//! - **Paid**: payment completed (unlocked)
//! - **Admin**: administrator (unlocked, separate label)
//!
//! ## Usage
//! ```rust,ignore
//! use portal_core::access::{AccessGateController, HttpPortalApi};
//!
//! let api = Arc::new(HttpPortalApi::new(config.clone())?);
//! let mut gate = AccessGateController::new(api, flags, notifier, config, location);
//! gate.load_page().await;
//! gate.poll_until_unlocked().await;
//! ```
//! ============================================================================

mod api;
mod gate;
mod render;
mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export public types
pub use api::{
    HttpPortalApi, PortalApi, CURRENT_USER_PATH, MY_COURSES_PATH, PAYMENT_INIT_PATH,
    PAYMENT_STATUS_PATH,
};
pub use gate::{
    AccessGateController, PageOutcome, PollOutcome, Transition, PAYMENT_CALLBACK, PAYMENT_PARAM,
    UNLOCKED_NOTICE,
};
pub use render::{
    render_account, render_courses, AccountView, Activation, CourseEntry, CourseListView,
    LinkTarget, ListItem, MaterialEntry, COURSES_UNAVAILABLE_PLACEHOLDER, NO_COURSES_PLACEHOLDER,
    PAYMENT_REQUIRED_MESSAGE,
};
pub use types::{
    AccessState, Course, CoursesResponse, FileType, Material, PaymentInitData,
    PaymentInitResponse, PaymentStatus, UserProfile, STATUS_ADMIN, STATUS_PAID,
};
