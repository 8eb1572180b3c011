//! ============================================================================
//! Access Gate - Payment-gated content visibility controller
//! ============================================================================
//! One controller per page load. It resolves the viewer's access state,
//! mounts the matching locked/unlocked view, shows the one-time "payment
//! verified" notice, and handles the return from the payment provider.
//!
//! ```text
//!   Unknown ──► Unpaid ◄──► Paid / Admin
//!      ▲                        │
//!      └──── check failed ◄─────┘
//! ```
//! ============================================================================

use std::sync::Arc;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::api::PortalApi;
use super::render::{
    render_account, render_courses, Activation, AccountView, CourseListView,
    COURSES_UNAVAILABLE_PLACEHOLDER,
};
use super::types::{AccessState, Course, PaymentStatus, UserProfile};
use crate::config::PortalConfig;
use crate::error::{ApiError, ErrorKind, GateError};
use crate::location::PageLocation;
use crate::notify::{Notice, Notifier};
use crate::storage::FlagStore;

/// Query parameter set by the payment provider's return URL
pub const PAYMENT_PARAM: &str = "payment";

/// Value of `PAYMENT_PARAM` marking a return from checkout
pub const PAYMENT_CALLBACK: &str = "callback";

pub const UNLOCKED_NOTICE: &str = "Payment verified ✅ Your courses are now unlocked";

const STATUS_CHECK_FAILED_NOTICE: &str = "Could not verify payment status. Reload to try again.";

const PAYMENT_INIT_FAILED_NOTICE: &str = "Payment initiation failed. Try again.";

const LOADING_COURSES_PLACEHOLDER: &str = "Loading courses…";

/// Course catalog as known to this page load
#[derive(Debug, Clone, PartialEq)]
enum Catalog {
    NotLoaded,
    Loaded(Vec<Course>),
    Failed,
}

/// A state change applied by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: AccessState,
    pub to: AccessState,
}

impl Transition {
    pub fn unlocked_now(&self) -> bool {
        !self.from.is_unlocked() && self.to.is_unlocked()
    }
}

/// Result of the page-load sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// Page rendered with the given state
    Rendered(AccessState),
    /// Identity check failed; the browser goes to the login page
    RedirectToLogin,
}

/// How a polling session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Unlocked(AccessState),
    /// Gave up after this many checks, still locked
    Exhausted(u32),
}

/// Access gate controller for one page load
pub struct AccessGateController {
    api: Arc<dyn PortalApi>,
    flags: Arc<dyn FlagStore>,
    notifier: Arc<dyn Notifier>,
    config: PortalConfig,
    location: PageLocation,
    state: AccessState,
    payment: Option<PaymentStatus>,
    catalog: Catalog,
    user: Option<UserProfile>,
    view: AccountView,
}

impl AccessGateController {
    pub fn new(
        api: Arc<dyn PortalApi>,
        flags: Arc<dyn FlagStore>,
        notifier: Arc<dyn Notifier>,
        config: PortalConfig,
        location: PageLocation,
    ) -> Self {
        let state = AccessState::Unknown;
        let view = render_account(
            state,
            None,
            CourseListView::placeholder(state, LOADING_COURSES_PLACEHOLDER),
        );

        Self {
            api,
            flags,
            notifier,
            config,
            location,
            state,
            payment: None,
            catalog: Catalog::NotLoaded,
            user: None,
            view,
        }
    }

    pub fn state(&self) -> AccessState {
        self.state
    }

    /// The currently mounted view
    pub fn view(&self) -> &AccountView {
        &self.view
    }

    pub fn location(&self) -> &PageLocation {
        &self.location
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn courses(&self) -> &[Course] {
        match &self.catalog {
            Catalog::Loaded(courses) => courses,
            Catalog::NotLoaded | Catalog::Failed => &[],
        }
    }

    // ========================================================================
    // State resolution
    // ========================================================================

    /// Ask the Payment Service for the viewer's access state.
    /// Never fails: 401 resolves to Unpaid, anything else broken to Unknown.
    pub async fn resolve_access_state(&self) -> AccessState {
        self.fetch_status().await.0
    }

    async fn fetch_status(&self) -> (AccessState, Option<PaymentStatus>) {
        match self.api.payment_status().await {
            Ok(payment) => {
                let state = payment.access_state();
                debug!("Payment status '{}' -> {:?}", payment.status, state);
                (state, Some(payment))
            }
            Err(e) => match e.kind() {
                ErrorKind::AuthRequired => {
                    debug!("Payment status requires login, showing locked view");
                    (AccessState::Unpaid, None)
                }
                ErrorKind::TransientNetwork | ErrorKind::MalformedResponse => {
                    warn!("Payment status check failed: {}", e);
                    self.notifier.notify(Notice::warning(STATUS_CHECK_FAILED_NOTICE));
                    (AccessState::Unknown, None)
                }
            },
        }
    }

    /// Resolve the state and apply it to the page
    pub async fn refresh(&mut self) -> AccessState {
        let (state, payment) = self.fetch_status().await;
        self.apply_state(state, payment);
        state
    }

    fn apply_state(&mut self, state: AccessState, payment: Option<PaymentStatus>) -> Transition {
        let transition = Transition {
            from: self.state,
            to: state,
        };

        if transition.from != transition.to {
            info!("Access state {:?} -> {:?}", transition.from, transition.to);
        }

        self.state = state;
        self.payment = payment;
        self.render_courses();

        if transition.unlocked_now() {
            self.notify_unlocked_once();
        }

        transition
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Replace the mounted view with one built from the current state
    pub fn render_courses(&mut self) {
        let courses = match &self.catalog {
            Catalog::Loaded(courses) => render_courses(courses, self.state),
            Catalog::NotLoaded => {
                CourseListView::placeholder(self.state, LOADING_COURSES_PLACEHOLDER)
            }
            Catalog::Failed => {
                CourseListView::placeholder(self.state, COURSES_UNAVAILABLE_PLACEHOLDER)
            }
        };

        self.view = render_account(self.state, self.payment.as_ref(), courses);
    }

    /// Click a course (or one of its materials) on the mounted view
    pub fn click(&self, course_idx: usize, material_idx: Option<usize>) -> Activation {
        let activation = self.view.courses.activate(course_idx, material_idx);
        if let Activation::ShowMessage(message) = &activation {
            self.notifier.notify(Notice::info(message.clone()));
        }
        activation
    }

    // ========================================================================
    // One-time notice
    // ========================================================================

    /// Show the "payment verified" notice unless its flag is already set.
    /// Returns whether the notice fired.
    pub fn notify_unlocked_once(&self) -> bool {
        if !self.state.is_unlocked() {
            return false;
        }

        let key = &self.config.toast_flag_key;
        match self.flags.get(key) {
            Ok(true) => {
                debug!("Unlock notice already shown ({})", key);
                false
            }
            Ok(false) => {
                self.notifier.notify(Notice::success(UNLOCKED_NOTICE));
                if let Err(e) = self.flags.set(key) {
                    warn!("Failed to persist notice flag {}: {}", key, e);
                }
                true
            }
            Err(e) => {
                // Skipping beats risking a repeat on every load
                warn!("Failed to read notice flag {}: {} - not showing", key, e);
                false
            }
        }
    }

    // ========================================================================
    // Payment redirect
    // ========================================================================

    /// Handle `?payment=callback` after returning from checkout.
    /// Returns false, touching nothing, when the marker is absent.
    pub async fn handle_payment_redirect_callback(&mut self) -> bool {
        if self.location.query_param(PAYMENT_PARAM).as_deref() != Some(PAYMENT_CALLBACK) {
            return false;
        }

        info!("Returned from payment provider, re-checking status");
        self.location.strip_query_param(PAYMENT_PARAM);

        // Session update on the backend can lag the redirect
        let delay = self.config.callback_delay();
        if !delay.is_zero() {
            debug!("Waiting {:?} before status re-check", delay);
            sleep(delay).await;
        }

        self.refresh().await;
        true
    }

    /// Start checkout and return the provider's authorization URL
    pub async fn start_payment(&self) -> Result<String, GateError> {
        if self.state.is_unlocked() {
            return Err(GateError::AlreadyUnlocked);
        }

        let response = match self.api.init_payment().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Payment initiation failed: {}", e);
                self.notifier.notify(Notice::error(PAYMENT_INIT_FAILED_NOTICE));
                return Err(e.into());
            }
        };

        match (response.status, response.data) {
            (true, Some(data)) => {
                info!("Payment session created, redirecting to provider");
                Ok(data.authorization_url)
            }
            (_, _) => {
                let message = response
                    .message
                    .unwrap_or_else(|| "Payment initialization failed".to_string());
                warn!("Payment initiation rejected: {}", message);
                self.notifier.notify(Notice::error(message.clone()));
                Err(GateError::PaymentRejected(message))
            }
        }
    }

    // ========================================================================
    // Page load
    // ========================================================================

    async fn load_courses(&mut self) {
        self.catalog = match self.api.my_courses().await {
            Ok(courses) => {
                debug!("Loaded {} courses", courses.len());
                Catalog::Loaded(courses)
            }
            Err(e) => {
                warn!("Failed to load courses: {}", e);
                self.notifier.notify(Notice::warning(COURSES_UNAVAILABLE_PLACEHOLDER));
                Catalog::Failed
            }
        };
    }

    /// Account page sequence: identity, catalog, then access state, then
    /// render. Rendering never runs ahead of state resolution.
    pub async fn load_page(&mut self) -> PageOutcome {
        match self.api.current_user().await {
            Ok(user) => {
                debug!("Signed in as {}", user.name);
                self.user = Some(user);
            }
            // Any non-2xx from the identity service counts as signed out
            Err(e @ (ApiError::AuthRequired | ApiError::Status { .. })) => {
                info!("Identity check failed ({}), redirecting to login", e);
                return PageOutcome::RedirectToLogin;
            }
            Err(e) => warn!("Failed to load user info: {}", e),
        }

        self.load_courses().await;

        if !self.handle_payment_redirect_callback().await {
            self.refresh().await;
        }

        PageOutcome::Rendered(self.state)
    }

    /// Re-check at a fixed interval until unlocked or out of checks.
    ///
    /// `poll_max_checks = Some(0)` is a budget of zero: nothing is fetched and
    /// the poll reports `Exhausted(0)`. `None` polls until unlocked.
    pub async fn poll_until_unlocked(&mut self) -> PollOutcome {
        if self.state.is_unlocked() {
            return PollOutcome::Unlocked(self.state);
        }
        if self.config.poll_max_checks == Some(0) {
            debug!("Poll budget is zero, no checks made");
            return PollOutcome::Exhausted(0);
        }

        let mut ticker = interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        let mut checks = 0u32;
        loop {
            ticker.tick().await;
            checks += 1;

            let state = self.refresh().await;
            if state.is_unlocked() {
                info!("Unlocked after {} checks, polling stopped", checks);
                return PollOutcome::Unlocked(state);
            }

            if let Some(max) = self.config.poll_max_checks {
                if checks >= max {
                    info!("Still locked after {} checks, polling stopped", checks);
                    return PollOutcome::Exhausted(checks);
                }
            }
        }
    }
}
