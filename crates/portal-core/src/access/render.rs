//! ============================================================================
//! Render - Locked / unlocked views of the account page
//! ============================================================================
//! Pure functions from (courses, state) to a view tree. The gate mounts a
//! fresh tree on every render, so nothing from an earlier state survives.
//! ============================================================================

use serde::Serialize;

use super::types::{AccessState, Course, FileType, Material, PaymentStatus};

/// Message shown when a locked entry is clicked
pub const PAYMENT_REQUIRED_MESSAGE: &str = "Payment required to access this course";

pub const NO_COURSES_PLACEHOLDER: &str = "No courses yet";

pub const COURSES_UNAVAILABLE_PLACEHOLDER: &str = "Unable to load courses";

/// Where an entry leads when activated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkTarget {
    /// Navigable link
    Href { href: String },
    /// Not navigable; activation shows `message`
    Locked { message: String },
}

impl LinkTarget {
    fn for_state(state: AccessState, href: String) -> Self {
        if state.is_unlocked() {
            LinkTarget::Href { href }
        } else {
            LinkTarget::Locked {
                message: PAYMENT_REQUIRED_MESSAGE.to_string(),
            }
        }
    }

    pub fn is_navigable(&self) -> bool {
        matches!(self, LinkTarget::Href { .. })
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, LinkTarget::Locked { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialEntry {
    pub material_id: i64,
    pub label: String,
    pub file_type: FileType,
    pub target: LinkTarget,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseEntry {
    pub course_id: i64,
    pub label: String,
    pub target: LinkTarget,
    pub materials: Vec<MaterialEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListItem {
    Placeholder { text: String },
    Course(CourseEntry),
}

/// Outcome of clicking an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Navigate(String),
    ShowMessage(String),
    /// No entry at that position
    Missing,
}

/// Rendered course list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseListView {
    pub rendered_for: AccessState,
    pub items: Vec<ListItem>,
}

impl CourseListView {
    /// A list holding only a placeholder line
    pub fn placeholder(state: AccessState, text: &str) -> Self {
        Self {
            rendered_for: state,
            items: vec![ListItem::Placeholder { text: text.to_string() }],
        }
    }

    pub fn courses(&self) -> impl Iterator<Item = &CourseEntry> {
        self.items.iter().filter_map(|item| match item {
            ListItem::Course(entry) => Some(entry),
            ListItem::Placeholder { .. } => None,
        })
    }

    /// Every link target in document order (courses then their materials)
    pub fn targets(&self) -> impl Iterator<Item = &LinkTarget> {
        self.courses().flat_map(|course| {
            std::iter::once(&course.target).chain(course.materials.iter().map(|m| &m.target))
        })
    }

    pub fn locked_count(&self) -> usize {
        self.targets().filter(|t| t.is_locked()).count()
    }

    /// Click the course at `course_idx`, or one of its materials
    pub fn activate(&self, course_idx: usize, material_idx: Option<usize>) -> Activation {
        let Some(course) = self.courses().nth(course_idx) else {
            return Activation::Missing;
        };

        let target = match material_idx {
            None => &course.target,
            Some(idx) => match course.materials.get(idx) {
                Some(material) => &material.target,
                None => return Activation::Missing,
            },
        };

        match target {
            LinkTarget::Href { href } => Activation::Navigate(href.clone()),
            LinkTarget::Locked { message } => Activation::ShowMessage(message.clone()),
        }
    }

    pub fn to_html(&self) -> String {
        let mut html = String::from("<ul id=\"courses\">\n");
        for item in &self.items {
            match item {
                ListItem::Placeholder { text } => {
                    html.push_str(&format!("  <li>{}</li>\n", escape_html(text)));
                }
                ListItem::Course(course) => {
                    html.push_str(&format!(
                        "  <li>{}",
                        anchor_html(&course.label, &course.target)
                    ));
                    if !course.materials.is_empty() {
                        html.push_str("\n    <ul class=\"materials\">\n");
                        for material in &course.materials {
                            html.push_str(&format!("      <li>{}</li>\n", material_html(material)));
                        }
                        html.push_str("    </ul>\n  ");
                    }
                    html.push_str("</li>\n");
                }
            }
        }
        html.push_str("</ul>");
        html
    }
}

/// Build the course list for `state`. Same inputs, same output.
pub fn render_courses(courses: &[Course], state: AccessState) -> CourseListView {
    if courses.is_empty() {
        return CourseListView::placeholder(state, NO_COURSES_PLACEHOLDER);
    }

    let items = courses
        .iter()
        .map(|course| {
            ListItem::Course(CourseEntry {
                course_id: course.id,
                label: course.display_name(),
                target: LinkTarget::for_state(state, course.page_path()),
                materials: course
                    .materials
                    .iter()
                    .map(|material| render_material(material, state))
                    .collect(),
            })
        })
        .collect();

    CourseListView {
        rendered_for: state,
        items,
    }
}

fn render_material(material: &Material, state: AccessState) -> MaterialEntry {
    MaterialEntry {
        material_id: material.id,
        label: material.title.clone(),
        file_type: material.file_type.clone(),
        target: LinkTarget::for_state(state, material.stream_path.clone()),
    }
}

/// The whole gated part of the account page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountView {
    pub state: AccessState,
    pub status_label: String,
    pub pay_button_visible: bool,
    /// Amount due while unpaid
    pub amount_due: Option<f64>,
    pub courses: CourseListView,
}

impl AccountView {
    pub fn to_html(&self) -> String {
        let mut html = format!(
            "<span id=\"payment-status\" class=\"{}\">{}</span>\n",
            if self.state.is_unlocked() { "paid-animate" } else { "unpaid" },
            escape_html(&self.status_label)
        );
        if let Some(amount) = self.amount_due {
            html.push_str(&format!("<p class=\"amount-due\">Amount due: {:.2}</p>\n", amount));
        }
        if self.pay_button_visible {
            html.push_str("<button id=\"pay-btn\">Pay now</button>\n");
        }
        html.push_str(&self.courses.to_html());
        html
    }
}

pub fn render_account(
    state: AccessState,
    payment: Option<&PaymentStatus>,
    courses: CourseListView,
) -> AccountView {
    let locked_for_payment = state == AccessState::Unpaid;
    AccountView {
        state,
        status_label: state.label().to_string(),
        pay_button_visible: locked_for_payment,
        amount_due: if locked_for_payment {
            payment.and_then(|p| p.amount)
        } else {
            None
        },
        courses,
    }
}

fn anchor_html(label: &str, target: &LinkTarget) -> String {
    match target {
        LinkTarget::Href { href } => format!(
            "<a href=\"{}\">{}</a>",
            escape_html(href),
            escape_html(label)
        ),
        LinkTarget::Locked { message } => format!(
            "<span class=\"locked\" role=\"link\" aria-disabled=\"true\" title=\"{}\">🔒 {}</span>",
            escape_html(message),
            escape_html(label)
        ),
    }
}

fn material_html(material: &MaterialEntry) -> String {
    match (&material.file_type, &material.target) {
        // Audio streams in place with download and context menu disabled
        (FileType::Audio, LinkTarget::Href { href }) => format!(
            "<span>{}</span> <audio controls controlslist=\"nodownload\" oncontextmenu=\"return false\" draggable=\"false\" src=\"{}\"></audio>",
            escape_html(&material.label),
            escape_html(href)
        ),
        (_, target) => anchor_html(&material.label, target),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
