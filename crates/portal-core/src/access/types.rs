//! ============================================================================
//! Access Types - Payment-gated access states, courses and materials
//! ============================================================================
//! Defines the access state machine values and the catalog records whose
//! visibility they gate, plus the wire shapes the portal backend returns.
//! ============================================================================

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Payment status string that unlocks content for a regular user
pub const STATUS_PAID: &str = "paid";

/// Payment status string reported for administrators
pub const STATUS_ADMIN: &str = "admin";

/// Access state of the current viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccessState {
    /// Not resolved yet, or the last check failed
    #[default]
    Unknown,
    /// Locked - payment required
    Unpaid,
    /// Unlocked by a completed payment
    Paid,
    /// Unlocked by admin role
    Admin,
}

impl AccessState {
    /// Map the backend's status string. Anything that is not exactly
    /// "paid" or "admin" stays locked.
    pub fn from_status(status: &str) -> Self {
        match status {
            STATUS_PAID => AccessState::Paid,
            STATUS_ADMIN => AccessState::Admin,
            _ => AccessState::Unpaid,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self, AccessState::Paid | AccessState::Admin)
    }

    /// Text of the account page status badge
    pub fn label(&self) -> &'static str {
        match self {
            AccessState::Unknown => "CHECKING…",
            AccessState::Unpaid => "UNPAID ❌",
            AccessState::Paid => "PAID ✅",
            AccessState::Admin => "ADMIN ✅",
        }
    }
}

/// Kind of course material
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileType {
    Audio,
    Pdf,
    Other(String),
}

impl FileType {
    pub fn as_str(&self) -> &str {
        match self {
            FileType::Audio => "audio",
            FileType::Pdf => "pdf",
            FileType::Other(s) => s,
        }
    }
}

impl From<&str> for FileType {
    fn from(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("audio") {
            FileType::Audio
        } else if raw.eq_ignore_ascii_case("pdf") {
            FileType::Pdf
        } else {
            // Unknown types feed `/stream/{type}/{id}`, so keep them verbatim
            FileType::Other(raw.to_string())
        }
    }
}

impl Serialize for FileType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FileType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(FileType::from(raw.as_str()))
    }
}

/// A piece of gated course content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Material {
    pub id: i64,
    pub title: String,
    pub file_type: FileType,
    pub stream_path: String,
}

impl Material {
    pub fn new(id: i64, title: impl Into<String>, file_type: FileType) -> Self {
        let stream_path = default_stream_path(id, &file_type);
        Self {
            id,
            title: title.into(),
            file_type,
            stream_path,
        }
    }
}

/// Backend route that streams a material's file
fn default_stream_path(id: i64, file_type: &FileType) -> String {
    format!("/stream/{}/{}", file_type.as_str(), id)
}

#[derive(Debug, Deserialize)]
struct RawMaterial {
    id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(alias = "fileType", alias = "type")]
    file_type: FileType,
    #[serde(default, alias = "streamPath", alias = "url")]
    stream_path: Option<String>,
}

impl<'de> Deserialize<'de> for Material {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawMaterial::deserialize(deserializer)?;
        let stream_path = raw
            .stream_path
            .unwrap_or_else(|| default_stream_path(raw.id, &raw.file_type));
        Ok(Material {
            id: raw.id,
            title: raw.title.unwrap_or_else(|| format!("Material {}", raw.id)),
            file_type: raw.file_type,
            stream_path,
        })
    }
}

/// A course with its ordered materials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    #[serde(alias = "course_code")]
    pub code: String,
    #[serde(alias = "course_title")]
    pub title: String,
    #[serde(default)]
    pub materials: Vec<Material>,
}

impl Course {
    /// Page that lists this course's materials
    pub fn page_path(&self) -> String {
        format!("/course/{}", self.id)
    }

    pub fn display_name(&self) -> String {
        format!("{} - {}", self.code, self.title)
    }
}

/// `{course, materials[]}` entry of the richer catalog shape
#[derive(Debug, Deserialize)]
pub struct CourseWithMaterials {
    pub course: Course,
    #[serde(default)]
    pub materials: Vec<Material>,
}

/// The two catalog shapes the courses endpoint has returned over time
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CoursesResponse {
    Enrolled {
        #[serde(default, deserialize_with = "null_as_empty")]
        courses: Vec<Course>,
    },
    Detailed(Vec<CourseWithMaterials>),
}

impl CoursesResponse {
    /// Flatten either shape into ordered courses
    pub fn into_courses(self) -> Vec<Course> {
        match self {
            CoursesResponse::Enrolled { courses } => courses,
            CoursesResponse::Detailed(entries) => entries
                .into_iter()
                .map(|entry| {
                    let mut course = entry.course;
                    if course.materials.is_empty() {
                        course.materials = entry.materials;
                    }
                    course
                })
                .collect(),
        }
    }
}

/// Payment status endpoint body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatus {
    pub status: String,
    #[serde(default)]
    pub amount: Option<f64>,
}

impl PaymentStatus {
    pub fn access_state(&self) -> AccessState {
        AccessState::from_status(&self.status)
    }
}

/// Payment init endpoint body (success or failure shape)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInitResponse {
    #[serde(default)]
    pub status: bool,
    #[serde(default)]
    pub data: Option<PaymentInitData>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentInitData {
    pub authorization_url: String,
}

/// Current user as reported by the identity endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub level: String,
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_status() {
        assert_eq!(AccessState::from_status("paid"), AccessState::Paid);
        assert_eq!(AccessState::from_status("admin"), AccessState::Admin);
        assert_eq!(AccessState::from_status("unpaid"), AccessState::Unpaid);
        // Loose matches must not unlock
        assert_eq!(AccessState::from_status("PAID"), AccessState::Unpaid);
        assert_eq!(AccessState::from_status("pending"), AccessState::Unpaid);
        assert_eq!(AccessState::from_status(""), AccessState::Unpaid);
    }

    #[test]
    fn test_unlocked_states() {
        assert!(!AccessState::Unknown.is_unlocked());
        assert!(!AccessState::Unpaid.is_unlocked());
        assert!(AccessState::Paid.is_unlocked());
        assert!(AccessState::Admin.is_unlocked());
        assert_eq!(AccessState::default(), AccessState::Unknown);
    }

    #[test]
    fn test_admin_and_paid_labels_differ() {
        assert_ne!(AccessState::Paid.label(), AccessState::Admin.label());
        assert_eq!(AccessState::Unpaid.label(), "UNPAID ❌");
    }

    #[test]
    fn test_enrolled_courses_shape() {
        let json = r#"{"courses":[{"id":3,"code":"MTH101","title":"Calculus"}]}"#;
        let courses = serde_json::from_str::<CoursesResponse>(json).unwrap().into_courses();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].display_name(), "MTH101 - Calculus");
        assert_eq!(courses[0].page_path(), "/course/3");
        assert!(courses[0].materials.is_empty());
    }

    #[test]
    fn test_detailed_courses_shape() {
        let json = r#"[
            {"course":{"id":1,"course_code":"PHY102","course_title":"Optics"},
             "materials":[
                {"id":7,"title":"Lecture 1","file_type":"audio"},
                {"id":8,"title":"Notes","fileType":"PDF","streamPath":"/files/notes.pdf"}
             ]}
        ]"#;
        let courses = serde_json::from_str::<CoursesResponse>(json).unwrap().into_courses();
        assert_eq!(courses[0].code, "PHY102");
        let materials = &courses[0].materials;
        assert_eq!(materials[0].file_type, FileType::Audio);
        assert_eq!(materials[0].stream_path, "/stream/audio/7");
        assert_eq!(materials[1].file_type, FileType::Pdf);
        assert_eq!(materials[1].stream_path, "/files/notes.pdf");
    }

    #[test]
    fn test_empty_courses_shape() {
        let courses = serde_json::from_str::<CoursesResponse>(r#"{"courses":[]}"#)
            .unwrap()
            .into_courses();
        assert!(courses.is_empty());
    }

    #[test]
    fn test_missing_or_null_courses_is_empty() {
        for body in [r#"{}"#, r#"{"courses":null}"#] {
            let courses = serde_json::from_str::<CoursesResponse>(body)
                .unwrap()
                .into_courses();
            assert!(courses.is_empty(), "body {}", body);
        }
    }

    #[test]
    fn test_unknown_file_type_preserved() {
        let material: Material =
            serde_json::from_str(r#"{"id":4,"title":"Slides","file_type":"pptx"}"#).unwrap();
        assert_eq!(material.file_type, FileType::Other("pptx".into()));
        assert_eq!(material.stream_path, "/stream/pptx/4");

        let material: Material =
            serde_json::from_str(r#"{"id":4,"title":"Slides","file_type":"PPTX"}"#).unwrap();
        assert_eq!(material.file_type, FileType::Other("PPTX".into()));
        assert_eq!(material.stream_path, "/stream/PPTX/4");

        assert_eq!(FileType::from("Audio"), FileType::Audio);
        assert_eq!(FileType::from("PDF"), FileType::Pdf);
    }

    #[test]
    fn test_user_level_number_or_string() {
        let user: UserProfile =
            serde_json::from_str(r#"{"name":"Ada","department":"Physics","level":200}"#).unwrap();
        assert_eq!(user.level, "200");
        let user: UserProfile =
            serde_json::from_str(r#"{"name":"Ada","department":"Physics","level":"300L"}"#).unwrap();
        assert_eq!(user.level, "300L");
    }

    #[test]
    fn test_payment_status_parsing() {
        let status: PaymentStatus =
            serde_json::from_str(r#"{"amount":20000,"status":"unpaid"}"#).unwrap();
        assert_eq!(status.access_state(), AccessState::Unpaid);
        assert_eq!(status.amount, Some(20000.0));
        let status: PaymentStatus = serde_json::from_str(r#"{"status":"admin"}"#).unwrap();
        assert_eq!(status.access_state(), AccessState::Admin);
        assert_eq!(status.amount, None);
    }

    #[test]
    fn test_payment_init_shapes() {
        let ok: PaymentInitResponse = serde_json::from_str(
            r#"{"status":true,"data":{"authorization_url":"https://checkout.test/abc"}}"#,
        )
        .unwrap();
        assert!(ok.status);
        assert_eq!(ok.data.unwrap().authorization_url, "https://checkout.test/abc");

        let err: PaymentInitResponse =
            serde_json::from_str(r#"{"status":false,"message":"User not found"}"#).unwrap();
        assert!(!err.status);
        assert_eq!(err.message.as_deref(), Some("User not found"));

        let bare: PaymentInitResponse = serde_json::from_str(r#"{"message":"nope"}"#).unwrap();
        assert!(!bare.status);
    }
}
