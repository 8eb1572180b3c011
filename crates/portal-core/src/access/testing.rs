//! Scripted collaborators for controller tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::api::PortalApi;
use super::types::{Course, PaymentInitData, PaymentInitResponse, PaymentStatus, UserProfile};
use crate::error::ApiError;
use crate::notify::{Notice, Notifier};

/// Scripted payment-status reply
#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Status(&'static str),
    Unauthorized,
    NetworkDown,
    ServerError,
    Malformed,
}

impl Reply {
    fn to_result(self) -> Result<PaymentStatus, ApiError> {
        match self {
            Reply::Status(status) => Ok(PaymentStatus {
                status: status.to_string(),
                amount: Some(20000.0),
            }),
            Reply::Unauthorized => Err(ApiError::AuthRequired),
            Reply::NetworkDown => Err(ApiError::Network("connection refused".into())),
            Reply::ServerError => Err(ApiError::Status {
                status: 500,
                body: "Internal Server Error".into(),
            }),
            Reply::Malformed => Err(ApiError::Malformed("expected value at line 1".into())),
        }
    }
}

/// Replays payment-status replies in order; the last one repeats
pub struct FakePortalApi {
    replies: Mutex<VecDeque<Reply>>,
    courses: Mutex<Option<Vec<Course>>>,
    payment_rejection: Mutex<Option<String>>,
    signed_out: AtomicBool,
    status_calls: AtomicUsize,
}

impl FakePortalApi {
    pub fn new(replies: Vec<Reply>, courses: Vec<Course>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            courses: Mutex::new(Some(courses)),
            payment_rejection: Mutex::new(None),
            signed_out: AtomicBool::new(false),
            status_calls: AtomicUsize::new(0),
        }
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn sign_out(&self) {
        self.signed_out.store(true, Ordering::SeqCst);
    }

    pub fn set_courses(&self, courses: Vec<Course>) {
        *self.courses.lock().unwrap() = Some(courses);
    }

    pub fn fail_courses(&self) {
        *self.courses.lock().unwrap() = None;
    }

    pub fn reject_payment(&self, message: &str) {
        *self.payment_rejection.lock().unwrap() = Some(message.to_string());
    }
}

#[async_trait]
impl PortalApi for FakePortalApi {
    async fn payment_status(&self) -> Result<PaymentStatus, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().copied()
        };
        reply.unwrap_or(Reply::NetworkDown).to_result()
    }

    async fn init_payment(&self) -> Result<PaymentInitResponse, ApiError> {
        let rejection = self.payment_rejection.lock().unwrap().clone();
        Ok(match rejection {
            Some(message) => PaymentInitResponse {
                status: false,
                data: None,
                message: Some(message),
            },
            None => PaymentInitResponse {
                status: true,
                data: Some(PaymentInitData {
                    authorization_url: "https://checkout.test/session".into(),
                }),
                message: None,
            },
        })
    }

    async fn my_courses(&self) -> Result<Vec<Course>, ApiError> {
        self.courses
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::Status {
                status: 500,
                body: "Internal Server Error".into(),
            })
    }

    async fn current_user(&self) -> Result<UserProfile, ApiError> {
        if self.signed_out.load(Ordering::SeqCst) {
            return Err(ApiError::AuthRequired);
        }
        Ok(UserProfile {
            name: "Ada".into(),
            department: "Physics".into(),
            level: "200".into(),
        })
    }
}

/// Keeps every notice for later assertions
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// Answer exactly one HTTP request on loopback with a canned response.
/// Returns the base URL to point the client at.
pub fn serve_once(status_line: &str, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    );

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
    });

    format!("http://{}", addr)
}
