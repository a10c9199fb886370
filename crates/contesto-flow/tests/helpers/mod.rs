//! Shared harness for submission-flow integration tests: in-memory
//! collaborators wired into a `SubmitFineService`, plus a real-socket
//! HTTP stub standing in for the downstream processing webhook.

use bytes::Bytes;
use contesto_core::models::{AuthUser, CandidateFile, UserProfile};
use contesto_db::{FineStore, MemoryFineStore, MemoryProfileStore, ProfileStore};
use contesto_flow::{
    AlertDeduper, IdentityService, MemoryDraftStore, OpsAlerter, ProcessingTrigger,
    ProcessingWebhookClient, StaticIdentityService, SubmitFineService, WebhookProcessingTrigger,
};
use contesto_storage::{MemoryStorage, Storage};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";

pub struct FlowHarness {
    pub identity: Arc<StaticIdentityService>,
    pub profiles: Arc<MemoryProfileStore>,
    pub fines: Arc<MemoryFineStore>,
    pub storage: Arc<MemoryStorage>,
    pub drafts: Arc<MemoryDraftStore>,
    pub service: SubmitFineService,
}

pub fn setup_flow(trigger: Arc<dyn ProcessingTrigger>) -> FlowHarness {
    let identity = Arc::new(StaticIdentityService::new());
    let profiles = Arc::new(MemoryProfileStore::new());
    let fines = Arc::new(MemoryFineStore::new());
    let storage = Arc::new(MemoryStorage::new());
    let drafts = Arc::new(MemoryDraftStore::new());

    let service = SubmitFineService::new(
        Arc::clone(&identity) as Arc<dyn IdentityService>,
        Arc::clone(&profiles) as Arc<dyn ProfileStore>,
        Arc::clone(&fines) as Arc<dyn FineStore>,
        Arc::clone(&storage) as Arc<dyn Storage>,
        Arc::clone(&drafts) as Arc<dyn contesto_flow::DraftStore>,
        trigger,
        Duration::from_secs(60),
    );

    FlowHarness {
        identity,
        profiles,
        fines,
        storage,
        drafts,
        service,
    }
}

/// Production trigger pointed at a stub URL, with alert email disabled.
pub fn webhook_trigger(webhook_url: &str) -> Arc<WebhookProcessingTrigger> {
    let client = ProcessingWebhookClient::new(
        webhook_url.to_string(),
        TEST_WEBHOOK_SECRET.to_string(),
        Duration::from_secs(5),
    )
    .expect("webhook client");
    let alerter = Arc::new(OpsAlerter::new(
        None,
        vec!["admin@contesto.fr".to_string()],
        AlertDeduper::default(),
    ));
    Arc::new(WebhookProcessingTrigger::new(client, alerter))
}

pub async fn sign_in(harness: &FlowHarness, is_anonymous: bool) -> AuthUser {
    let user = AuthUser {
        id: Uuid::new_v4(),
        email: if is_anonymous {
            None
        } else {
            Some("jean.dupont@example.com".to_string())
        },
        is_anonymous,
    };
    harness.identity.set_user(Some(user.clone())).await;
    user
}

pub async fn complete_profile(harness: &FlowHarness, user_id: Uuid) {
    harness
        .profiles
        .upsert_profile(
            user_id,
            &UserProfile {
                first_name: Some("Jean".to_string()),
                last_name: Some("Dupont".to_string()),
                address: Some("1 rue de la Paix, Paris".to_string()),
                phone: Some("0612345678".to_string()),
            },
        )
        .await
        .expect("profile upsert");
}

pub fn pdf_upload() -> CandidateFile {
    CandidateFile::new(
        "avis-amende.pdf",
        "application/pdf",
        Bytes::from(build_single_page_pdf()),
    )
}

/// Minimal valid one-page PDF with a correct xref table.
pub fn build_single_page_pdf() -> Vec<u8> {
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>",
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>",
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << >> >>",
    ];

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }
    let xref_pos = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_pos
        )
        .as_bytes(),
    );
    out
}

#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub signature: Option<String>,
    pub body: Vec<u8>,
}

/// One-endpoint HTTP server answering every POST with a fixed status
/// and body, recording what it received.
pub struct StubWebhook {
    pub url: String,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl StubWebhook {
    pub async fn start(status: u16, response_body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub webhook");
        let addr = listener.local_addr().expect("stub webhook addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    if let Some(request) = read_http_request(&mut socket).await {
                        if let Ok(mut requests) = recorded.lock() {
                            requests.push(request);
                        }
                    }
                    let response = format!(
                        "HTTP/1.1 {} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        status,
                        response_body.len(),
                        response_body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            url: format!("http://{}", addr),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

async fn read_http_request(socket: &mut TcpStream) -> Option<ReceivedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find_subslice(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = header_value(&headers, "content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = (header_end + content_length).min(buf.len());
    Some(ReceivedRequest {
        signature: header_value(&headers, "x-webhook-signature"),
        body: buf[header_end..body_end].to_vec(),
    })
}

fn header_value(headers: &str, name: &str) -> Option<String> {
    headers.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case(name) {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
