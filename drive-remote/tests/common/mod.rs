#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use drive_remote::paths::{ROOT_PATH, join};
use drive_remote::{Remote, RemoteConfig};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const FOLDER: &str = "application/vnd.google-apps.folder";

#[derive(Debug, Clone)]
pub struct Entry {
    pub id: String,
    pub title: String,
    pub mime_type: String,
    pub parents: Vec<String>,
    pub trashed: bool,
    pub shared: bool,
    pub md5: Option<String>,
    pub size: i64,
    pub modified: String,
}

impl Entry {
    fn to_json(&self) -> Value {
        let mut value = json!({
            "id": self.id,
            "title": self.title,
            "mimeType": self.mime_type,
            "modifiedDate": self.modified,
            "parents": self.parents.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>(),
            "labels": { "trashed": self.trashed },
            "fileSize": self.size.to_string(),
        });
        if let Some(md5) = &self.md5 {
            value["md5Checksum"] = json!(md5);
        }
        value
    }
}

#[derive(Debug, Clone)]
pub struct Call {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Decoded `q` search expression, if any.
    pub q: Option<String>,
    pub with_media: bool,
    pub metadata: Option<Value>,
}

impl Call {
    pub fn is_mutation(&self) -> bool {
        self.method == "POST" || self.method == "PUT"
    }
}

#[derive(Default)]
struct State {
    files: Vec<Entry>,
    calls: Vec<Call>,
    next_id: usize,
    fail_lists: bool,
}

/// In-memory object graph answering the files endpoints the way the store does.
#[derive(Clone, Default)]
pub struct FakeDrive {
    state: Arc<Mutex<State>>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn add_dir(&self, id: &str, title: &str, parent: &str) {
        self.add(Entry {
            id: id.into(),
            title: title.into(),
            mime_type: FOLDER.into(),
            parents: vec![parent.into()],
            trashed: false,
            shared: false,
            md5: None,
            size: 0,
            modified: "2024-01-01T00:00:00.000Z".into(),
        });
    }

    pub fn add_file(&self, id: &str, title: &str, parent: &str, md5: &str, size: i64) {
        self.add(Entry {
            id: id.into(),
            title: title.into(),
            mime_type: "text/plain".into(),
            parents: vec![parent.into()],
            trashed: false,
            shared: false,
            md5: Some(md5.into()),
            size,
            modified: "2024-01-01T00:00:00.000Z".into(),
        });
    }

    pub fn add(&self, entry: Entry) {
        self.lock().files.push(entry);
    }

    pub fn entry(&self, id: &str) -> Option<Entry> {
        self.lock().files.iter().find(|e| e.id == id).cloned()
    }

    pub fn entries_titled(&self, title: &str) -> Vec<Entry> {
        self.lock()
            .files
            .iter()
            .filter(|e| e.title == title)
            .cloned()
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn fail_lists(&self) {
        self.lock().fail_lists = true;
    }

    pub async fn mount(&self, server: &MockServer) {
        Mock::given(any())
            .respond_with(self.clone())
            .mount(server)
            .await;
    }

    fn list(&self, request: &Request) -> ResponseTemplate {
        let state = self.lock();
        if state.fail_lists {
            return ResponseTemplate::new(500).set_body_string("backend error");
        }
        let q = query_value(request, "q").unwrap_or_default();
        let terms: Vec<Term> = q
            .split(" and ")
            .filter(|t| !t.is_empty())
            .map(parse_term)
            .collect();
        let matching: Vec<&Entry> = state
            .files
            .iter()
            .filter(|entry| terms.iter().all(|term| term.matches(entry)))
            .collect();

        let offset = query_value(request, "pageToken")
            .and_then(|t| t.parse::<usize>().ok())
            .unwrap_or(0);
        let max = query_value(request, "maxResults")
            .and_then(|m| m.parse::<usize>().ok())
            .unwrap_or(100);
        let items: Vec<Value> = matching
            .iter()
            .skip(offset)
            .take(max)
            .map(|e| e.to_json())
            .collect();
        let mut body = json!({ "items": items });
        if offset + max < matching.len() {
            body["nextPageToken"] = json!((offset + max).to_string());
        }
        ResponseTemplate::new(200).set_body_json(body)
    }

    fn get(&self, id: &str) -> ResponseTemplate {
        if id == "root" {
            return ResponseTemplate::new(200).set_body_json(json!({
                "id": "root",
                "title": "My Drive",
                "mimeType": FOLDER,
                "parents": []
            }));
        }
        match self.entry(id) {
            Some(entry) => ResponseTemplate::new(200).set_body_json(entry.to_json()),
            None => ResponseTemplate::new(404).set_body_string("file not found"),
        }
    }

    fn insert(&self, metadata: &Value, content: Option<&[u8]>) -> ResponseTemplate {
        let mut state = self.lock();
        state.next_id += 1;
        let entry = Entry {
            id: format!("new{}", state.next_id),
            title: metadata["title"].as_str().unwrap_or_default().to_string(),
            mime_type: metadata["mimeType"]
                .as_str()
                .unwrap_or("application/octet-stream")
                .to_string(),
            parents: parent_ids(metadata),
            trashed: false,
            shared: false,
            md5: content.map(|bytes| format!("{:x}", md5::compute(bytes))),
            size: content.map(|bytes| bytes.len() as i64).unwrap_or(0),
            modified: metadata["modifiedDate"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        };
        state.files.push(entry.clone());
        ResponseTemplate::new(200).set_body_json(entry.to_json())
    }

    fn update(&self, id: &str, metadata: &Value, content: Option<&[u8]>) -> ResponseTemplate {
        let mut state = self.lock();
        let Some(entry) = state.files.iter_mut().find(|e| e.id == id) else {
            return ResponseTemplate::new(404).set_body_string("file not found");
        };
        if let Some(title) = metadata["title"].as_str() {
            entry.title = title.to_string();
        }
        if let Some(mime) = metadata["mimeType"].as_str() {
            entry.mime_type = mime.to_string();
        }
        if let Some(modified) = metadata["modifiedDate"].as_str() {
            entry.modified = modified.to_string();
        }
        let parents = parent_ids(metadata);
        if !parents.is_empty() {
            entry.parents = parents;
        }
        if let Some(bytes) = content {
            entry.md5 = Some(format!("{:x}", md5::compute(bytes)));
            entry.size = bytes.len() as i64;
        }
        ResponseTemplate::new(200).set_body_json(entry.to_json())
    }

    fn set_trashed(&self, id: &str, trashed: bool) -> ResponseTemplate {
        let mut state = self.lock();
        match state.files.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.trashed = trashed;
                ResponseTemplate::new(200).set_body_json(entry.to_json())
            }
            None => ResponseTemplate::new(404).set_body_string("file not found"),
        }
    }
}

impl Respond for FakeDrive {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let method = request.method.as_str().to_string();
        let path = request.url.path().to_string();
        let upload = path.starts_with("/upload/");
        let (metadata, content) = if upload {
            let (json, content) = split_multipart(&request.body);
            (serde_json::from_slice::<Value>(&json).ok(), Some(content))
        } else {
            (serde_json::from_slice::<Value>(&request.body).ok(), None)
        };
        self.lock().calls.push(Call {
            method: method.clone(),
            path: path.clone(),
            query: request.url.query().map(str::to_string),
            q: query_value(request, "q"),
            with_media: content.is_some(),
            metadata: metadata.clone(),
        });

        let rest = path
            .trim_start_matches("/upload")
            .trim_start_matches("/drive/v2/files");
        let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
        let metadata = metadata.unwrap_or(Value::Null);
        match (method.as_str(), segments.as_slice()) {
            ("GET", []) => self.list(request),
            ("GET", [id]) => self.get(id),
            ("POST", []) => self.insert(&metadata, content.as_deref()),
            ("PUT", [id]) => self.update(id, &metadata, content.as_deref()),
            ("POST", [id, "trash"]) => self.set_trashed(id, true),
            ("POST", [id, "untrash"]) => self.set_trashed(id, false),
            ("POST", [id, "touch"]) => self.get(id),
            ("DELETE", ["trash"]) => {
                self.lock().files.retain(|e| !e.trashed);
                ResponseTemplate::new(204)
            }
            _ => ResponseTemplate::new(404).set_body_string("unknown endpoint"),
        }
    }
}

/// Routes library logs to the test output; set `RUST_LOG=drive_remote=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub async fn remote_for(server: &MockServer) -> Remote {
    init_tracing();
    let config = RemoteConfig::default().with_api_base_url(server.uri());
    Remote::with_token(config, "test-token").unwrap()
}

pub async fn fake_remote() -> (MockServer, FakeDrive, Remote) {
    fake_remote_with(|_| {}).await
}

pub async fn fake_remote_with(
    configure: impl FnOnce(&mut RemoteConfig),
) -> (MockServer, FakeDrive, Remote) {
    init_tracing();
    let server = MockServer::start().await;
    let fake = FakeDrive::new();
    fake.mount(&server).await;
    let mut config = RemoteConfig::default().with_api_base_url(server.uri());
    configure(&mut config);
    let remote = Remote::with_token(config, "test-token").unwrap();
    (server, fake, remote)
}

/// Rebuilds `/a/b/c` from an id by following first parents up to the root.
pub fn path_of(fake: &FakeDrive, id: &str) -> String {
    let mut names = Vec::new();
    let mut current = id.to_string();
    while current != "root" {
        let entry = fake.entry(&current).expect("dangling parent reference");
        names.push(entry.title.clone());
        current = entry.parents.first().cloned().unwrap_or_else(|| "root".into());
    }
    names
        .iter()
        .rev()
        .fold(ROOT_PATH.to_string(), |path, name| join(&path, name))
}

enum Term {
    Parent(String),
    Title(String),
    Trashed(bool),
    SharedWithMe,
}

impl Term {
    fn matches(&self, entry: &Entry) -> bool {
        match self {
            Term::Parent(id) => entry.parents.iter().any(|p| p == id),
            Term::Title(title) => &entry.title == title,
            Term::Trashed(trashed) => entry.trashed == *trashed,
            Term::SharedWithMe => entry.shared,
        }
    }
}

fn parse_term(term: &str) -> Term {
    let term = term.trim();
    if let Some(quoted) = term.strip_suffix(" in parents") {
        Term::Parent(unquote(quoted))
    } else if let Some(quoted) = term.strip_prefix("title = ") {
        Term::Title(unquote(quoted))
    } else if let Some(flag) = term.strip_prefix("trashed = ") {
        Term::Trashed(flag == "true")
    } else if term == "sharedWithMe = true" {
        Term::SharedWithMe
    } else {
        panic!("unsupported query term: {term}")
    }
}

fn unquote(quoted: &str) -> String {
    let inner = quoted
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .unwrap_or(quoted);
    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn query_value(request: &Request, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn parent_ids(metadata: &Value) -> Vec<String> {
    metadata["parents"]
        .as_array()
        .map(|parents| {
            parents
                .iter()
                .filter_map(|p| p["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Splits a two-part multipart/related body into its JSON and content parts.
fn split_multipart(body: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let parts: Vec<&[u8]> = split_on(body, b"\r\n\r\n").collect();
    let json_part = parts.get(1).copied().unwrap_or_default();
    let json_end = find(json_part, b"\r\n--").unwrap_or(json_part.len());
    let content_part = parts.get(2).copied().unwrap_or_default();
    let content_end = find(content_part, b"\r\n--").unwrap_or(content_part.len());
    (
        json_part[..json_end].to_vec(),
        content_part[..content_end].to_vec(),
    )
}

fn split_on<'a>(haystack: &'a [u8], needle: &'a [u8]) -> impl Iterator<Item = &'a [u8]> {
    let mut rest = Some(haystack);
    std::iter::from_fn(move || {
        let current = rest?;
        match find(current, needle) {
            Some(at) => {
                rest = Some(&current[at + needle.len()..]);
                Some(&current[..at])
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
