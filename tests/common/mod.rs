//! Shared fixtures for the integration tests.
//!
//! PDF and DOCX inputs are generated in memory; the completion endpoint is
//! replaced by [`StubClient`].

#![allow(dead_code)]

use async_trait::async_trait;
use docusearch::completion::{CompletionClient, CompletionRequest};
use docusearch::{ErrorState, QueryConfig, QueryError, QueryService, Session, SessionObserver};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use parking_lot::Mutex;
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use zip::write::SimpleFileOptions;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── Document fixtures ────────────────────────────────────────────────────────

/// A PDF with one page per entry, each page holding a single text line.
pub fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// A minimal `.docx` whose body holds one paragraph per entry.
pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
        .collect();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("[Content_Types].xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(br#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();
    zip.start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

// ── Completion stub ──────────────────────────────────────────────────────────

type Reply = dyn Fn(&CompletionRequest) -> Result<String, QueryError> + Send + Sync;

/// Completion client that counts calls and answers from a closure.
///
/// Requests whose prompt contains the gate marker block until the gate is
/// notified; `entered` is notified when such a request arrives.
pub struct StubClient {
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
    reply: Box<Reply>,
    gate: Option<(String, Arc<Notify>)>,
    pub entered: Notify,
}

impl StubClient {
    pub fn answering(text: &str) -> Self {
        let text = text.to_string();
        Self::with_reply(move |_| Ok(text.clone()))
    }

    pub fn failing(error: QueryError) -> Self {
        Self::with_reply(move |_| Err(error.clone()))
    }

    /// Replies with the question line of the context block.
    pub fn echo() -> Self {
        Self::with_reply(|req| {
            let question = req
                .prompt
                .split("\n---\n")
                .nth(3)
                .unwrap_or_default()
                .to_string();
            Ok(format!("echo: {question}"))
        })
    }

    pub fn with_reply<F>(reply: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String, QueryError> + Send + Sync + 'static,
    {
        Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            reply: Box::new(reply),
            gate: None,
            entered: Notify::new(),
        }
    }

    pub fn gated_on(mut self, marker: &str, gate: Arc<Notify>) -> Self {
        self.gate = Some((marker.to_string(), gate));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl CompletionClient for StubClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        if let Some((marker, gate)) = &self.gate {
            if request.prompt.contains(marker.as_str()) {
                self.entered.notify_one();
                gate.notified().await;
            }
        }
        (self.reply)(request)
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

pub fn session_with(client: Arc<StubClient>) -> Session {
    session_with_config(QueryConfig::default(), client)
}

pub fn session_with_config(config: QueryConfig, client: Arc<StubClient>) -> Session {
    let client: Arc<dyn CompletionClient> = client;
    Session::new(QueryService::with_client(config, client))
}

// ── Observer ─────────────────────────────────────────────────────────────────

/// Records every event as a short string.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().push(event);
    }
}

impl SessionObserver for RecordingObserver {
    fn on_ingest_start(&self, file_name: &str) {
        self.push(format!("ingest_start:{file_name}"));
    }

    fn on_ingest_complete(&self, file_name: &str, _char_count: usize) {
        self.push(format!("ingest_complete:{file_name}"));
    }

    fn on_ingest_error(&self, file_name: &str, _error: &ErrorState) {
        self.push(format!("ingest_error:{file_name}"));
    }

    fn on_ingest_superseded(&self, file_name: &str) {
        self.push(format!("ingest_superseded:{file_name}"));
    }

    fn on_search_start(&self, question: &str) {
        self.push(format!("search_start:{question}"));
    }

    fn on_search_complete(&self, _answer_len: usize) {
        self.push("search_complete".to_string());
    }

    fn on_search_error(&self, error: &ErrorState) {
        self.push(format!("search_error:{:?}", error.kind));
    }

    fn on_search_superseded(&self) {
        self.push("search_superseded".to_string());
    }
}
