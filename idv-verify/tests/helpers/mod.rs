//! Shared fixtures for idv-verify integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use idv_common::config::DateOrder;
use idv_common::events::EventBus;
use idv_verify::models::{CandidateRecord, IdentityEntry, ImageRef, ObservedRecord};
use idv_verify::provider::IdentityDataset;
use idv_verify::services::{
    FaceComparator, FaceComparisonError, SessionStore, VerificationOrchestrator,
    VerificationSettings,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

/// "Today" for every test: Jane Doe (born 01/01/1990) is 35
pub fn reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

pub fn observed(name: &str, face: Option<&str>) -> ObservedRecord {
    ObservedRecord {
        name: Some(name.to_string()),
        address_line_1: Some("1 Main St".to_string()),
        address_line_2: Some("City ST 1".to_string()),
        date_of_birth: Some("01/01/1990".to_string()),
        face_image: face.map(ImageRef::from),
        profile_image: Some(ImageRef::from("/ids/profile.png")),
        ..Default::default()
    }
}

pub fn candidate(name: &str, line_1: &str, age: i64, image: Option<&str>) -> CandidateRecord {
    CandidateRecord {
        name: Some(name.to_string()),
        address_line_1: Some(line_1.to_string()),
        address_line_2: Some("City ST 1".to_string()),
        age: Some(age),
        face_image: image.map(ImageRef::from),
        ..Default::default()
    }
}

pub fn identity(observed: ObservedRecord, candidates: Vec<CandidateRecord>) -> IdentityEntry {
    IdentityEntry {
        observed,
        irl_image: None,
        candidates,
    }
}

/// Jane Doe with a full match (`/faces/jane.jpg`) and a mismatch (`/faces/john.jpg`)
pub fn jane_identity() -> IdentityEntry {
    identity(
        observed("Jane Doe", Some("/ids/jane_face.png")),
        vec![
            candidate("Jane Doe", "1 Main St", 35, Some("/faces/jane.jpg")),
            candidate("John Smith", "9 Elm Rd", 20, Some("/faces/john.jpg")),
        ],
    )
}

/// Mark Roe, three candidates with images `/faces/mark-{0,1,2}.jpg`
pub fn mark_identity() -> IdentityEntry {
    identity(
        observed("Mark Roe", Some("/ids/mark_face.png")),
        (0..3)
            .map(|i| {
                let image = format!("/faces/mark-{}.jpg", i);
                candidate("Mark Roe", "1 Main St", 30 + i, Some(image.as_str()))
            })
            .collect(),
    )
}

pub fn dataset(entries: Vec<IdentityEntry>) -> Arc<IdentityDataset> {
    Arc::new(IdentityDataset::new(entries))
}

/// Fast settings for tests: short timeout, two attempts, tiny backoff
pub fn fast_settings() -> VerificationSettings {
    VerificationSettings {
        pass_threshold: 50.0,
        request_timeout: Duration::from_millis(100),
        max_attempts: 2,
        retry_backoff: Duration::from_millis(5),
    }
}

pub fn orchestrator(
    dataset: Arc<IdentityDataset>,
    comparator: Arc<ScriptedComparator>,
    settings: VerificationSettings,
) -> (VerificationOrchestrator, EventBus) {
    let event_bus = EventBus::new(256);
    let orchestrator = VerificationOrchestrator::new(
        dataset,
        comparator,
        SessionStore::new(),
        event_bus.clone(),
        settings,
        DateOrder::MonthDayYear,
    )
    .with_reference_date(reference_date());
    (orchestrator, event_bus)
}

/// What the scripted comparator does for one call
#[derive(Clone)]
pub enum Reply {
    Score(f64),
    Fail(FaceComparisonError),
    /// Never answers
    Hang,
    /// Answers `score` once the gate is notified
    Gated(Arc<Notify>, f64),
}

/// Comparator answering from per-image scripts
///
/// Replies for an image are consumed in order; when a script runs out the
/// default reply is used. Tracks every call and the peak number of
/// concurrent calls.
pub struct ScriptedComparator {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    default_reply: Reply,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedComparator {
    pub fn new(default_reply: Reply) -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            default_reply,
            calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn script(self, image: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(image.to_string(), replies.into());
        self
    }

    /// Unknown images of every call so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, image: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == image).count()
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    fn next_reply(&self, image: &str) -> Reply {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(image)
            .and_then(|replies| replies.pop_front())
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FaceComparator for ScriptedComparator {
    async fn compare(&self, _known: &ImageRef, unknown: &ImageRef) -> Result<f64, FaceComparisonError> {
        self.calls.lock().unwrap().push(unknown.as_str().to_string());
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        match self.next_reply(unknown.as_str()) {
            Reply::Score(score) => Ok(score),
            Reply::Fail(error) => Err(error),
            Reply::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Reply::Gated(gate, score) => {
                gate.notified().await;
                Ok(score)
            }
        }
    }
}
