//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use uld_intake::bot::IntakeBot;
use uld_intake::dialogue::Event;
use uld_intake::fanout::{FanoutCoordinator, MailRoute};
use uld_intake::journal::MemoryJournal;
use uld_intake::ledger::{SheetNames, SheetRouter};
use uld_intake::locks::KeyedLocks;
use uld_intake::provision::{Provisioner, RootFolder};
use uld_intake::retry::RetryPolicy;
use uld_intake::sinks::{
    MemoryLedger, MemoryObjectStore, MemoryPhotoSource, RecordingMailer, RecordingNotifier,
};
use uld_intake::submission::{PhotoHandle, Submitter};

/// Bot wired to in-memory sinks that tests can inspect
pub struct MemoryHarness {
    pub store: MemoryObjectStore,
    pub ledger: MemoryLedger,
    pub mailer: RecordingMailer,
    pub notifier: RecordingNotifier,
    pub journal: MemoryJournal,
    pub bot: Arc<IntakeBot>,
}

impl MemoryHarness {
    pub fn new() -> Self {
        let store = MemoryObjectStore::new();
        let ledger = MemoryLedger::new();
        let mailer = RecordingMailer::new();
        let notifier = RecordingNotifier::new();
        let journal = MemoryJournal::new();

        let locks = KeyedLocks::new();
        let retry = RetryPolicy::immediate();
        let fanout = FanoutCoordinator::builder(
            Arc::new(MemoryPhotoSource::new()),
            RootFolder::Named("Submissions".to_string()),
        )
        .provisioner(Provisioner::new(
            Arc::new(store.clone()),
            locks.clone(),
            retry,
        ))
        .sheets(SheetRouter::new(
            Arc::new(ledger.clone()),
            SheetNames::default(),
            locks,
            retry,
        ))
        .mail(MailRoute {
            mailer: Arc::new(mailer.clone()),
            from: "bot@example.com".to_string(),
            to: vec!["ops@example.com".to_string()],
        })
        .notifier(Arc::new(notifier.clone()))
        .retry(retry)
        .build();

        let bot = Arc::new(IntakeBot::new(Arc::new(fanout), Arc::new(journal.clone())));
        Self {
            store,
            ledger,
            mailer,
            notifier,
            journal,
            bot,
        }
    }
}

pub fn submitter(id: i64) -> Submitter {
    Submitter::new(id, format!("Checker {id}"), Some(format!("checker{id}")))
}

pub fn button(label: &str) -> Event {
    Event::ButtonPress {
        data: label.to_string(),
    }
}

pub fn text(body: &str) -> Event {
    Event::TextMessage {
        body: body.to_string(),
    }
}

pub fn photo(id: &str) -> Event {
    Event::PhotoMessage {
        id: PhotoHandle::new(id),
        caption: None,
    }
}

pub fn captioned_photo(id: &str, caption: &str) -> Event {
    Event::PhotoMessage {
        id: PhotoHandle::new(id),
        caption: Some(caption.to_string()),
    }
}
