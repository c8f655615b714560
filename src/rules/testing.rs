//! In-memory `MailboxClient` that records every call, for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::MailboxError;
use crate::mailbox::{INBOX, LabelInfo, MailboxClient, UNREAD};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Modify {
    pub message_id: String,
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Calls {
    pub list_labels: usize,
    pub created: Vec<String>,
    pub label_reads: Vec<String>,
    pub modified: Vec<Modify>,
}

pub(crate) struct RecordingMailbox {
    labels: Mutex<Vec<LabelInfo>>,
    messages: Mutex<HashMap<String, HashSet<String>>>,
    calls: Mutex<Calls>,
    fail_list: bool,
    fail_create: bool,
    fail_reads: HashSet<String>,
}

impl RecordingMailbox {
    pub fn new() -> Self {
        let system = [INBOX, UNREAD].map(|name| LabelInfo {
            id: name.to_string(),
            name: name.to_string(),
        });
        Self {
            labels: Mutex::new(system.to_vec()),
            messages: Mutex::new(HashMap::new()),
            calls: Mutex::new(Calls::default()),
            fail_list: false,
            fail_create: false,
            fail_reads: HashSet::new(),
        }
    }

    pub fn with_label(self, name: &str, id: &str) -> Self {
        self.labels.lock().unwrap().push(LabelInfo {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_message(self, id: &str, labels: &[&str]) -> Self {
        self.messages.lock().unwrap().insert(
            id.to_string(),
            labels.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_reads_for(mut self, message_id: &str) -> Self {
        self.fail_reads.insert(message_id.to_string());
        self
    }

    pub fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    pub fn labels_of(&self, message_id: &str) -> HashSet<String> {
        self.messages
            .lock()
            .unwrap()
            .get(message_id)
            .cloned()
            .unwrap_or_default()
    }

    fn unavailable() -> MailboxError {
        MailboxError::Api {
            status: 503,
            body: "backend unavailable".into(),
        }
    }
}

#[async_trait]
impl MailboxClient for RecordingMailbox {
    async fn list_labels(&self) -> Result<Vec<LabelInfo>, MailboxError> {
        self.calls.lock().unwrap().list_labels += 1;
        if self.fail_list {
            return Err(Self::unavailable());
        }
        Ok(self.labels.lock().unwrap().clone())
    }

    async fn create_label(&self, name: &str) -> Result<String, MailboxError> {
        let mut calls = self.calls.lock().unwrap();
        calls.created.push(name.to_string());
        if self.fail_create {
            return Err(Self::unavailable());
        }
        let id = format!("Label_{}", calls.created.len());
        self.labels.lock().unwrap().push(LabelInfo {
            id: id.clone(),
            name: name.to_string(),
        });
        Ok(id)
    }

    async fn get_message_labels(&self, message_id: &str) -> Result<HashSet<String>, MailboxError> {
        self.calls
            .lock()
            .unwrap()
            .label_reads
            .push(message_id.to_string());
        if self.fail_reads.contains(message_id) {
            return Err(Self::unavailable());
        }
        Ok(self.labels_of(message_id))
    }

    async fn modify_message_labels(
        &self,
        message_id: &str,
        add: &[String],
        remove: &[String],
    ) -> Result<(), MailboxError> {
        self.calls.lock().unwrap().modified.push(Modify {
            message_id: message_id.to_string(),
            add: add.to_vec(),
            remove: remove.to_vec(),
        });

        let mut messages = self.messages.lock().unwrap();
        let labels = messages.entry(message_id.to_string()).or_default();
        labels.extend(add.iter().cloned());
        for id in remove {
            labels.remove(id);
        }
        Ok(())
    }
}
