use crate::chat::ChatMessage;
use crate::gate::Decision;
use crate::role::Page;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Append-only JSONL log of one portal run
pub struct Transcript {
    pub path: PathBuf,
    run_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    run_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Transcript {
    pub fn new(path: &Path, run_id: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            run_id: run_id.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            run_id: &self.run_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn run_start(&mut self, storage: &Path, rehydrated: bool, page: Page) -> Result<()> {
        self.log(
            "run_start",
            serde_json::json!({
                "storage": storage,
                "rehydrated": rehydrated,
                "page": page,
            }),
        )
    }

    pub fn navigate(&mut self, from: Page, to: Page) -> Result<()> {
        self.log("navigate", serde_json::json!({ "from": from, "to": to }))
    }

    /// Log a gate decision for a page
    pub fn gate_decision(&mut self, page: Page, decision: Decision) -> Result<()> {
        self.log(
            "gate_decision",
            serde_json::json!({
                "page": page,
                "decision": decision.as_str(),
            }),
        )
    }

    pub fn login(&mut self, user_id: &str, role: &str) -> Result<()> {
        self.log(
            "login",
            serde_json::json!({ "user_id": user_id, "role": role }),
        )
    }

    pub fn login_rejected(&mut self, reason: &str) -> Result<()> {
        self.log("login_rejected", serde_json::json!({ "reason": reason }))
    }

    pub fn logout(&mut self) -> Result<()> {
        self.log("logout", serde_json::json!({}))
    }

    pub fn language(&mut self, language: &str) -> Result<()> {
        self.log("language", serde_json::json!({ "language": language }))
    }

    pub fn chat_message(&mut self, message: &ChatMessage) -> Result<()> {
        self.log("chat_message", serde_json::to_value(message)?)
    }

    /// Log a user-visible notice (attachment or location failure)
    pub fn notice(&mut self, kind: &str, message: &str) -> Result<()> {
        self.log(
            "notice",
            serde_json::json!({ "kind": kind, "message": message }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_are_json_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.jsonl");
        let mut transcript = Transcript::new(&path, "run-1").unwrap();
        transcript
            .navigate(Page::Landing, Page::DataExplorer)
            .unwrap();
        transcript
            .gate_decision(Page::DataExplorer, Decision::RedirectToLogin)
            .unwrap();
        transcript.logout().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let events: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0]["type"], "navigate");
        assert_eq!(events[0]["to"], "data-explorer");
        assert_eq!(events[1]["decision"], "redirect_to_login");
        assert_eq!(events[2]["run_id"], "run-1");
    }
}
