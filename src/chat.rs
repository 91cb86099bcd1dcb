//! Portal assistant.
//!
//! Replies are picked by matching the latest user text against an ordered
//! list of rules: regex rules from config first, then the built-in keyword
//! rules. The first match wins; otherwise a fallback reply is used. Replies
//! are delivered after a delay through `PendingReply`, which can be
//! cancelled.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::path::Path;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::OutOfRange {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocationError {
    Unavailable,
    OutOfRange { latitude: f64, longitude: f64 },
}

impl std::fmt::Display for LocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocationError::Unavailable => write!(f, "Location is not available"),
            LocationError::OutOfRange {
                latitude,
                longitude,
            } => write!(
                f,
                "Coordinates out of range: {}, {} (latitude -90..90, longitude -180..180)",
                latitude, longitude
            ),
        }
    }
}

impl std::error::Error for LocationError {}

/// Position source for the "share location" action
pub trait Geolocator {
    fn locate(&self) -> Result<Location, LocationError>;
}

/// Returns a configured position, or `Unavailable` when none is set
pub struct FixedGeolocator {
    location: Option<Location>,
}

impl FixedGeolocator {
    pub fn new(location: Option<Location>) -> Self {
        Self { location }
    }
}

impl Geolocator for FixedGeolocator {
    fn locate(&self) -> Result<Location, LocationError> {
        self.location.ok_or(LocationError::Unavailable)
    }
}

/// An image attached to a message, held as a data URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageAttachment {
    pub name: String,
    pub mime: &'static str,
    pub size: u64,
    /// First 16 hex chars of the sha256 of the file
    pub digest: String,
    #[serde(skip)]
    pub data_url: String,
}

#[derive(Debug)]
pub enum AttachmentError {
    UnsupportedType(String),
    TooLarge { size: u64, limit: u64 },
    Io(std::io::Error),
}

impl std::fmt::Display for AttachmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttachmentError::UnsupportedType(name) => {
                write!(f, "{} is not an image (png, jpg, gif, webp)", name)
            }
            AttachmentError::TooLarge { size, limit } => write!(
                f,
                "Image is too large ({} bytes, limit {} bytes)",
                size, limit
            ),
            AttachmentError::Io(e) => write!(f, "Could not read image: {}", e),
        }
    }
}

impl std::error::Error for AttachmentError {}

fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// Read and validate an image file
pub fn load_image(path: &Path, max_bytes: u64) -> Result<ImageAttachment, AttachmentError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    let mime = image_mime(path).ok_or_else(|| AttachmentError::UnsupportedType(name.clone()))?;

    let size = std::fs::metadata(path).map_err(AttachmentError::Io)?.len();
    if size > max_bytes {
        return Err(AttachmentError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let bytes = std::fs::read(path).map_err(AttachmentError::Io)?;
    let hash = Sha256::digest(&bytes);
    let digest: String = hash.iter().take(8).map(|b| format!("{:02x}", b)).collect();

    Ok(ImageAttachment {
        name,
        mime,
        size,
        digest,
        data_url: format!("data:{};base64,{}", mime, STANDARD.encode(&bytes)),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageAttachment>,
}

impl ChatMessage {
    fn assistant(text: String) -> Self {
        Self {
            sender: Sender::Assistant,
            text,
            timestamp: Utc::now(),
            location: None,
            images: Vec::new(),
        }
    }
}

const GREETING: &str = "Hello! I'm the portal assistant. Ask me about otoliths, eDNA, fish identification or ocean conditions.";

const FALLBACK: &str = "I'm not sure about that yet. Try asking about otoliths, eDNA, species identification, ocean temperature or reports.";

// Checked in order against the lowercased message
const KEYWORD_RULES: &[(&[&str], &str)] = &[
    (
        &["otolith"],
        "Otoliths are ear stones whose growth rings record a fish's age. The Otolith Viewer measures ring counts and the comparison tool matches outlines against reference shapes.",
    ),
    (
        &["edna", "e-dna", "environmental dna"],
        "eDNA lets us detect species from a water sample. The eDNA Lab lists recent samples and the taxa found in each.",
    ),
    (
        &["identify", "species", "fish"],
        "Upload a clear side-on photo in Fish Image Identification and the model will suggest the closest species.",
    ),
    (
        &["temperature", "sst", "climate"],
        "Sea surface temperature along the west coast has been running slightly above the seasonal mean. Environmental Fish Prediction shows how that shifts species occurrence.",
    ),
    (
        &["illegal", "crime", "iuu", "poach"],
        "Suspicious vessel activity is tracked in Marine Crime Detection, available to policymakers, conservationists and admins.",
    ),
    (
        &["map", "location", "where", "station"],
        "The Marine Map shows survey stations, vessel tracks and protected areas. Share your location and I can point you to the nearest station.",
    ),
    (
        &["report"],
        "The Report Generator assembles charts and tables from your saved analyses.",
    ),
    (
        &["upload", "dataset", "csv"],
        "Data Upload accepts CSV, NetCDF and FASTA files. Ingested datasets show up in the Data Explorer.",
    ),
    (&["hello", "hey", "namaskaram"], GREETING),
    (
        &["help"],
        "I can explain the portal's tools: otolith analysis, eDNA, species identification, ocean conditions, the marine map and reports.",
    ),
];

/// A user-defined rule from config
#[derive(Debug, Clone)]
pub struct CustomRule {
    pub pattern: Regex,
    pub reply: String,
}

impl CustomRule {
    /// Patterns match case-insensitively, like the built-in keywords
    pub fn new(pattern: &str, reply: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            pattern,
            reply: reply.to_string(),
        })
    }
}

/// Pick a reply for a user message
pub fn reply_for(text: &str, location: Option<&Location>, custom: &[CustomRule]) -> String {
    let lowered = text.to_lowercase();
    if !lowered.trim().is_empty() {
        if let Some(rule) = custom.iter().find(|r| r.pattern.is_match(text)) {
            return rule.reply.clone();
        }
        for (keywords, reply) in KEYWORD_RULES {
            if keywords.iter().any(|k| lowered.contains(k)) {
                return (*reply).to_string();
            }
        }
    }

    match location {
        Some(loc) => format!(
            "Thanks, I have your position ({}). Open the Marine Map to see nearby survey stations.",
            loc
        ),
        None => FALLBACK.to_string(),
    }
}

/// A reply waiting for its delivery time
#[derive(Debug, Clone)]
pub struct PendingReply {
    pub message: ChatMessage,
    pub ready_at: Instant,
}

impl PendingReply {
    pub fn is_ready(&self, now: Instant) -> bool {
        now >= self.ready_at
    }
}

/// Chat transcript and draft attachments
pub struct ChatWidget {
    messages: Vec<ChatMessage>,
    pending: VecDeque<PendingReply>,
    draft_images: Vec<ImageAttachment>,
    draft_location: Option<Location>,
    rules: Vec<CustomRule>,
    reply_delay: Duration,
    max_image_bytes: u64,
}

impl ChatWidget {
    pub fn new(rules: Vec<CustomRule>, reply_delay: Duration, max_image_bytes: u64) -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING.to_string())],
            pending: VecDeque::new(),
            draft_images: Vec::new(),
            draft_location: None,
            rules,
            reply_delay,
            max_image_bytes,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn draft_images(&self) -> &[ImageAttachment] {
        &self.draft_images
    }

    pub fn draft_location(&self) -> Option<&Location> {
        self.draft_location.as_ref()
    }

    /// Add an image to the next message. Nothing is added on error.
    pub fn attach_image(&mut self, path: &Path) -> Result<&ImageAttachment, AttachmentError> {
        let image = load_image(path, self.max_image_bytes)?;
        self.draft_images.push(image);
        Ok(&self.draft_images[self.draft_images.len() - 1])
    }

    pub fn remove_image(&mut self, index: usize) -> Option<ImageAttachment> {
        if index < self.draft_images.len() {
            Some(self.draft_images.remove(index))
        } else {
            None
        }
    }

    /// Attach the current position to the next message
    pub fn share_location(&mut self, geo: &dyn Geolocator) -> Result<Location, LocationError> {
        let location = geo.locate()?;
        self.attach_location(location);
        Ok(location)
    }

    pub fn attach_location(&mut self, location: Location) {
        self.draft_location = Some(location);
    }

    /// Send the draft. Returns `None` (and schedules nothing) when there is no
    /// text and nothing attached.
    pub fn send(&mut self, text: &str, now: Instant) -> Option<&ChatMessage> {
        let text = text.trim();
        if text.is_empty() && self.draft_images.is_empty() && self.draft_location.is_none() {
            return None;
        }

        let message = ChatMessage {
            sender: Sender::User,
            text: text.to_string(),
            timestamp: Utc::now(),
            location: self.draft_location.take(),
            images: std::mem::take(&mut self.draft_images),
        };
        let reply = reply_for(&message.text, message.location.as_ref(), &self.rules);
        self.pending.push_back(PendingReply {
            message: ChatMessage::assistant(reply),
            ready_at: now + self.reply_delay,
        });
        self.messages.push(message);
        self.messages.last()
    }

    /// Deliver replies whose time has come, oldest first
    pub fn poll(&mut self, now: Instant) -> Vec<ChatMessage> {
        let mut delivered = Vec::new();
        while self.pending.front().is_some_and(|p| p.is_ready(now)) {
            if let Some(pending) = self.pending.pop_front() {
                let mut message = pending.message;
                message.timestamp = Utc::now();
                self.messages.push(message.clone());
                delivered.push(message);
            }
        }
        delivered
    }

    pub fn next_ready_at(&self) -> Option<Instant> {
        self.pending.front().map(|p| p.ready_at)
    }

    pub fn is_typing(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop undelivered replies; returns how many were dropped
    pub fn cancel_pending(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    /// Start over with just the greeting
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.draft_images.clear();
        self.draft_location = None;
        self.messages = vec![ChatMessage::assistant(GREETING.to_string())];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn widget() -> ChatWidget {
        ChatWidget::new(Vec::new(), Duration::from_millis(800), 1024)
    }

    #[test]
    fn test_first_rule_wins() {
        // "otolith" comes before "fish"
        let reply = reply_for("How do I age a fish from its otolith?", None, &[]);
        assert!(reply.starts_with("Otoliths"));
        let reply = reply_for("what FISH is this", None, &[]);
        assert!(reply.contains("Fish Image Identification"));
    }

    #[test]
    fn test_fallback_and_empty_input() {
        assert_eq!(reply_for("quantum tunnelling", None, &[]), FALLBACK);
        assert_eq!(reply_for("", None, &[]), FALLBACK);
        assert_eq!(reply_for("   ", None, &[]), FALLBACK);
    }

    #[test]
    fn test_location_only_message() {
        let loc = Location::new(9.9312, 76.2673).unwrap();
        let reply = reply_for("", Some(&loc), &[]);
        assert!(reply.contains("9.9312, 76.2673"));
    }

    #[test]
    fn test_custom_rules_take_priority() {
        let rules = vec![CustomRule::new(
            r"\bsardine",
            "Oil sardine landings are in the Reports section.",
        )
        .unwrap()];
        assert_eq!(
            reply_for("Sardine fish numbers?", None, &rules),
            "Oil sardine landings are in the Reports section."
        );
    }

    #[test]
    fn test_custom_rule_pattern_case_is_ignored() {
        let rules = vec![CustomRule::new("IUU", "Report it to the coast guard.").unwrap()];
        assert_eq!(
            reply_for("Any IUU vessels today?", None, &rules),
            "Report it to the coast guard."
        );
        assert_eq!(
            reply_for("any iuu vessels today?", None, &rules),
            "Report it to the coast guard."
        );
    }

    #[test]
    fn test_send_schedules_delayed_reply() {
        let mut chat = widget();
        let start = Instant::now();
        assert_eq!(chat.messages().len(), 1);

        let sent = chat.send("tell me about eDNA", start).unwrap();
        assert_eq!(sent.sender, Sender::User);
        assert!(chat.is_typing());

        assert!(chat.poll(start + Duration::from_millis(100)).is_empty());
        let delivered = chat.poll(start + Duration::from_millis(800));
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].sender, Sender::Assistant);
        assert!(delivered[0].text.contains("eDNA Lab"));
        assert_eq!(chat.messages().len(), 3);
        assert!(!chat.is_typing());
    }

    #[test]
    fn test_send_empty_is_ignored() {
        let mut chat = widget();
        assert!(chat.send("   ", Instant::now()).is_none());
        assert!(!chat.is_typing());
        assert_eq!(chat.messages().len(), 1);
    }

    #[test]
    fn test_cancel_pending() {
        let mut chat = widget();
        let now = Instant::now();
        chat.send("hello", now);
        chat.send("report", now);
        assert_eq!(chat.cancel_pending(), 2);
        assert!(chat.poll(now + Duration::from_secs(5)).is_empty());
        assert_eq!(chat.messages().len(), 3);
    }

    #[test]
    fn test_reset() {
        let mut chat = widget();
        chat.send("hello", Instant::now());
        chat.reset();
        assert_eq!(chat.messages().len(), 1);
        assert!(!chat.is_typing());
    }

    #[test]
    fn test_geolocation() {
        let mut chat = widget();
        let err = chat
            .share_location(&FixedGeolocator::new(None))
            .unwrap_err();
        assert_eq!(err, LocationError::Unavailable);
        assert!(chat.draft_location().is_none());

        let here = Location::new(8.5, 76.9).unwrap();
        chat.share_location(&FixedGeolocator::new(Some(here))).unwrap();
        let sent = chat.send("", Instant::now()).unwrap();
        assert_eq!(sent.location, Some(here));
        assert!(chat.draft_location().is_none());
    }

    #[test]
    fn test_location_range() {
        assert!(Location::new(91.0, 0.0).is_err());
        assert!(Location::new(0.0, -181.0).is_err());
        assert!(Location::new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn test_attach_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grouper.PNG");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"\x89PNG fake")
            .unwrap();

        let mut chat = widget();
        let image = chat.attach_image(&path).unwrap();
        assert_eq!(image.mime, "image/png");
        assert_eq!(image.size, 9);
        assert_eq!(image.digest.len(), 16);
        assert!(image.data_url.starts_with("data:image/png;base64,"));

        let sent = chat.send("what is this?", Instant::now()).unwrap();
        assert_eq!(sent.images.len(), 1);
        assert!(chat.draft_images().is_empty());
    }

    #[test]
    fn test_attach_rejects_bad_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut chat = widget();

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, "hi").unwrap();
        assert!(matches!(
            chat.attach_image(&text),
            Err(AttachmentError::UnsupportedType(_))
        ));

        let big = dir.path().join("big.jpg");
        std::fs::write(&big, vec![0u8; 2048]).unwrap();
        assert!(matches!(
            chat.attach_image(&big),
            Err(AttachmentError::TooLarge { size: 2048, limit: 1024 })
        ));

        let missing = dir.path().join("missing.webp");
        assert!(matches!(
            chat.attach_image(&missing),
            Err(AttachmentError::Io(_))
        ));

        assert!(chat.draft_images().is_empty());
    }
}
