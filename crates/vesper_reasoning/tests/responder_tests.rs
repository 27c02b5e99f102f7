//! Integration tests for the Responder.
//!
//! A scripted classifier and the MockProvider stand in for the network, and
//! mood lives in a temp-dir JSON file, so each test sees real persistence.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use vesper_core::{Mode, MoodStore, SilenceTier, ToneClassifier};
use vesper_mood::{FileMoodStore, MoodHandle};
use vesper_reasoning::api_types::MessagesResponse;
use vesper_reasoning::providers::mock::MockProvider;
use vesper_reasoning::{CompletionParams, Responder};

// ============================================================================
// Fixtures
// ============================================================================

enum Label {
    Mode(Mode),
    Unrecognized,
    Fail,
}

struct FixedClassifier(Label);

#[async_trait]
impl ToneClassifier for FixedClassifier {
    async fn classify(&self, _text: &str) -> Result<Option<Mode>> {
        match &self.0 {
            Label::Mode(m) => Ok(Some(*m)),
            Label::Unrecognized => Ok(None),
            Label::Fail => anyhow::bail!("classifier offline"),
        }
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    store: Arc<FileMoodStore>,
    mood: Arc<MoodHandle>,
    llm: Arc<MockProvider>,
    responder: Responder,
}

async fn fixture(label: Label, llm: MockProvider, start_mode: Mode) -> Fixture {
    let dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(FileMoodStore::new(dir.path().join("mood.json")));
    let mood = Arc::new(MoodHandle::open(store.clone()).await.unwrap());
    mood.update(|s| s.mode = start_mode).await.unwrap();

    let llm = Arc::new(llm);
    let responder = Responder::new(
        llm.clone(),
        Arc::new(FixedClassifier(label)),
        mood.clone(),
        CompletionParams {
            max_tokens: 200,
            temperature: 1.2,
        },
        Duration::from_secs(5),
        chrono_tz::America::New_York,
    );
    Fixture {
        _dir: dir,
        store,
        mood,
        llm,
        responder,
    }
}

fn reply(text: &str) -> MockProvider {
    MockProvider::scripted(vec![MessagesResponse::text(text)])
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_reply_updates_mode_and_clock() {
    let f = fixture(Label::Mode(Mode::Creative), reply("Paint it loud."), Mode::Default).await;
    let now = Utc.with_ymd_and_hms(2024, 6, 2, 3, 30, 0).unwrap();

    let out = f.responder.respond_at("I want to paint something", now).await;
    assert_eq!(out.text, "Paint it loud.");
    assert_eq!(out.mode, Mode::Creative);
    assert!(out.delivered);

    let persisted = f.store.load().await.unwrap();
    assert_eq!(persisted.mode, Mode::Creative);
    assert_eq!(persisted.last_interaction, Some(now));
}

#[tokio::test]
async fn test_reply_text_is_model_output_verbatim() {
    let f = fixture(Label::Mode(Mode::Default), reply("  Fine.\n\nNow go.\n"), Mode::Default).await;
    let out = f.responder.respond("hey").await;
    assert_eq!(out.text, "  Fine.\n\nNow go.\n");
    assert!(out.delivered);
}

#[tokio::test]
async fn test_prompt_uses_mode_template_and_local_time() {
    let f = fixture(Label::Mode(Mode::Devotion), reply("ok"), Mode::Default).await;
    // 03:30 UTC on June 2nd is 11:30 PM Saturday in New York (EDT)
    let now = Utc.with_ymd_and_hms(2024, 6, 2, 3, 30, 0).unwrap();
    f.responder.respond_at("thank you", now).await;

    let calls = f.llm.recorded().await;
    assert_eq!(calls.len(), 1);
    assert!(calls[0].system.contains("DEVOTION"));
    assert!(calls[0].system.contains("Saturday 2024-06-01 11:30 PM EDT"));
    assert_eq!(calls[0].messages[0].content, "thank you");
    assert_eq!(calls[0].params.max_tokens, 200);
    assert!((calls[0].params.temperature - 1.2).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_unrecognized_label_keeps_mode() {
    let f = fixture(Label::Unrecognized, reply("hm"), Mode::Devotion).await;
    let out = f.responder.respond("???").await;
    assert_eq!(out.mode, Mode::Devotion);
    assert_eq!(f.mood.snapshot().await.mode, Mode::Devotion);
}

#[tokio::test]
async fn test_classifier_failure_keeps_mode() {
    let f = fixture(Label::Fail, reply("hm"), Mode::Creative).await;
    let out = f.responder.respond("hello").await;
    assert_eq!(out.mode, Mode::Creative);
    assert!(out.delivered);
}

#[tokio::test]
async fn test_generation_failure_returns_sentinel_and_keeps_clock() {
    let f = fixture(Label::Mode(Mode::Punishment), MockProvider::failing("quota exceeded"), Mode::Default).await;
    let out = f.responder.respond("sorry I was late").await;

    assert!(!out.delivered);
    assert!(out.text.starts_with("Something went wrong:"));
    assert!(out.text.contains("quota exceeded"));

    let persisted = f.store.load().await.unwrap();
    // Mode step happens before generation and sticks
    assert_eq!(persisted.mode, Mode::Punishment);
    assert_eq!(persisted.last_interaction, None);
}

#[tokio::test]
async fn test_successful_reply_clears_silence_tier() {
    let f = fixture(Label::Unrecognized, reply("Finally."), Mode::Punishment).await;
    let now = Utc::now();
    f.mood
        .update(|s| {
            s.last_interaction = Some(now - ChronoDuration::hours(30));
            s.silence_tier = SilenceTier::Tier24;
        })
        .await
        .unwrap();

    f.responder.respond_at("I'm back", now).await;

    let state = f.mood.snapshot().await;
    assert_eq!(state.silence_tier, SilenceTier::Silent);
    assert!(!state.praise_locked());
    assert!(!state.devotion_locked());
    assert_eq!(state.last_interaction, Some(now));
}
