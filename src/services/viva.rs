//! In-memory interactive viva sessions.
//!
//! A session walks a student through exactly three questions, answers one
//! question per turn, and grades the transcript after the final answer.
//! Clarification turns never advance the question pointer, and a failed
//! model call leaves the session exactly where it was so the student can
//! retry the same turn.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::core::error::PipelineError;

pub(crate) const TOTAL_QUESTIONS: usize = 3;

/// Model-backed operations the engine needs mid-session.
#[async_trait]
pub(crate) trait VivaCapability: Send + Sync {
    async fn clarify(
        &self,
        document_text: &str,
        question: &str,
        user_message: &str,
    ) -> anyhow::Result<String>;

    async fn grade(
        &self,
        document_text: &str,
        questions: &[String],
        answers: &[String],
    ) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum MessageIntent {
    #[default]
    Answer,
    Clarification,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StartedViva {
    pub(crate) session_id: String,
    pub(crate) question: String,
    pub(crate) question_number: usize,
    pub(crate) total_questions: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum VivaTurn {
    NextQuestion {
        question: String,
        question_number: usize,
        total_questions: usize,
    },
    Clarification {
        message: String,
        question: String,
        question_number: usize,
        total_questions: usize,
    },
    Completed {
        feedback: Option<String>,
        score: Option<i32>,
        total_questions: usize,
    },
}

struct VivaSession {
    document_text: String,
    questions: Vec<String>,
    answers: Vec<String>,
    next_index: usize,
    feedback: Option<String>,
    score: Option<i32>,
}

struct SessionEntry {
    started_at: Instant,
    state: Arc<Mutex<VivaSession>>,
}

pub(crate) struct VivaEngine {
    sessions: RwLock<HashMap<String, SessionEntry>>,
}

impl VivaEngine {
    pub(crate) fn new() -> Self {
        Self { sessions: RwLock::new(HashMap::new()) }
    }

    pub(crate) async fn start(
        &self,
        document_text: String,
        questions: Vec<String>,
    ) -> Result<StartedViva, PipelineError> {
        if questions.len() < TOTAL_QUESTIONS {
            return Err(PipelineError::Fatal(anyhow::anyhow!(
                "viva needs {TOTAL_QUESTIONS} questions, only {} available",
                questions.len()
            )));
        }
        if document_text.trim().is_empty() {
            return Err(PipelineError::invalid("no document content found for this viva"));
        }

        let questions: Vec<String> = questions.into_iter().take(TOTAL_QUESTIONS).collect();
        let first_question = questions[0].clone();
        let session_id = Uuid::new_v4().simple().to_string();

        let entry = SessionEntry {
            started_at: Instant::now(),
            state: Arc::new(Mutex::new(VivaSession {
                document_text,
                questions,
                answers: Vec::new(),
                next_index: 0,
                feedback: None,
                score: None,
            })),
        };
        self.sessions.write().await.insert(session_id.clone(), entry);
        metrics::counter!("viva_sessions_started_total").increment(1);

        Ok(StartedViva {
            session_id,
            question: first_question,
            question_number: 1,
            total_questions: TOTAL_QUESTIONS,
        })
    }

    pub(crate) async fn handle_message(
        &self,
        capability: &dyn VivaCapability,
        session_id: &str,
        user_message: &str,
        intent: MessageIntent,
    ) -> Result<VivaTurn, PipelineError> {
        let trimmed = user_message.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::invalid("user_message must not be empty"));
        }

        let state = self
            .sessions
            .read()
            .await
            .get(session_id)
            .map(|entry| Arc::clone(&entry.state))
            .ok_or_else(|| PipelineError::not_found(format!("viva session {session_id}")))?;
        let mut session = state.lock().await;

        // Post-completion messages replay the stored result.
        if session.next_index >= session.questions.len() {
            return Ok(VivaTurn::Completed {
                feedback: session.feedback.clone(),
                score: session.score,
                total_questions: session.questions.len(),
            });
        }

        match intent {
            MessageIntent::Clarification => {
                let question = session.questions[session.next_index].clone();
                let message = capability
                    .clarify(&session.document_text, &question, trimmed)
                    .await
                    .map_err(PipelineError::Fatal)?;
                Ok(VivaTurn::Clarification {
                    message,
                    question,
                    question_number: session.next_index + 1,
                    total_questions: session.questions.len(),
                })
            }
            MessageIntent::Answer => {
                let is_final = session.next_index + 1 == session.questions.len();
                if is_final {
                    // Grade before committing, so a failed call leaves the
                    // final question still answerable.
                    let mut answers = session.answers.clone();
                    answers.push(trimmed.to_string());
                    let feedback = capability
                        .grade(&session.document_text, &session.questions, &answers)
                        .await
                        .map_err(PipelineError::Fatal)?;
                    let score = extract_score(&feedback);

                    session.answers = answers;
                    session.next_index += 1;
                    session.feedback = Some(feedback.clone());
                    session.score = score;
                    metrics::counter!("viva_sessions_completed_total").increment(1);

                    Ok(VivaTurn::Completed {
                        feedback: Some(feedback),
                        score,
                        total_questions: session.questions.len(),
                    })
                } else {
                    session.answers.push(trimmed.to_string());
                    session.next_index += 1;
                    Ok(VivaTurn::NextQuestion {
                        question: session.questions[session.next_index].clone(),
                        question_number: session.next_index + 1,
                        total_questions: session.questions.len(),
                    })
                }
            }
        }
    }

    /// Drop sessions older than `ttl`; returns how many were removed.
    pub(crate) async fn purge_expired(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.started_at.elapsed() < ttl);
        before - sessions.len()
    }
}

/// Pull the first plausible `N/10` score out of free-form feedback.
///
/// Accepts a single digit or 10 with word boundaries on both sides, so
/// `17/10`, `9/100` and `7/10x` all read as no score.
pub(crate) fn extract_score(feedback: &str) -> Option<i32> {
    let bytes = feedback.as_bytes();
    for (idx, _) in feedback.match_indices("/10") {
        let mut start = idx;
        while start > 0 && bytes[start - 1].is_ascii_digit() {
            start -= 1;
        }
        let digits = &feedback[start..idx];
        if digits.is_empty() || (digits != "10" && digits.len() != 1) {
            continue;
        }
        if start > 0 {
            let prev = bytes[start - 1];
            if prev.is_ascii_alphanumeric() || prev == b'_' {
                continue;
            }
        }
        let end = idx + 3;
        if end < bytes.len() {
            let next = bytes[end];
            if next.is_ascii_alphanumeric() || next == b'_' {
                continue;
            }
        }
        return digits.parse().ok();
    }
    None
}
