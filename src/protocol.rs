//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Questions go out without their answer key; it is only revealed in answer feedback.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::badges::BadgeOutcome;
use crate::domain::{AnswerRecord, Badge, CodeSnippet, Domain, Progress, Question, Tier};
use crate::feedback::AiFeedback;
use crate::learning_path::LearningPath;
use crate::scoring::Report;
use crate::session::{SessionState, SessionStatus};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartAssessment {
        domain: String,
    },
    SubmitAnswer {
        #[serde(rename = "selectedIndex")]
        selected_index: usize,
        confidence: i64,
        #[serde(rename = "responseTime", default)]
        response_time: f64,
    },
    NextQuestion,
    Finalize,
    Abandon,
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Session {
        session: SessionOut,
    },
    AnswerResult {
        feedback: AnswerFeedback,
    },
    Result {
        result: FinalizeOut,
    },
    Abandoned,
    Error {
        message: String,
    },
}

// ----- HTTP DTOs -----

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub provider: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct DomainOut {
    pub id: Domain,
    pub name: &'static str,
    pub description: &'static str,
}

impl From<Domain> for DomainOut {
    fn from(d: Domain) -> Self {
        Self { id: d, name: d.name(), description: d.description() }
    }
}

#[derive(Debug, Deserialize)]
pub struct StartIn {
    pub domain: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerIn {
    pub selected_index: usize,
    pub confidence: i64,
    #[serde(default)]
    pub response_time: f64,
}

#[derive(Debug, Deserialize)]
pub struct LearningPathQuery {
    pub domain: String,
    pub score: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOut {
    pub id: String,
    pub kind: &'static str,
    pub difficulty: Tier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<CodeSnippet>,
    pub question: String,
    pub options: Vec<String>,
    pub ai_generated: bool,
}

impl From<&Question> for QuestionOut {
    fn from(q: &Question) -> Self {
        let (title, context, diagram, code_snippet) = match q {
            Question::Scenario(s) => (Some(s.title.clone()), Some(s.context.clone()), s.diagram.clone(), s.code_snippet.clone()),
            Question::Standard(_) => (None, None, None, None),
        };
        Self {
            id: q.id().to_string(),
            kind: if q.is_scenario() { "scenario" } else { "standard" },
            difficulty: q.tier(),
            title,
            context,
            diagram,
            code_snippet,
            question: q.text().to_string(),
            options: q.options().to_vec(),
            ai_generated: q.is_ai_generated(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOut {
    pub session_id: Uuid,
    pub domain: Domain,
    pub status: SessionStatus,
    pub tier: Tier,
    /// 1-based number of the current question.
    pub number: usize,
    pub queued: usize,
    pub answered: usize,
    pub awaiting_answer: bool,
    pub question: Option<QuestionOut>,
}

impl From<&SessionState> for SessionOut {
    fn from(s: &SessionState) -> Self {
        let question = s.current_question();
        Self {
            session_id: s.id,
            domain: s.domain,
            status: s.status,
            tier: s.tier,
            number: s.presented(),
            queued: s.questions.len(),
            answered: s.answers.len(),
            awaiting_answer: question.is_some() && !s.is_current_answered(),
            question: question.map(QuestionOut::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerFeedback {
    /// False when the position already had an answer; the fields then describe that answer.
    pub accepted: bool,
    pub correct: bool,
    pub correct_index: usize,
    pub explanation: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub learning_points: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl AnswerFeedback {
    pub fn new(q: &Question, a: &AnswerRecord, accepted: bool) -> Self {
        Self {
            accepted,
            correct: a.correct,
            correct_index: q.correct(),
            explanation: q.explanation().to_string(),
            learning_points: q.learning_points().to_vec(),
            sources: q.sources().to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeOut {
    pub id: Badge,
    pub name: &'static str,
}

impl From<Badge> for BadgeOut {
    fn from(b: Badge) -> Self {
        Self { id: b, name: b.name() }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressOut {
    pub badges: Vec<BadgeOut>,
    pub total_assessments: u32,
}

impl From<&Progress> for ProgressOut {
    fn from(p: &Progress) -> Self {
        Self { badges: p.badges.iter().copied().map(BadgeOut::from).collect(), total_assessments: p.total_assessments }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeOut {
    pub report: Report,
    pub new_badges: Vec<BadgeOut>,
    pub progress: ProgressOut,
    pub learning_path: LearningPath,
    /// Null when no provider is configured or it did not answer usably in time.
    pub ai_feedback: Option<AiFeedback>,
}

impl FinalizeOut {
    pub fn new(report: Report, outcome: BadgeOutcome, learning_path: LearningPath, ai_feedback: Option<AiFeedback>) -> Self {
        Self {
            new_badges: outcome.newly_earned.into_iter().map(BadgeOut::from).collect(),
            progress: ProgressOut::from(&outcome.progress),
            report,
            learning_path,
            ai_feedback,
        }
    }
}
