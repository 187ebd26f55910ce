use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use practice_core::model::{
    Difficulty, PracticeSession, ProgressMetrics, Question, QuestionId, SessionId, SessionSummary,
    TopicId, UnitId, UserId,
};
use services::{AppServices, NextQuestion, StartSession, SubmitAnswer};

use crate::error::ApiError;

pub(crate) fn routes() -> Router<AppServices> {
    Router::new()
        .route("/start", post(start))
        .route("/next-question", post(next_question))
        .route("/submit-answer", post(submit_answer))
        .route("/:session_id/end", post(end))
}

//
// ─── START ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartBody {
    user_id: UserId,
    unit_id: UnitId,
    topic_id: Option<TopicId>,
    user_email: Option<String>,
    user_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    session: PracticeSession,
    question: Question,
    recommended_difficulty: Difficulty,
    questions_remaining: u32,
    total_questions: u32,
}

async fn start(
    State(services): State<AppServices>,
    Json(body): Json<StartBody>,
) -> Result<Json<StartResponse>, ApiError> {
    let started = services
        .practice()
        .start_session(StartSession {
            user_id: body.user_id,
            unit_id: body.unit_id,
            topic_id: body.topic_id,
            user_email: body.user_email,
            user_name: body.user_name,
        })
        .await?;

    Ok(Json(StartResponse {
        session: started.session,
        question: started.question,
        recommended_difficulty: started.recommended_difficulty,
        questions_remaining: started.questions_remaining,
        total_questions: started.total_questions,
    }))
}

//
// ─── NEXT QUESTION ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NextQuestionBody {
    user_id: UserId,
    session_id: SessionId,
    unit_id: UnitId,
    #[serde(default)]
    answered_question_ids: Vec<QuestionId>,
    topic_id: Option<TopicId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NextQuestionResponse {
    question: Option<Question>,
}

async fn next_question(
    State(services): State<AppServices>,
    Json(body): Json<NextQuestionBody>,
) -> Result<Json<NextQuestionResponse>, ApiError> {
    let question = services
        .practice()
        .next_question(NextQuestion {
            user_id: body.user_id,
            session_id: body.session_id,
            unit_id: body.unit_id,
            answered_question_ids: body.answered_question_ids,
            topic_id: body.topic_id,
        })
        .await?;

    Ok(Json(NextQuestionResponse { question }))
}

//
// ─── SUBMIT ANSWER ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitAnswerBody {
    user_id: UserId,
    session_id: SessionId,
    question_id: QuestionId,
    user_answer: String,
    time_spent: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitAnswerResponse {
    is_correct: bool,
    correct_answer: String,
    explanation: String,
    progress: ProgressMetrics,
    difficulty_changed: bool,
    questions_remaining: u32,
    is_session_complete: bool,
}

async fn submit_answer(
    State(services): State<AppServices>,
    Json(body): Json<SubmitAnswerBody>,
) -> Result<Json<SubmitAnswerResponse>, ApiError> {
    let feedback = services
        .practice()
        .submit_answer(SubmitAnswer {
            user_id: body.user_id,
            session_id: body.session_id,
            question_id: body.question_id,
            user_answer: body.user_answer,
            time_spent_secs: body.time_spent,
        })
        .await?;

    Ok(Json(SubmitAnswerResponse {
        is_correct: feedback.is_correct,
        correct_answer: feedback.correct_answer,
        explanation: feedback.explanation,
        progress: feedback.progress,
        difficulty_changed: feedback.difficulty_changed,
        questions_remaining: feedback.questions_remaining,
        is_session_complete: feedback.is_session_complete,
    }))
}

//
// ─── END ───────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EndResponse {
    session: PracticeSession,
    summary: SessionSummary,
}

async fn end(
    State(services): State<AppServices>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<EndResponse>, ApiError> {
    let report = services.practice().end_session(session_id).await?;
    Ok(Json(EndResponse {
        session: report.session,
        summary: report.summary,
    }))
}
