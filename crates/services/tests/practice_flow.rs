use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use practice_core::Clock;
use practice_core::model::{
    Difficulty, Question, QuestionDraft, QuestionStatus, QuestionType, Unit, UnitId, UserId,
};
use practice_core::time::fixed_clock;
use services::{
    AppServices, GenerationConfig, GenerationError, NextQuestion, PracticeError, StartSession,
    SubmitAnswer,
};
use storage::repository::{QuestionRepository, UnitRepository};

const UNIT: u64 = 1;

fn user() -> UserId {
    UserId::new("user_flow")
}

fn start_request() -> StartSession {
    StartSession {
        user_id: user(),
        unit_id: UnitId::new(UNIT),
        topic_id: None,
        user_email: Some("flow@example.com".into()),
        user_name: None,
    }
}

async fn seed_unit(app: &AppServices, name: &str) {
    app.storage()
        .units
        .upsert_unit(&Unit {
            id: UnitId::new(UNIT),
            unit_number: 1,
            name: name.into(),
            description: None,
            icon: None,
            color: None,
            is_active: true,
        })
        .await
        .unwrap();
}

async fn seed_questions(app: &AppServices, difficulty: Difficulty, count: u32) {
    for i in 0..count {
        app.storage()
            .questions
            .insert_question(
                &QuestionDraft {
                    unit_id: UnitId::new(UNIT),
                    topic_id: None,
                    question_text: format!("{difficulty} #{i}"),
                    code_snippet: None,
                    options: vec!["right".into(), "wrong".into()],
                    correct_answer: "right".into(),
                    explanation: "explained".into(),
                    question_type: QuestionType::MultipleChoice,
                    difficulty,
                    status: QuestionStatus::Approved,
                }
                .validate(Clock::default().now())
                .unwrap(),
            )
            .await
            .unwrap();
    }
}

async fn submit(
    app: &AppServices,
    session_id: practice_core::model::SessionId,
    question: &Question,
    correct: bool,
) -> services::AnswerFeedback {
    app.practice()
        .submit_answer(SubmitAnswer {
            user_id: user(),
            session_id,
            question_id: question.id,
            user_answer: if correct { "right".into() } else { "wrong".into() },
            time_spent_secs: Some(12),
        })
        .await
        .unwrap()
}

async fn next(
    app: &AppServices,
    session_id: practice_core::model::SessionId,
) -> Option<Question> {
    app.practice()
        .next_question(NextQuestion {
            user_id: user(),
            session_id,
            unit_id: UnitId::new(UNIT),
            answered_question_ids: Vec::new(),
            topic_id: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn fresh_learner_starts_easy_with_39_remaining() {
    let app = AppServices::in_memory(fixed_clock(), None);
    seed_unit(&app, "Primitive Types").await;
    seed_questions(&app, Difficulty::Easy, 3).await;

    let started = app.practice().start_session(start_request()).await.unwrap();

    assert_eq!(started.recommended_difficulty, Difficulty::Easy);
    assert_eq!(started.questions_remaining, 39);
    assert_eq!(started.total_questions, 40);
    assert_eq!(started.question.difficulty, Difficulty::Easy);
    assert_eq!(started.session.total_questions, 0);
}

#[tokio::test]
async fn unknown_unit_fails_with_not_found() {
    let app = AppServices::in_memory(fixed_clock(), None);
    let err = app.practice().start_session(start_request()).await.unwrap_err();
    assert!(matches!(err, PracticeError::UnitNotFound));
}

#[tokio::test]
async fn three_straight_correct_changes_difficulty_and_next_is_harder() {
    let app = AppServices::in_memory(fixed_clock(), None);
    seed_unit(&app, "Primitive Types").await;
    seed_questions(&app, Difficulty::Easy, 5).await;
    seed_questions(&app, Difficulty::Medium, 5).await;

    let started = app.practice().start_session(start_request()).await.unwrap();
    let session_id = started.session.id;

    let first = submit(&app, session_id, &started.question, true).await;
    assert!(first.is_correct);
    assert!(!first.difficulty_changed);

    let q2 = next(&app, session_id).await.unwrap();
    let second = submit(&app, session_id, &q2, true).await;
    assert!(!second.difficulty_changed);

    let q3 = next(&app, session_id).await.unwrap();
    let third = submit(&app, session_id, &q3, true).await;
    assert!(third.difficulty_changed, "third straight correct promotes");
    assert_eq!(third.progress.current_difficulty, Difficulty::Medium);

    let q4 = next(&app, session_id).await.unwrap();
    assert_eq!(q4.difficulty, Difficulty::Medium);
}

#[tokio::test]
async fn answered_questions_never_repeat_across_sessions() {
    let app = AppServices::in_memory(fixed_clock(), None);
    seed_unit(&app, "Primitive Types").await;
    seed_questions(&app, Difficulty::Easy, 2).await;

    let started = app.practice().start_session(start_request()).await.unwrap();
    let first_id = started.question.id;
    submit(&app, started.session.id, &started.question, false).await;

    let q2 = next(&app, started.session.id).await.unwrap();
    assert_ne!(q2.id, first_id, "session must not repeat a question");
    submit(&app, started.session.id, &q2, false).await;

    app.practice().end_session(started.session.id).await.unwrap();

    // both questions are used up globally; a fresh session has nothing left
    // and falls through to generation, which is disabled here
    let err = app.practice().start_session(start_request()).await.unwrap_err();
    assert!(matches!(
        err,
        PracticeError::Generation(GenerationError::Disabled)
    ));
}

#[tokio::test]
async fn selector_falls_through_tiers_before_generation() {
    let app = AppServices::in_memory(fixed_clock(), None);
    seed_unit(&app, "Primitive Types").await;
    seed_questions(&app, Difficulty::Easy, 1).await;
    seed_questions(&app, Difficulty::Expert, 1).await;

    let started = app.practice().start_session(start_request()).await.unwrap();
    submit(&app, started.session.id, &started.question, false).await;

    // Easy is exhausted; the walk lands on the Expert question before any
    // generation attempt
    let fallback = next(&app, started.session.id).await.unwrap();
    assert_eq!(fallback.difficulty, Difficulty::Expert);
}

#[tokio::test]
async fn session_summary_reports_accuracy_and_goal() {
    let app = AppServices::in_memory(fixed_clock(), None);
    seed_unit(&app, "Primitive Types").await;
    seed_questions(&app, Difficulty::Easy, 10).await;

    let started = app.practice().start_session(start_request()).await.unwrap();
    let session_id = started.session.id;

    let mut question = started.question;
    for round in 0..5 {
        submit(&app, session_id, &question, round != 4).await;
        if let Some(next_question) = next(&app, session_id).await {
            question = next_question;
        }
    }

    let report = app.practice().end_session(session_id).await.unwrap();
    assert_eq!(report.summary.total_questions(), 5);
    assert_eq!(report.summary.correct_answers(), 4);
    assert_eq!(report.summary.accuracy_rate(), 80);
    assert_eq!(report.summary.total_time_secs(), 5 * 12);
    assert_eq!(report.summary.average_time_secs(), 12);
    assert_eq!(report.session.goal_achieved, Some(true));
    assert!(report.session.ended_at.is_some());

    let easy = report
        .summary
        .difficulty_breakdown()
        .get(&Difficulty::Easy)
        .unwrap();
    assert_eq!((easy.correct, easy.total), (4, 5));
    let general = report.summary.topic_breakdown().get("General").unwrap();
    assert_eq!(general.total, 5);
}

#[tokio::test]
async fn completed_session_yields_no_more_questions() {
    let app = AppServices::in_memory(fixed_clock(), None);
    seed_unit(&app, "Primitive Types").await;
    seed_questions(&app, Difficulty::Easy, 45).await;

    let started = app.practice().start_session(start_request()).await.unwrap();
    let session_id = started.session.id;

    let mut question = started.question;
    for _ in 0..40 {
        let feedback = submit(&app, session_id, &question, true).await;
        match next(&app, session_id).await {
            Some(next_question) => question = next_question,
            None => {
                assert!(feedback.is_session_complete);
                break;
            }
        }
    }

    assert!(next(&app, session_id).await.is_none());

    // a 41st answer is refused outright
    let err = app
        .practice()
        .submit_answer(SubmitAnswer {
            user_id: user(),
            session_id,
            question_id: question.id,
            user_answer: "right".into(),
            time_spent_secs: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PracticeError::Session(_)));

    let report = app.practice().end_session(session_id).await.unwrap();
    assert_eq!(report.summary.total_questions(), 40);
    assert_eq!(report.summary.completion_percentage(), 100);
}

#[tokio::test]
async fn missing_session_and_question_surface_as_not_found() {
    let app = AppServices::in_memory(fixed_clock(), None);
    seed_unit(&app, "Primitive Types").await;
    seed_questions(&app, Difficulty::Easy, 1).await;
    let started = app.practice().start_session(start_request()).await.unwrap();

    let err = app
        .practice()
        .next_question(NextQuestion {
            user_id: user(),
            session_id: practice_core::model::SessionId::random(),
            unit_id: UnitId::new(UNIT),
            answered_question_ids: Vec::new(),
            topic_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PracticeError::SessionNotFound));

    let err = app
        .practice()
        .submit_answer(SubmitAnswer {
            user_id: user(),
            session_id: started.session.id,
            question_id: practice_core::model::QuestionId::new(999),
            user_answer: "right".into(),
            time_spent_secs: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PracticeError::QuestionNotFound));

    let err = app
        .practice()
        .end_session(practice_core::model::SessionId::random())
        .await
        .unwrap_err();
    assert!(matches!(err, PracticeError::SessionNotFound));
}

#[tokio::test]
async fn exhausted_bank_generates_via_external_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "content": "```json\n{\"questionText\": \"Which type holds 3.5?\",\
                     \"codeSnippet\": null,\
                     \"options\": [\"double\", \"int\", \"boolean\", \"char\"],\
                     \"correctAnswer\": \"double\",\
                     \"explanation\": \"Floating point literals need a double.\"}\n```"
                }
            }]
        })))
        .mount(&server)
        .await;

    let config = GenerationConfig {
        base_url: server.uri(),
        api_key: "test-key".into(),
        model: "test-model".into(),
    };
    let app = AppServices::in_memory(fixed_clock(), Some(config));
    seed_unit(&app, "Primitive Types").await;

    // empty bank: the very first question must come from generation
    let started = app.practice().start_session(start_request()).await.unwrap();
    assert_eq!(started.question.question_text, "Which type holds 3.5?");
    assert_eq!(started.question.difficulty, Difficulty::Easy);
    assert!(started.question.is_approved());
    assert_eq!(started.question.options.len(), 4);

    // and it is persisted: answering it works like any stored question
    let feedback = app
        .practice()
        .submit_answer(SubmitAnswer {
            user_id: user(),
            session_id: started.session.id,
            question_id: started.question.id,
            user_answer: started.question.correct_answer.clone(),
            time_spent_secs: Some(9),
        })
        .await
        .unwrap();
    assert!(feedback.is_correct);
}
