use chrono::Duration;
use practice_core::model::{
    Difficulty, NewUser, PracticeSession, QuestionDraft, QuestionResponse, QuestionStatus,
    QuestionType, ResponseId, SessionId, SessionSummary, Topic, TopicId, Unit, UnitId,
    UnitProgress, UserId,
};
use practice_core::time::fixed_now;
use storage::repository::{
    ProgressRepository, QuestionRepository, ResponseRepository, SessionRepository, StorageError,
    UnitRepository, UserRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_unit(id: u64, name: &str) -> Unit {
    Unit {
        id: UnitId::new(id),
        unit_number: u32::try_from(id).unwrap(),
        name: name.into(),
        description: None,
        icon: None,
        color: None,
        is_active: true,
    }
}

fn build_question(
    unit_id: UnitId,
    topic_id: Option<TopicId>,
    difficulty: Difficulty,
    status: QuestionStatus,
) -> practice_core::model::ValidatedQuestion {
    QuestionDraft {
        unit_id,
        topic_id,
        question_text: "What is 2 + 2?".into(),
        code_snippet: None,
        options: vec!["3".into(), "4".into()],
        correct_answer: "4".into(),
        explanation: "Basic arithmetic.".into(),
        question_type: QuestionType::MultipleChoice,
        difficulty,
        status,
    }
    .validate(fixed_now())
    .unwrap()
}

async fn seed_user(repo: &SqliteRepository, id: &str) -> UserId {
    let user = repo
        .ensure_user(
            &NewUser {
                id: UserId::new(id),
                email: None,
                name: None,
            },
            fixed_now(),
        )
        .await
        .unwrap();
    user.id
}

#[tokio::test]
async fn question_roundtrip_and_candidate_filtering() {
    let repo = connect("memdb_questions").await;
    let unit = build_unit(1, "Primitive Types");
    repo.upsert_unit(&unit).await.unwrap();

    let approved = repo
        .insert_question(&build_question(
            unit.id,
            None,
            Difficulty::Easy,
            QuestionStatus::Approved,
        ))
        .await
        .unwrap();
    repo.insert_question(&build_question(
        unit.id,
        None,
        Difficulty::Easy,
        QuestionStatus::PendingReview,
    ))
    .await
    .unwrap();
    repo.insert_question(&build_question(
        unit.id,
        None,
        Difficulty::Hard,
        QuestionStatus::Approved,
    ))
    .await
    .unwrap();

    let fetched = repo.get_question(approved).await.unwrap().unwrap();
    assert_eq!(fetched.id, approved);
    assert_eq!(fetched.options, vec!["3".to_string(), "4".to_string()]);
    assert!(fetched.check_answer("4"));

    let found = repo
        .candidates(unit.id, Difficulty::Easy, &[])
        .await
        .unwrap();
    assert_eq!(found.len(), 1, "pending questions must not be served");
    assert_eq!(found[0].id, approved);

    let none = repo
        .candidates(unit.id, Difficulty::Easy, &[approved])
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn session_counters_are_capped_and_finalized() {
    let repo = connect("memdb_sessions").await;
    let unit = build_unit(1, "Primitive Types");
    repo.upsert_unit(&unit).await.unwrap();
    let user = seed_user(&repo, "user_1").await;

    let mut session =
        PracticeSession::start(SessionId::random(), user, unit.id, None, fixed_now());
    session.target_questions = 3;
    repo.insert_session(&session).await.unwrap();

    for i in 0..3 {
        let updated = repo.record_answer(session.id, i != 1).await.unwrap();
        assert_eq!(updated.total_questions, i + 1);
    }
    let err = repo.record_answer(session.id, true).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let missing = repo
        .record_answer(SessionId::random(), true)
        .await
        .unwrap_err();
    assert!(matches!(missing, StorageError::NotFound));

    let current = repo.get_session(session.id).await.unwrap().unwrap();
    let summary = SessionSummary::from_responses(&current, &[]);
    let ended_at = fixed_now() + Duration::minutes(5);
    let finalized = repo
        .finalize_session(session.id, &summary.stats(ended_at))
        .await
        .unwrap();

    assert_eq!(finalized.ended_at, Some(ended_at));
    assert_eq!(finalized.total_questions, 3);
    assert_eq!(finalized.correct_answers, 2);
    assert_eq!(finalized.goal_achieved, Some(false));
    let accuracy = finalized.accuracy_rate.unwrap();
    assert!((accuracy - 200.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn responses_feed_answered_set_and_session_stats() {
    let repo = connect("memdb_responses").await;
    let unit = build_unit(1, "Primitive Types");
    repo.upsert_unit(&unit).await.unwrap();
    let topic = Topic {
        id: TopicId::new(10),
        unit_id: unit.id,
        name: "Integers".into(),
        description: None,
        order_index: 0,
    };
    repo.upsert_topic(&topic).await.unwrap();
    let user = seed_user(&repo, "user_1").await;

    let with_topic = repo
        .insert_question(&build_question(
            unit.id,
            Some(topic.id),
            Difficulty::Easy,
            QuestionStatus::Approved,
        ))
        .await
        .unwrap();
    let without_topic = repo
        .insert_question(&build_question(
            unit.id,
            None,
            Difficulty::Medium,
            QuestionStatus::Approved,
        ))
        .await
        .unwrap();

    let session =
        PracticeSession::start(SessionId::random(), user.clone(), unit.id, None, fixed_now());
    repo.insert_session(&session).await.unwrap();

    for (i, (question_id, correct)) in [(with_topic, true), (without_topic, false)]
        .into_iter()
        .enumerate()
    {
        repo.insert_response(&QuestionResponse {
            id: ResponseId::random(),
            user_id: user.clone(),
            question_id,
            session_id: session.id,
            user_answer: "4".into(),
            is_correct: correct,
            time_spent_secs: Some(10),
            created_at: fixed_now() + Duration::seconds(i64::try_from(i).unwrap()),
        })
        .await
        .unwrap();
    }

    let answered = repo.answered_question_ids(&user, unit.id).await.unwrap();
    assert_eq!(answered, vec![with_topic, without_topic]);

    let stats = repo.session_stats(session.id).await.unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].topic.as_deref(), Some("Integers"));
    assert_eq!(stats[0].difficulty, Difficulty::Easy);
    assert!(stats[0].is_correct);
    assert_eq!(stats[1].topic, None);
    assert_eq!(stats[1].difficulty, Difficulty::Medium);
}

#[tokio::test]
async fn progress_upserts_by_user_unit_topic() {
    let repo = connect("memdb_progress").await;
    let unit = build_unit(1, "Primitive Types");
    repo.upsert_unit(&unit).await.unwrap();
    let user = seed_user(&repo, "user_1").await;

    assert!(
        repo.get_progress(&user, unit.id, None)
            .await
            .unwrap()
            .is_none()
    );

    let mut progress = UnitProgress::new(user.clone(), unit.id, None, fixed_now());
    progress.record_answer(true, fixed_now());
    repo.upsert_progress(&progress).await.unwrap();

    let stored = repo
        .get_progress(&user, unit.id, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, progress);

    progress.record_answer(true, fixed_now());
    progress.record_answer(true, fixed_now());
    repo.upsert_progress(&progress).await.unwrap();

    let promoted = repo
        .get_progress(&user, unit.id, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(promoted.current_difficulty, Difficulty::Medium);
    assert_eq!(promoted.total_attempts, 3);

    // topic-scoped record is independent of the unit-wide one
    let scoped = UnitProgress::new(user.clone(), unit.id, Some(TopicId::new(10)), fixed_now());
    repo.upsert_progress(&scoped).await.unwrap();
    let records = repo.list_progress(&user).await.unwrap();
    assert_eq!(records.len(), 2);
}
