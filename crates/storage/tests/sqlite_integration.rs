use chrono::Duration;
use quiz_core::model::{Answer, BookId, QuizId, SessionDraft, SessionStatus, UserId};
use quiz_core::time::fixed_now;
use storage::repository::SessionRepository;
use storage::sqlite::SqliteRepository;

fn draft(user: &str, quiz: &str, started_at: chrono::DateTime<chrono::Utc>) -> SessionDraft {
    SessionDraft::new(
        UserId::new(user),
        QuizId::new(quiz),
        BookId::new("book-1"),
        started_at,
    )
}

#[tokio::test]
async fn sqlite_roundtrip_persists_session_and_answers() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let id = repo
        .create_session(&draft("u1", "quiz-1", fixed_now()))
        .await
        .unwrap();

    let session = repo.get_session(&id).await.unwrap().expect("session");
    assert_eq!(session.status(), SessionStatus::InProgress);
    assert_eq!(session.score(), None);
    assert_eq!(session.started_at(), fixed_now());
    assert!(session.answers().is_empty());

    let first = Answer::new(0, "Rome", true, fixed_now());
    let second = Answer::new(2, "Milan", false, fixed_now() + Duration::minutes(1));
    assert!(repo.append_answer(&id, &first).await.unwrap());
    assert!(repo.append_answer(&id, &second).await.unwrap());

    let session = repo.get_session(&id).await.unwrap().unwrap();
    assert_eq!(session.answered_count(), 2);
    // Insertion order, not index order.
    assert_eq!(session.answers()[0].question_index, 0);
    assert_eq!(session.answers()[1].question_index, 2);
    assert_eq!(session.answers()[1].user_answer, "Milan");
    assert!(session.has_answer(2));
}

#[tokio::test]
async fn sqlite_append_to_missing_session_is_not_applied() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_missing?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let answer = Answer::new(0, "Rome", true, fixed_now());
    let applied = repo
        .append_answer(&quiz_core::model::SessionId::new("ghost"), &answer)
        .await
        .unwrap();
    assert!(!applied);
}

#[tokio::test]
async fn sqlite_completion_is_conditional_on_status() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_complete?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let id = repo
        .create_session(&draft("u1", "quiz-1", fixed_now()))
        .await
        .unwrap();

    let completed_at = fixed_now() + Duration::minutes(5);
    assert!(repo.complete_session(&id, 50.0, completed_at).await.unwrap());
    assert!(!repo.complete_session(&id, 0.0, completed_at).await.unwrap());

    let session = repo.get_session(&id).await.unwrap().unwrap();
    assert_eq!(session.status(), SessionStatus::Completed);
    assert_eq!(session.score(), Some(50.0));
    assert_eq!(session.completed_at(), Some(completed_at));
}

#[tokio::test]
async fn sqlite_lists_user_sessions_most_recent_first() {
    let repo = SqliteRepository::connect("sqlite:file:memdb_listing?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    let base = fixed_now();
    let _old = repo
        .create_session(&draft("u1", "quiz-1", base - Duration::hours(3)))
        .await
        .unwrap();
    let newest = repo
        .create_session(&draft("u1", "quiz-2", base))
        .await
        .unwrap();
    let _other = repo
        .create_session(&draft("u2", "quiz-1", base))
        .await
        .unwrap();

    let listed = repo
        .list_user_sessions(&UserId::new("u1"), 10, 0)
        .await
        .unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id(), &newest);

    let page = repo
        .list_user_sessions(&UserId::new("u1"), 1, 1)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_ne!(page[0].id(), &newest);
}
