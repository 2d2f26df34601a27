//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::BTreeMap;

use baraza_core::{
  activity::{CriteriaMap, NewActivity},
  enrollment::EnrollmentStatus,
  pin::PIN_ALPHABET,
  quiz::{NewQuestion, SubmittedAnswer},
  session::{
    NewSession, Pagination, SessionFilter, SessionKind, SessionState,
    SessionUpdate,
  },
  store::WorkshopStore,
  user::{NewUser, Role},
  vote::NewVote,
};
use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn user(s: &SqliteStore, role: Role) -> baraza_core::user::UserAccount {
  s.create_user(NewUser {
    name:          "Amina Chissano".into(),
    email:         format!("{}@example.org", Uuid::new_v4()),
    organization:  Some("INGC".into()),
    role,
    password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
  })
  .await
  .unwrap()
}

fn question(prompt: &str) -> NewQuestion {
  NewQuestion {
    module:         "general".into(),
    prompt:         prompt.into(),
    options:        BTreeMap::from([
      ("a".into(), "correct".into()),
      ("b".into(), "wrong".into()),
      ("c".into(), "also wrong".into()),
    ]),
    correct_option: "a".into(),
    explanation:    None,
  }
}

fn activity(title: &str) -> NewActivity {
  NewActivity {
    objective:          "SO1 — Agro-pastoral resilience".into(),
    title:              title.into(),
    description:        String::new(),
    criteria:           CriteriaMap::from([("ADP", 3.0), ("RVC", 2.0)]),
    priority:           Default::default(),
    time_to_impact:     Default::default(),
    capex:              Default::default(),
    maladaptation_risk: Default::default(),
  }
}

/// A session with two activities and four questions (correct option "a").
fn new_session(facilitator_id: Uuid) -> NewSession {
  NewSession {
    title: "Flood resilience planning".into(),
    description: "District prioritisation workshop".into(),
    scheduled_date: NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
    scheduled_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
    duration_hours: 2,
    province: Some("Sofala".into()),
    district: Some("Buzi".into()),
    venue: Some("District hall".into()),
    virtual_link: None,
    kind: SessionKind::InPerson,
    facilitator_id,
    expected_participants: 20,
    notes: None,
    activities: vec![activity("Dike construction"), activity("Drought-tolerant seed")],
    questions: (1..=4).map(|i| question(&format!("Question {i}"))).collect(),
  }
}

/// Answers scoring `correct` of the session's question set.
async fn answers_scoring(
  s: &SqliteStore,
  session_id: Uuid,
  correct: usize,
) -> Vec<SubmittedAnswer> {
  let questions = s.get_questions(session_id, None).await.unwrap();
  questions
    .iter()
    .enumerate()
    .map(|(i, q)| SubmittedAnswer {
      question_id: q.question_id,
      selected:    if i < correct { "a".into() } else { "b".into() },
    })
    .collect()
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_find_user_is_case_insensitive_on_email() {
  let s = store().await;
  let created = s
    .create_user(NewUser {
      name:          "Carlos M.".into(),
      email:         "Carlos@Example.Org".into(),
      organization:  None,
      role:          Role::Participant,
      password_hash: "phc".into(),
    })
    .await
    .unwrap();

  assert_eq!(created.email, "carlos@example.org");

  let found = s.find_user_by_email("CARLOS@example.org").await.unwrap();
  assert_eq!(found.unwrap().user_id, created.user_id);

  let by_id = s.get_user(created.user_id).await.unwrap().unwrap();
  assert_eq!(by_id.email, "carlos@example.org");
  assert!(s.get_user(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  let input = NewUser {
    name:          "A".into(),
    email:         "dup@example.org".into(),
    organization:  None,
    role:          Role::Participant,
    password_hash: "phc".into(),
  };
  s.create_user(input.clone()).await.unwrap();

  let err = s.create_user(input).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::EmailTaken(_))
  ));
}

// ─── Session creation ────────────────────────────────────────────────────────

#[tokio::test]
async fn create_session_assigns_pin_and_persists_children() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;

  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();

  assert_eq!(session.state, SessionState::Scheduled);
  assert_eq!(session.pin.len(), 6);
  assert!(session.pin.bytes().all(|b| PIN_ALPHABET.contains(&b)));

  let fetched = s.get_session(session.session_id).await.unwrap();
  assert_eq!(fetched.title, "Flood resilience planning");
  assert_eq!(fetched.pin, session.pin);

  // Activities come back in ballot (insertion) order.
  let activities = s.list_activities(session.session_id).await.unwrap();
  assert_eq!(activities.len(), 2);
  assert_eq!(activities[0].title, "Dike construction");
  assert_eq!(activities[1].title, "Drought-tolerant seed");
  assert_eq!(activities[0].criteria, CriteriaMap::from([("ADP", 3.0), ("RVC", 2.0)]));

  let questions = s.get_questions(session.session_id, None).await.unwrap();
  assert_eq!(questions.len(), 4);
  assert!(questions.iter().all(|q| q.session_id == Some(session.session_id)));
}

#[tokio::test]
async fn create_session_without_title_fails() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;

  let mut input = new_session(facilitator.user_id);
  input.title = "  ".into();
  let err = s.create_session(input).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::Validation(_))
  ));
}

#[tokio::test]
async fn active_sessions_never_share_a_pin() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;

  let mut pins = std::collections::BTreeSet::new();
  for _ in 0..20 {
    let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();
    assert!(pins.insert(session.pin), "duplicate PIN among active sessions");
  }
}

#[tokio::test]
async fn get_session_missing_returns_not_found() {
  let s = store().await;
  let err = s.get_session(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::SessionNotFound(_))
  ));
}

// ─── Listing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_sessions_filters_and_counts() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;

  s.create_session(new_session(facilitator.user_id)).await.unwrap();

  let mut other = new_session(facilitator.user_id);
  other.province = Some("Zambezia".into());
  other.district = Some("Mocuba".into());
  s.create_session(other).await.unwrap();

  let (all, total) = s
    .list_sessions(&SessionFilter::default(), Pagination::default())
    .await
    .unwrap();
  assert_eq!(total, 2);
  assert_eq!(all.len(), 2);

  let filter = SessionFilter {
    province: Some("Sofala".into()),
    ..Default::default()
  };
  let (sofala, total) = s
    .list_sessions(&filter, Pagination::default())
    .await
    .unwrap();
  assert_eq!(total, 1);
  assert_eq!(sofala[0].province.as_deref(), Some("Sofala"));
}

#[tokio::test]
async fn list_sessions_orders_newest_scheduled_first() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;

  let mut early = new_session(facilitator.user_id);
  early.scheduled_date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
  early.title = "early".into();
  s.create_session(early).await.unwrap();

  let mut late = new_session(facilitator.user_id);
  late.scheduled_date = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
  late.title = "late".into();
  s.create_session(late).await.unwrap();

  let (sessions, _) = s
    .list_sessions(&SessionFilter::default(), Pagination::default())
    .await
    .unwrap();
  assert_eq!(sessions[0].title, "late");
  assert_eq!(sessions[1].title, "early");
}

#[tokio::test]
async fn list_sessions_rejects_oversized_limit() {
  let s = store().await;
  let err = s
    .list_sessions(
      &SessionFilter::default(),
      Pagination { page: 1, limit: 101 },
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::Validation(_))
  ));
}

// ─── Updates and the terminal-state guard ────────────────────────────────────

#[tokio::test]
async fn update_session_applies_partial_fields() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();

  s.update_session(
    session.session_id,
    SessionUpdate {
      title: Some("Renamed".into()),
      state: Some(SessionState::InProgress),
      ..Default::default()
    },
  )
  .await
  .unwrap();

  let fetched = s.get_session(session.session_id).await.unwrap();
  assert_eq!(fetched.title, "Renamed");
  assert_eq!(fetched.state, SessionState::InProgress);
  // Untouched fields survive.
  assert_eq!(fetched.description, session.description);
}

#[tokio::test]
async fn terminal_sessions_reject_state_changes() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();

  s.update_session(
    session.session_id,
    SessionUpdate { state: Some(SessionState::Cancelled), ..Default::default() },
  )
  .await
  .unwrap();

  let err = s
    .update_session(
      session.session_id,
      SessionUpdate { state: Some(SessionState::Scheduled), ..Default::default() },
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::InvalidStateTransition { .. })
  ));
}

#[tokio::test]
async fn cancelled_session_frees_its_pin_for_reuse() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();

  s.update_session(
    session.session_id,
    SessionUpdate { state: Some(SessionState::Cancelled), ..Default::default() },
  )
  .await
  .unwrap();

  // The partial unique index only covers non-terminal sessions, so the
  // PIN no longer resolves for joining…
  let participant = user(&s, Role::Participant).await;
  let err = s.join_by_pin(&session.pin, participant.user_id).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::PinNotFound)
  ));
}

// ─── Cascade delete ──────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_session_cascades_all_dependents() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let participant = user(&s, Role::Participant).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();

  s.join_by_pin(&session.pin, participant.user_id).await.unwrap();
  let answers = answers_scoring(&s, session.session_id, 4).await;
  s.submit_quiz(session.session_id, participant.user_id, answers).await.unwrap();

  let activities = s.list_activities(session.session_id).await.unwrap();
  s.submit_votes(
    session.session_id,
    participant.user_id,
    vec![NewVote {
      activity_id: activities[0].activity_id,
      score:       5,
      priority:    9,
      comment:     None,
    }],
  )
  .await
  .unwrap();

  s.delete_session(session.session_id).await.unwrap();

  // Dependent rows are gone, and queries return empties, not errors.
  assert!(s.list_activities(session.session_id).await.unwrap().is_empty());
  assert!(
    s.get_enrollment(session.session_id, participant.user_id)
      .await
      .unwrap()
      .is_none()
  );
  assert!(!s.has_voted(session.session_id, participant.user_id).await.unwrap());
  assert!(s.latest_result(participant.user_id).await.unwrap().is_none());

  let err = s.get_session(session.session_id).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::SessionNotFound(_))
  ));
}

#[tokio::test]
async fn delete_session_missing_returns_not_found() {
  let s = store().await;
  let err = s.delete_session(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::SessionNotFound(_))
  ));
}

// ─── Enrollment ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn join_by_pin_is_case_insensitive() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let participant = user(&s, Role::Participant).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();

  let lowered = session.pin.to_ascii_lowercase();
  let enrollment = s.join_by_pin(&lowered, participant.user_id).await.unwrap();

  assert_eq!(enrollment.session_id, session.session_id);
  assert_eq!(enrollment.status, EnrollmentStatus::Confirmed);
  assert_eq!(enrollment.training_progress, 0);
}

#[tokio::test]
async fn rejoining_updates_rather_than_duplicates() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let participant = user(&s, Role::Participant).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();

  s.join_by_pin(&session.pin, participant.user_id).await.unwrap();
  s.set_participant_status(
    session.session_id,
    participant.user_id,
    EnrollmentStatus::Cancelled,
  )
  .await
  .unwrap();

  // A rejoin re-confirms the same row.
  let rejoined = s.join_by_pin(&session.pin, participant.user_id).await.unwrap();
  assert_eq!(rejoined.status, EnrollmentStatus::Confirmed);

  let (participants, total) = s
    .list_participants(session.session_id, Pagination::default())
    .await
    .unwrap();
  assert_eq!(total, 1);
  assert_eq!(participants.len(), 1);
}

#[tokio::test]
async fn unknown_pin_is_rejected() {
  let s = store().await;
  let participant = user(&s, Role::Participant).await;
  let err = s.join_by_pin("AAAAAA", participant.user_id).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::PinNotFound)
  ));
}

#[tokio::test]
async fn training_progress_is_clamped_and_upserted() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let participant = user(&s, Role::Participant).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();

  // No prior join: the upsert creates the enrollment.
  s.update_training_progress(session.session_id, participant.user_id, 140)
    .await
    .unwrap();
  let enrollment = s
    .get_enrollment(session.session_id, participant.user_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(enrollment.training_progress, 100);

  s.update_training_progress(session.session_id, participant.user_id, -3)
    .await
    .unwrap();
  let enrollment = s
    .get_enrollment(session.session_id, participant.user_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(enrollment.training_progress, 0);
}

#[tokio::test]
async fn list_participants_includes_identity_attributes() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let participant = user(&s, Role::Participant).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();
  s.join_by_pin(&session.pin, participant.user_id).await.unwrap();

  let (participants, _) = s
    .list_participants(session.session_id, Pagination::default())
    .await
    .unwrap();
  assert_eq!(participants[0].name, participant.name);
  assert_eq!(participants[0].email, participant.email);
  assert_eq!(participants[0].organization.as_deref(), Some("INGC"));
}

#[tokio::test]
async fn remove_participant_deletes_or_reports_missing() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let participant = user(&s, Role::Participant).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();

  s.join_by_pin(&session.pin, participant.user_id).await.unwrap();
  s.remove_participant(session.session_id, participant.user_id)
    .await
    .unwrap();
  assert!(
    s.get_enrollment(session.session_id, participant.user_id)
      .await
      .unwrap()
      .is_none()
  );

  let err = s
    .remove_participant(session.session_id, participant.user_id)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::EnrollmentNotFound { .. })
  ));
}

// ─── Quiz ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn questions_can_be_sampled_down() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();

  let sampled = s.get_questions(session.session_id, Some(2)).await.unwrap();
  assert_eq!(sampled.len(), 2);

  // Sampling above the bank size returns everything.
  let all = s.get_questions(session.session_id, Some(50)).await.unwrap();
  assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn passing_quiz_sets_enrollment_flags() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let participant = user(&s, Role::Participant).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();
  s.join_by_pin(&session.pin, participant.user_id).await.unwrap();

  // 3 of 4 is exactly the 75% threshold.
  let answers = answers_scoring(&s, session.session_id, 3).await;
  let result = s
    .submit_quiz(session.session_id, participant.user_id, answers)
    .await
    .unwrap();

  assert_eq!(result.correct_answers, 3);
  assert_eq!(result.score_percent, 75.0);
  assert!(result.passed);
  assert_eq!(result.breakdown.len(), 4);

  let enrollment = s
    .get_enrollment(session.session_id, participant.user_id)
    .await
    .unwrap()
    .unwrap();
  assert!(enrollment.quiz_completed);
  assert!(enrollment.quiz_passed);
}

#[tokio::test]
async fn attempts_append_and_latest_wins() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let participant = user(&s, Role::Participant).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();
  s.join_by_pin(&session.pin, participant.user_id).await.unwrap();

  let failing = answers_scoring(&s, session.session_id, 2).await;
  s.submit_quiz(session.session_id, participant.user_id, failing)
    .await
    .unwrap();
  let passing = answers_scoring(&s, session.session_id, 4).await;
  s.submit_quiz(session.session_id, participant.user_id, passing)
    .await
    .unwrap();

  let latest = s.latest_result(participant.user_id).await.unwrap().unwrap();
  assert!(latest.passed);
  assert_eq!(latest.correct_answers, 4);
  assert_eq!(latest.rounded_score(), 100);
}

#[tokio::test]
async fn quiz_against_empty_question_set_is_invalid_state() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let participant = user(&s, Role::Participant).await;

  let mut input = new_session(facilitator.user_id);
  input.questions.clear();
  let session = s.create_session(input).await.unwrap();
  s.join_by_pin(&session.pin, participant.user_id).await.unwrap();

  let err = s
    .submit_quiz(
      session.session_id,
      participant.user_id,
      vec![SubmittedAnswer { question_id: Uuid::new_v4(), selected: "a".into() }],
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::NoActiveQuestions(_))
  ));
}

#[tokio::test]
async fn session_without_own_questions_uses_shared_bank() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  s.seed_bank_question(question("Bank question")).await.unwrap();

  let mut bankless = new_session(facilitator.user_id);
  bankless.questions.clear();
  let session = s.create_session(bankless).await.unwrap();

  let questions = s.get_questions(session.session_id, None).await.unwrap();
  assert_eq!(questions.len(), 1);
  assert!(questions[0].session_id.is_none());

  // A session with its own questions never mixes in bank rows.
  let owned = s.create_session(new_session(facilitator.user_id)).await.unwrap();
  let questions = s.get_questions(owned.session_id, None).await.unwrap();
  assert_eq!(questions.len(), 4);
  assert!(questions.iter().all(|q| q.session_id == Some(owned.session_id)));
}

// ─── Voting ──────────────────────────────────────────────────────────────────

async fn eligible_participant(
  s: &SqliteStore,
  session: &baraza_core::session::Session,
) -> baraza_core::user::UserAccount {
  let participant = user(s, Role::Participant).await;
  s.join_by_pin(&session.pin, participant.user_id).await.unwrap();
  let answers = answers_scoring(s, session.session_id, 4).await;
  s.submit_quiz(session.session_id, participant.user_id, answers)
    .await
    .unwrap();
  participant
}

#[tokio::test]
async fn voting_requires_a_passed_quiz() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let participant = user(&s, Role::Participant).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();
  s.join_by_pin(&session.pin, participant.user_id).await.unwrap();
  let activities = s.list_activities(session.session_id).await.unwrap();

  let err = s
    .submit_votes(
      session.session_id,
      participant.user_id,
      vec![NewVote {
        activity_id: activities[0].activity_id,
        score:       4,
        priority:    5,
        comment:     None,
      }],
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::QuizNotPassed)
  ));
  // And nothing was written.
  assert!(!s.has_voted(session.session_id, participant.user_id).await.unwrap());
}

#[tokio::test]
async fn resubmitting_a_vote_updates_in_place() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();
  let participant = eligible_participant(&s, &session).await;
  let activities = s.list_activities(session.session_id).await.unwrap();

  let vote = |score, comment: &str| NewVote {
    activity_id: activities[0].activity_id,
    score,
    priority:    5,
    comment:     Some(comment.into()),
  };

  s.submit_votes(session.session_id, participant.user_id, vec![vote(2, "meh")])
    .await
    .unwrap();
  s.submit_votes(session.session_id, participant.user_id, vec![vote(5, "vital")])
    .await
    .unwrap();

  let results = s.live_results(session.session_id).await.unwrap();
  let ranked = results
    .iter()
    .find(|r| r.activity.activity_id == activities[0].activity_id)
    .unwrap();
  // Exactly one row survived, carrying the latest submission.
  assert_eq!(ranked.vote_count, 1);
  assert_eq!(ranked.mean_score, 5.0);
  assert_eq!(ranked.comments, vec!["vital"]);
}

#[tokio::test]
async fn out_of_range_entry_rejects_the_whole_batch() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();
  let participant = eligible_participant(&s, &session).await;
  let activities = s.list_activities(session.session_id).await.unwrap();

  let batch = vec![
    NewVote { activity_id: activities[0].activity_id, score: 5, priority: 1, comment: None },
    NewVote { activity_id: activities[1].activity_id, score: 4, priority: 2, comment: None },
    // Entry 3 of 5 is out of range.
    NewVote { activity_id: activities[0].activity_id, score: 9, priority: 3, comment: None },
    NewVote { activity_id: activities[1].activity_id, score: 3, priority: 4, comment: None },
    NewVote { activity_id: activities[0].activity_id, score: 2, priority: 5, comment: None },
  ];

  let err = s
    .submit_votes(session.session_id, participant.user_id, batch)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::Validation(_))
  ));

  // None of the five persisted, including the valid ones.
  assert!(!s.has_voted(session.session_id, participant.user_id).await.unwrap());
  let enrollment = s
    .get_enrollment(session.session_id, participant.user_id)
    .await
    .unwrap()
    .unwrap();
  assert!(!enrollment.voting_completed);
}

#[tokio::test]
async fn cross_session_activity_rejects_the_batch() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();
  let other = s.create_session(new_session(facilitator.user_id)).await.unwrap();
  let participant = eligible_participant(&s, &session).await;

  let own = s.list_activities(session.session_id).await.unwrap();
  let foreign = s.list_activities(other.session_id).await.unwrap();

  let err = s
    .submit_votes(
      session.session_id,
      participant.user_id,
      vec![
        NewVote { activity_id: own[0].activity_id, score: 5, priority: 1, comment: None },
        NewVote { activity_id: foreign[0].activity_id, score: 4, priority: 2, comment: None },
      ],
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::ActivityNotInSession { .. })
  ));
  assert!(!s.has_voted(session.session_id, participant.user_id).await.unwrap());
}

#[tokio::test]
async fn voting_against_a_terminal_session_is_rejected() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();
  let participant = eligible_participant(&s, &session).await;
  let activities = s.list_activities(session.session_id).await.unwrap();

  s.update_session(
    session.session_id,
    SessionUpdate { state: Some(SessionState::Concluded), ..Default::default() },
  )
  .await
  .unwrap();

  let err = s
    .submit_votes(
      session.session_id,
      participant.user_id,
      vec![NewVote {
        activity_id: activities[0].activity_id,
        score:       3,
        priority:    3,
        comment:     None,
      }],
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(baraza_core::Error::SessionClosed(_))
  ));
}

#[tokio::test]
async fn completed_batch_sets_voting_flag_and_receipt_counts() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;
  let session = s.create_session(new_session(facilitator.user_id)).await.unwrap();
  let participant = eligible_participant(&s, &session).await;
  let activities = s.list_activities(session.session_id).await.unwrap();

  let receipt = s
    .submit_votes(
      session.session_id,
      participant.user_id,
      activities
        .iter()
        .map(|a| NewVote {
          activity_id: a.activity_id,
          score:       4,
          priority:    6,
          comment:     None,
        })
        .collect(),
    )
    .await
    .unwrap();
  assert_eq!(receipt.votes_recorded, 2);

  let enrollment = s
    .get_enrollment(session.session_id, participant.user_id)
    .await
    .unwrap()
    .unwrap();
  assert!(enrollment.voting_completed);
  assert!(s.has_voted(session.session_id, participant.user_id).await.unwrap());
}

#[tokio::test]
async fn live_results_rank_by_mean_then_count_and_include_unvoted() {
  let s = store().await;
  let facilitator = user(&s, Role::Facilitator).await;

  let mut input = new_session(facilitator.user_id);
  input.activities.push(activity("Early-warning sirens"));
  let session = s.create_session(input).await.unwrap();
  let activities = s.list_activities(session.session_id).await.unwrap();
  let (a, b) = (&activities[0], &activities[1]);

  // A gets scores 5 and 3 (mean 4.0, two votes); B gets a single 4
  // (mean 4.0, one vote). The tie goes to A on count.
  let alice = eligible_participant(&s, &session).await;
  let bob = eligible_participant(&s, &session).await;

  s.submit_votes(
    session.session_id,
    alice.user_id,
    vec![
      NewVote { activity_id: a.activity_id, score: 5, priority: 9, comment: Some("top need".into()) },
      NewVote { activity_id: b.activity_id, score: 4, priority: 5, comment: None },
    ],
  )
  .await
  .unwrap();
  s.submit_votes(
    session.session_id,
    bob.user_id,
    vec![NewVote { activity_id: a.activity_id, score: 3, priority: 4, comment: Some("".into()) }],
  )
  .await
  .unwrap();

  let results = s.live_results(session.session_id).await.unwrap();
  assert_eq!(results.len(), 3);

  assert_eq!(results[0].activity.activity_id, a.activity_id);
  assert_eq!(results[0].vote_count, 2);
  assert_eq!(results[0].mean_score, 4.0);
  assert_eq!(results[0].comments, vec!["top need"]);

  assert_eq!(results[1].activity.activity_id, b.activity_id);
  assert_eq!(results[1].vote_count, 1);
  assert_eq!(results[1].mean_score, 4.0);

  // The unvoted third activity still appears, with zeroed means.
  assert_eq!(results[2].vote_count, 0);
  assert_eq!(results[2].mean_score, 0.0);
}
