//! The `WorkshopStore` trait — the narrow query interface over the
//! transactional datastore.
//!
//! The trait is implemented by storage backends (e.g.
//! `baraza-store-sqlite`). The HTTP layer depends on this abstraction, not
//! on any concrete backend. Multi-row operations (session creation with its
//! activities and questions, vote batches, cascade deletion) are atomic:
//! implementations commit them as one transaction or not at all.
//!
//! All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  activity::CandidateActivity,
  enrollment::{EnrolledParticipant, Enrollment, EnrollmentStatus},
  error::StoreError,
  quiz::{QuizQuestion, QuizResult, SubmittedAnswer},
  session::{NewSession, Pagination, Session, SessionFilter, SessionUpdate},
  user::{NewUser, UserAccount},
  vote::{NewVote, RankedActivity, VoteReceipt},
};

pub trait WorkshopStore: Send + Sync {
  type Error: StoreError + Send + Sync + 'static;

  // ── Identity boundary ─────────────────────────────────────────────────

  /// Persist a new account. The email must be unused.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<UserAccount, Self::Error>> + Send + '_;

  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<UserAccount>, Self::Error>> + Send + 'a;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<UserAccount>, Self::Error>> + Send + '_;

  /// Best-effort activity-timestamp bump; callers dispatch this without
  /// blocking the parent request and ignore its failure.
  fn touch_last_active(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Session registry ──────────────────────────────────────────────────

  /// Validate, allocate a unique PIN (bounded regeneration on collision),
  /// and persist the session with its candidate activities and inline
  /// questions in one transaction.
  fn create_session(
    &self,
    input: NewSession,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Filtered listing, newest-scheduled-first, with the unpaginated total.
  fn list_sessions<'a>(
    &'a self,
    filter: &'a SessionFilter,
    page: Pagination,
  ) -> impl Future<Output = Result<(Vec<Session>, u64), Self::Error>> + Send + 'a;

  fn get_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Partial update of mutable fields. Rejects any state change that
  /// would move the session out of a terminal state.
  fn update_session(
    &self,
    id: Uuid,
    update: SessionUpdate,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Cascade-delete votes, enrollments, activities, and questions before
  /// the session row, all inside one transaction.
  fn delete_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The session's candidate activities in creation (ballot) order.
  fn list_activities(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CandidateActivity>, Self::Error>> + Send + '_;

  // ── Enrollment ────────────────────────────────────────────────────────

  /// Case-insensitive PIN redemption against non-terminal sessions.
  /// Upserts the enrollment to confirmed; rejoining is idempotent.
  fn join_by_pin<'a>(
    &'a self,
    pin: &'a str,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<Enrollment, Self::Error>> + Send + 'a;

  /// Clamps the percentage to [0, 100] and upserts it onto the
  /// enrollment row.
  fn update_training_progress(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
    percentage: i32,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_enrollment(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<Option<Enrollment>, Self::Error>> + Send + '_;

  /// Enrollments joined with identity attributes, paginated, with total.
  fn list_participants(
    &self,
    session_id: Uuid,
    page: Pagination,
  ) -> impl Future<Output = Result<(Vec<EnrolledParticipant>, u64), Self::Error>>
  + Send
  + '_;

  /// Facilitator/admin override of an enrollment's status; upserts.
  fn set_participant_status(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
    status: EnrollmentStatus,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Hard-delete one enrollment row.
  fn remove_participant(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Quiz engine ───────────────────────────────────────────────────────

  /// Active questions for the session (falling back to the shared bank),
  /// randomly sampled down to `count` when given. Answer keys included —
  /// callers serve [`crate::quiz::QuestionView`] outward.
  fn get_questions(
    &self,
    session_id: Uuid,
    count: Option<u32>,
  ) -> impl Future<Output = Result<Vec<QuizQuestion>, Self::Error>> + Send + '_;

  /// Grade server-side, append a result row, and update the enrollment's
  /// quiz flags, atomically.
  fn submit_quiz(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
    answers: Vec<SubmittedAnswer>,
  ) -> impl Future<Output = Result<QuizResult, Self::Error>> + Send + '_;

  /// The most recent attempt by timestamp; `None` is a normal outcome.
  fn latest_result(
    &self,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<Option<QuizResult>, Self::Error>> + Send + '_;

  // ── Voting aggregator ─────────────────────────────────────────────────

  /// All-or-nothing batch upsert keyed by (participant, activity,
  /// session), gated on a passed quiz, then marks voting complete.
  fn submit_votes(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
    votes: Vec<NewVote>,
  ) -> impl Future<Output = Result<VoteReceipt, Self::Error>> + Send + '_;

  /// Ranked aggregates over committed votes — eventually consistent with
  /// in-flight submissions, which is fine for a polled dashboard.
  fn live_results(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Vec<RankedActivity>, Self::Error>> + Send + '_;

  /// Whether at least one vote row exists for the pair — weaker than the
  /// voting-completed flag, which only a full batch sets.
  fn has_voted(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
