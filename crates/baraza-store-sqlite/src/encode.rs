//! Encoding and decoding helpers between Rust domain types and the
//! plain-text representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, dates as `YYYY-MM-DD`, times
//! as `HH:MM:SS`. Structured fields (criteria maps, question options, quiz
//! breakdowns) are stored as compact JSON. UUIDs are stored as hyphenated
//! lowercase strings. Enum columns use their serde `snake_case` names.

use baraza_core::{
  activity::{
    CandidateActivity, CapexTier, CriteriaMap, MaladaptationRisk,
    PriorityTier, TimeToImpact,
  },
  enrollment::{EnrolledParticipant, Enrollment, EnrollmentStatus},
  quiz::{QuizQuestion, QuizResult},
  session::{Session, SessionKind, SessionState},
  user::{Role, UserAccount},
  vote::Vote,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── Timestamps, dates, times ────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

pub fn encode_time(t: NaiveTime) -> String { t.format("%H:%M:%S").to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, "%H:%M:%S")
    .map_err(|e| Error::Decode(format!("time {s:?}: {e}")))
}

// ─── Enum columns ────────────────────────────────────────────────────────────

pub fn encode_session_kind(k: SessionKind) -> &'static str {
  match k {
    SessionKind::InPerson => "in_person",
    SessionKind::Virtual => "virtual",
    SessionKind::Hybrid => "hybrid",
  }
}

pub fn decode_session_kind(s: &str) -> Result<SessionKind> {
  match s {
    "in_person" => Ok(SessionKind::InPerson),
    "virtual" => Ok(SessionKind::Virtual),
    "hybrid" => Ok(SessionKind::Hybrid),
    other => Err(Error::Decode(format!("unknown session kind: {other:?}"))),
  }
}

pub fn encode_session_state(s: SessionState) -> &'static str { s.as_str() }

pub fn decode_session_state(s: &str) -> Result<SessionState> {
  match s {
    "scheduled" => Ok(SessionState::Scheduled),
    "in_progress" => Ok(SessionState::InProgress),
    "concluded" => Ok(SessionState::Concluded),
    "cancelled" => Ok(SessionState::Cancelled),
    other => Err(Error::Decode(format!("unknown session state: {other:?}"))),
  }
}

pub fn encode_enrollment_status(s: EnrollmentStatus) -> &'static str {
  match s {
    EnrollmentStatus::Pending => "pending",
    EnrollmentStatus::Confirmed => "confirmed",
    EnrollmentStatus::Cancelled => "cancelled",
  }
}

pub fn decode_enrollment_status(s: &str) -> Result<EnrollmentStatus> {
  match s {
    "pending" => Ok(EnrollmentStatus::Pending),
    "confirmed" => Ok(EnrollmentStatus::Confirmed),
    "cancelled" => Ok(EnrollmentStatus::Cancelled),
    other => {
      Err(Error::Decode(format!("unknown enrollment status: {other:?}")))
    }
  }
}

pub fn encode_role(r: Role) -> &'static str {
  match r {
    Role::Admin => "admin",
    Role::Facilitator => "facilitator",
    Role::Participant => "participant",
  }
}

pub fn decode_role(s: &str) -> Result<Role> {
  match s {
    "admin" => Ok(Role::Admin),
    "facilitator" => Ok(Role::Facilitator),
    "participant" => Ok(Role::Participant),
    other => Err(Error::Decode(format!("unknown role: {other:?}"))),
  }
}

pub fn encode_priority(t: PriorityTier) -> &'static str {
  match t {
    PriorityTier::High => "high",
    PriorityTier::Medium => "medium",
    PriorityTier::Low => "low",
  }
}

pub fn decode_priority(s: &str) -> Result<PriorityTier> {
  match s {
    "high" => Ok(PriorityTier::High),
    "medium" => Ok(PriorityTier::Medium),
    "low" => Ok(PriorityTier::Low),
    other => Err(Error::Decode(format!("unknown priority tier: {other:?}"))),
  }
}

pub fn encode_time_to_impact(t: TimeToImpact) -> &'static str {
  match t {
    TimeToImpact::Short => "short",
    TimeToImpact::Medium => "medium",
    TimeToImpact::Long => "long",
  }
}

pub fn decode_time_to_impact(s: &str) -> Result<TimeToImpact> {
  match s {
    "short" => Ok(TimeToImpact::Short),
    "medium" => Ok(TimeToImpact::Medium),
    "long" => Ok(TimeToImpact::Long),
    other => Err(Error::Decode(format!("unknown time-to-impact: {other:?}"))),
  }
}

pub fn encode_capex(t: CapexTier) -> &'static str {
  match t {
    CapexTier::Low => "low",
    CapexTier::Medium => "medium",
    CapexTier::High => "high",
  }
}

pub fn decode_capex(s: &str) -> Result<CapexTier> {
  match s {
    "low" => Ok(CapexTier::Low),
    "medium" => Ok(CapexTier::Medium),
    "high" => Ok(CapexTier::High),
    other => Err(Error::Decode(format!("unknown capex tier: {other:?}"))),
  }
}

pub fn encode_risk(t: MaladaptationRisk) -> &'static str {
  match t {
    MaladaptationRisk::Low => "low",
    MaladaptationRisk::Medium => "medium",
    MaladaptationRisk::High => "high",
  }
}

pub fn decode_risk(s: &str) -> Result<MaladaptationRisk> {
  match s {
    "low" => Ok(MaladaptationRisk::Low),
    "medium" => Ok(MaladaptationRisk::Medium),
    "high" => Ok(MaladaptationRisk::High),
    other => {
      Err(Error::Decode(format!("unknown maladaptation risk: {other:?}")))
    }
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:        String,
  pub name:           String,
  pub email:          String,
  pub organization:   Option<String>,
  pub role:           String,
  pub password_hash:  String,
  pub created_at:     String,
  pub last_active_at: Option<String>,
}

impl RawUser {
  pub fn into_user(self) -> Result<UserAccount> {
    Ok(UserAccount {
      user_id:        decode_uuid(&self.user_id)?,
      name:           self.name,
      email:          self.email,
      organization:   self.organization,
      role:           decode_role(&self.role)?,
      password_hash:  self.password_hash,
      created_at:     decode_dt(&self.created_at)?,
      last_active_at: self
        .last_active_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
    })
  }
}

/// Raw strings read directly from a `sessions` row.
pub struct RawSession {
  pub session_id:            String,
  pub title:                 String,
  pub description:           String,
  pub scheduled_date:        String,
  pub scheduled_time:        String,
  pub duration_hours:        u32,
  pub province:              Option<String>,
  pub district:              Option<String>,
  pub venue:                 Option<String>,
  pub virtual_link:          Option<String>,
  pub kind:                  String,
  pub state:                 String,
  pub facilitator_id:        String,
  pub expected_participants: u32,
  pub notes:                 Option<String>,
  pub pin:                   String,
  pub created_at:            String,
}

impl RawSession {
  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      session_id:            decode_uuid(&self.session_id)?,
      title:                 self.title,
      description:           self.description,
      scheduled_date:        decode_date(&self.scheduled_date)?,
      scheduled_time:        decode_time(&self.scheduled_time)?,
      duration_hours:        self.duration_hours,
      province:              self.province,
      district:              self.district,
      venue:                 self.venue,
      virtual_link:          self.virtual_link,
      kind:                  decode_session_kind(&self.kind)?,
      state:                 decode_session_state(&self.state)?,
      facilitator_id:        decode_uuid(&self.facilitator_id)?,
      expected_participants: self.expected_participants,
      notes:                 self.notes,
      pin:                   self.pin,
      created_at:            decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `activities` row.
pub struct RawActivity {
  pub activity_id:        String,
  pub session_id:         String,
  pub objective:          String,
  pub title:              String,
  pub description:        String,
  pub criteria_json:      String,
  pub priority:           String,
  pub time_to_impact:     String,
  pub capex:              String,
  pub maladaptation_risk: String,
  pub created_at:         String,
}

impl RawActivity {
  pub fn into_activity(self) -> Result<CandidateActivity> {
    Ok(CandidateActivity {
      activity_id:        decode_uuid(&self.activity_id)?,
      session_id:         decode_uuid(&self.session_id)?,
      objective:          self.objective,
      title:              self.title,
      description:        self.description,
      criteria:           CriteriaMap::from_json(&self.criteria_json)
        .map_err(Error::Core)?,
      priority:           decode_priority(&self.priority)?,
      time_to_impact:     decode_time_to_impact(&self.time_to_impact)?,
      capex:              decode_capex(&self.capex)?,
      maladaptation_risk: decode_risk(&self.maladaptation_risk)?,
      created_at:         decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `enrollments` row.
pub struct RawEnrollment {
  pub session_id:        String,
  pub participant_id:    String,
  pub status:            String,
  pub joined_at:         String,
  pub training_progress: u8,
  pub quiz_completed:    bool,
  pub quiz_passed:       bool,
  pub voting_completed:  bool,
}

impl RawEnrollment {
  pub fn into_enrollment(self) -> Result<Enrollment> {
    Ok(Enrollment {
      session_id:        decode_uuid(&self.session_id)?,
      participant_id:    decode_uuid(&self.participant_id)?,
      status:            decode_enrollment_status(&self.status)?,
      joined_at:         decode_dt(&self.joined_at)?,
      training_progress: self.training_progress,
      quiz_completed:    self.quiz_completed,
      quiz_passed:       self.quiz_passed,
      voting_completed:  self.voting_completed,
    })
  }
}

/// An `enrollments` row joined with its participant's identity columns.
pub struct RawParticipant {
  pub enrollment:   RawEnrollment,
  pub name:         String,
  pub email:        String,
  pub organization: Option<String>,
}

impl RawParticipant {
  pub fn into_participant(self) -> Result<EnrolledParticipant> {
    Ok(EnrolledParticipant {
      enrollment:   self.enrollment.into_enrollment()?,
      name:         self.name,
      email:        self.email,
      organization: self.organization,
    })
  }
}

/// Raw strings read directly from a `quiz_questions` row.
pub struct RawQuestion {
  pub question_id:    String,
  pub session_id:     Option<String>,
  pub module:         String,
  pub prompt:         String,
  pub options_json:   String,
  pub correct_option: String,
  pub explanation:    Option<String>,
  pub active:         bool,
}

impl RawQuestion {
  pub fn into_question(self) -> Result<QuizQuestion> {
    Ok(QuizQuestion {
      question_id:    decode_uuid(&self.question_id)?,
      session_id:     self
        .session_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      module:         self.module,
      prompt:         self.prompt,
      options:        serde_json::from_str(&self.options_json)?,
      correct_option: self.correct_option,
      explanation:    self.explanation,
      active:         self.active,
    })
  }
}

/// Raw strings read directly from a `quiz_results` row.
pub struct RawQuizResult {
  pub result_id:       String,
  pub participant_id:  String,
  pub session_id:      String,
  pub score_percent:   f64,
  pub passed:          bool,
  pub total_questions: u32,
  pub correct_answers: u32,
  pub breakdown_json:  String,
  pub completed_at:    String,
}

impl RawQuizResult {
  pub fn into_result(self) -> Result<QuizResult> {
    Ok(QuizResult {
      result_id:       decode_uuid(&self.result_id)?,
      participant_id:  decode_uuid(&self.participant_id)?,
      session_id:      decode_uuid(&self.session_id)?,
      score_percent:   self.score_percent,
      passed:          self.passed,
      total_questions: self.total_questions,
      correct_answers: self.correct_answers,
      breakdown:       serde_json::from_str(&self.breakdown_json)?,
      completed_at:    decode_dt(&self.completed_at)?,
    })
  }
}

/// Raw strings read directly from a `votes` row.
pub struct RawVote {
  pub participant_id: String,
  pub activity_id:    String,
  pub session_id:     String,
  pub score:          u8,
  pub priority:       u8,
  pub comment:        Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawVote {
  pub fn into_vote(self) -> Result<Vote> {
    Ok(Vote {
      participant_id: decode_uuid(&self.participant_id)?,
      activity_id:    decode_uuid(&self.activity_id)?,
      session_id:     decode_uuid(&self.session_id)?,
      score:          self.score,
      priority:       self.priority,
      comment:        self.comment,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}
