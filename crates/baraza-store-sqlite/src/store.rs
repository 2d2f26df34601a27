//! [`SqliteStore`] — the SQLite implementation of [`WorkshopStore`].
//!
//! Multi-row operations (session creation, quiz submission, vote batches,
//! cascade deletion) run inside one `rusqlite` transaction: commit on
//! success, rollback on any error path, so partial application never
//! persists.

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rand_core::OsRng;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use baraza_core::{
  activity::CandidateActivity,
  enrollment::{
    self, EnrolledParticipant, Enrollment, EnrollmentStatus,
  },
  pin,
  quiz::{self, QuizQuestion, QuizResult, SubmittedAnswer},
  session::{
    NewSession, Pagination, Session, SessionFilter, SessionState,
    SessionUpdate,
  },
  store::WorkshopStore,
  user::{NewUser, UserAccount},
  vote::{self, NewVote, RankedActivity, VoteReceipt},
};

use crate::{
  Error, Result,
  encode::{
    RawActivity, RawEnrollment, RawParticipant, RawQuestion, RawQuizResult,
    RawSession, RawUser, RawVote, encode_capex, encode_date, encode_dt,
    encode_enrollment_status, encode_priority, encode_risk,
    encode_session_kind, encode_session_state, encode_time,
    encode_time_to_impact, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Column lists and row mappers ────────────────────────────────────────────

const SESSION_COLUMNS: &str = "session_id, title, description, \
   scheduled_date, scheduled_time, duration_hours, province, district, \
   venue, virtual_link, kind, state, facilitator_id, \
   expected_participants, notes, pin, created_at";

const QUESTION_COLUMNS: &str = "question_id, session_id, module, prompt, \
   options_json, correct_option, explanation, active";

const ENROLLMENT_COLUMNS: &str = "session_id, participant_id, status, \
   joined_at, training_progress, quiz_completed, quiz_passed, \
   voting_completed";

fn map_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSession> {
  Ok(RawSession {
    session_id:            row.get(0)?,
    title:                 row.get(1)?,
    description:           row.get(2)?,
    scheduled_date:        row.get(3)?,
    scheduled_time:        row.get(4)?,
    duration_hours:        row.get(5)?,
    province:              row.get(6)?,
    district:              row.get(7)?,
    venue:                 row.get(8)?,
    virtual_link:          row.get(9)?,
    kind:                  row.get(10)?,
    state:                 row.get(11)?,
    facilitator_id:        row.get(12)?,
    expected_participants: row.get(13)?,
    notes:                 row.get(14)?,
    pin:                   row.get(15)?,
    created_at:            row.get(16)?,
  })
}

fn map_question(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawQuestion> {
  Ok(RawQuestion {
    question_id:    row.get(0)?,
    session_id:     row.get(1)?,
    module:         row.get(2)?,
    prompt:         row.get(3)?,
    options_json:   row.get(4)?,
    correct_option: row.get(5)?,
    explanation:    row.get(6)?,
    active:         row.get(7)?,
  })
}

fn map_enrollment(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEnrollment> {
  Ok(RawEnrollment {
    session_id:        row.get(0)?,
    participant_id:    row.get(1)?,
    status:            row.get(2)?,
    joined_at:         row.get(3)?,
    training_progress: row.get(4)?,
    quiz_completed:    row.get(5)?,
    quiz_passed:       row.get(6)?,
    voting_completed:  row.get(7)?,
  })
}

// ─── Closure-side helpers ────────────────────────────────────────────────────

fn session_exists(
  conn: &rusqlite::Connection,
  id_str: &str,
) -> Result<bool> {
  let found: Option<bool> = conn
    .query_row(
      "SELECT 1 FROM sessions WHERE session_id = ?1",
      rusqlite::params![id_str],
      |_| Ok(true),
    )
    .optional()?;
  Ok(found.unwrap_or(false))
}

fn session_state_of(
  conn: &rusqlite::Connection,
  id_str: &str,
) -> Result<Option<SessionState>> {
  let state: Option<String> = conn
    .query_row(
      "SELECT state FROM sessions WHERE session_id = ?1",
      rusqlite::params![id_str],
      |r| r.get(0),
    )
    .optional()?;
  state
    .as_deref()
    .map(crate::encode::decode_session_state)
    .transpose()
}

fn enrollment_row(
  conn: &rusqlite::Connection,
  session_str: &str,
  participant_str: &str,
) -> Result<Option<RawEnrollment>> {
  Ok(
    conn
      .query_row(
        &format!(
          "SELECT {ENROLLMENT_COLUMNS} FROM enrollments
           WHERE session_id = ?1 AND participant_id = ?2"
        ),
        rusqlite::params![session_str, participant_str],
        map_enrollment,
      )
      .optional()?,
  )
}

/// Active questions for a session: its own question set when it has one,
/// otherwise the shared (unscoped) bank. `sample` switches to a random
/// draw of at most that many rows.
fn active_questions(
  conn: &rusqlite::Connection,
  session_str: &str,
  sample: Option<u32>,
) -> Result<Vec<RawQuestion>> {
  let order = match sample {
    Some(_) => "ORDER BY RANDOM()",
    None => "ORDER BY module, rowid",
  };
  // LIMIT -1 is SQLite for "no limit".
  let limit = sample.map_or(-1_i64, i64::from);

  let mut stmt = conn.prepare(&format!(
    "SELECT {QUESTION_COLUMNS} FROM quiz_questions
     WHERE session_id = ?1 AND active = 1 {order} LIMIT ?2"
  ))?;
  let scoped = stmt
    .query_map(rusqlite::params![session_str, limit], map_question)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  if !scoped.is_empty() {
    return Ok(scoped);
  }

  let mut stmt = conn.prepare(&format!(
    "SELECT {QUESTION_COLUMNS} FROM quiz_questions
     WHERE session_id IS NULL AND active = 1 {order} LIMIT ?1"
  ))?;
  let bank = stmt
    .query_map(rusqlite::params![limit], map_question)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(bank)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A baraza workshop store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted, and all
/// calls are serialised onto its worker thread.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection's worker thread. The nested result lets
  /// domain errors raised inside the closure keep their type.
  async fn call<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }

  /// Run `f` inside a transaction: commit on success, rollback (by drop)
  /// on any error, including domain errors raised mid-way.
  async fn transact<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T> + Send + 'static,
  {
    self
      .call(move |conn| {
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
      })
      .await
  }
}

#[cfg(test)]
impl SqliteStore {
  /// Test-only seeding of the shared (session-NULL) question bank; bank
  /// administration sits outside the store's public surface.
  pub(crate) async fn seed_bank_question(
    &self,
    q: baraza_core::quiz::NewQuestion,
  ) -> Result<()> {
    let qid = encode_uuid(Uuid::new_v4());
    let options = serde_json::to_string(&q.options)?;
    self
      .call(move |conn| {
        conn.execute(
          "INSERT INTO quiz_questions (
             question_id, session_id, module, prompt, options_json,
             correct_option, explanation, active
           ) VALUES (?1, NULL, ?2, ?3, ?4, ?5, ?6, 1)",
          rusqlite::params![
            qid, q.module, q.prompt, options, q.correct_option, q.explanation
          ],
        )?;
        Ok(())
      })
      .await
  }
}

// ─── WorkshopStore impl ──────────────────────────────────────────────────────

impl WorkshopStore for SqliteStore {
  type Error = Error;

  // ── Identity boundary ─────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<UserAccount> {
    let user = UserAccount {
      user_id:        Uuid::new_v4(),
      name:           input.name,
      email:          input.email.trim().to_ascii_lowercase(),
      organization:   input.organization,
      role:           input.role,
      password_hash:  input.password_hash,
      created_at:     Utc::now(),
      last_active_at: None,
    };

    let id_str   = encode_uuid(user.user_id);
    let name     = user.name.clone();
    let email    = user.email.clone();
    let org      = user.organization.clone();
    let role_str = crate::encode::encode_role(user.role).to_owned();
    let hash     = user.password_hash.clone();
    let at_str   = encode_dt(user.created_at);

    self
      .call(move |conn| {
        let taken: Option<bool> = conn
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![email],
            |_| Ok(true),
          )
          .optional()?;
        if taken.unwrap_or(false) {
          return Err(Error::Core(baraza_core::Error::EmailTaken(email)));
        }

        conn.execute(
          "INSERT INTO users (
             user_id, name, email, organization, role, password_hash,
             created_at, last_active_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL)",
          rusqlite::params![id_str, name, email, org, role_str, hash, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn find_user_by_email(
    &self,
    email: &str,
  ) -> Result<Option<UserAccount>> {
    let needle = email.trim().to_ascii_lowercase();

    let raw: Option<RawUser> = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, name, email, organization, role,
                      password_hash, created_at, last_active_at
               FROM users WHERE email = ?1",
              rusqlite::params![needle],
              |row| {
                Ok(RawUser {
                  user_id:        row.get(0)?,
                  name:           row.get(1)?,
                  email:          row.get(2)?,
                  organization:   row.get(3)?,
                  role:           row.get(4)?,
                  password_hash:  row.get(5)?,
                  created_at:     row.get(6)?,
                  last_active_at: row.get(7)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<UserAccount>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, name, email, organization, role,
                      password_hash, created_at, last_active_at
               FROM users WHERE user_id = ?1",
              rusqlite::params![id_str],
              |row| {
                Ok(RawUser {
                  user_id:        row.get(0)?,
                  name:           row.get(1)?,
                  email:          row.get(2)?,
                  organization:   row.get(3)?,
                  role:           row.get(4)?,
                  password_hash:  row.get(5)?,
                  created_at:     row.get(6)?,
                  last_active_at: row.get(7)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn touch_last_active(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(Utc::now());

    self
      .call(move |conn| {
        conn.execute(
          "UPDATE users SET last_active_at = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await
  }

  // ── Session registry ──────────────────────────────────────────────────

  async fn create_session(&self, input: NewSession) -> Result<Session> {
    input.validate().map_err(Error::Core)?;

    // The generator is stateless; candidates are drawn up front and the
    // first one free among non-terminal sessions wins, inside the same
    // transaction that inserts the session.
    let pin_candidates: Vec<String> = (0..pin::MAX_GENERATION_ATTEMPTS)
      .map(|_| pin::generate(&mut OsRng))
      .collect();

    let session_id = Uuid::new_v4();
    let created_at = Utc::now();

    let id_str      = encode_uuid(session_id);
    let title       = input.title.clone();
    let description = input.description.clone();
    let date_str    = encode_date(input.scheduled_date);
    let time_str    = encode_time(input.scheduled_time);
    let duration    = input.duration_hours;
    let province    = input.province.clone();
    let district    = input.district.clone();
    let venue       = input.venue.clone();
    let link        = input.virtual_link.clone();
    let kind_str    = encode_session_kind(input.kind).to_owned();
    let state_str   = encode_session_state(SessionState::Scheduled).to_owned();
    let facilitator = encode_uuid(input.facilitator_id);
    let expected    = input.expected_participants;
    let notes       = input.notes.clone();
    let at_str      = encode_dt(created_at);

    // Pre-encode dependent rows so the closure only executes SQL.
    let activity_rows: Vec<(String, String, String, String, String, String, String, String, String)> =
      input
        .activities
        .iter()
        .map(|a| {
          Ok((
            encode_uuid(Uuid::new_v4()),
            a.objective.clone(),
            a.title.clone(),
            a.description.clone(),
            a.criteria.to_json().map_err(Error::Core)?,
            encode_priority(a.priority).to_owned(),
            encode_time_to_impact(a.time_to_impact).to_owned(),
            encode_capex(a.capex).to_owned(),
            encode_risk(a.maladaptation_risk).to_owned(),
          ))
        })
        .collect::<Result<_>>()?;

    let question_rows: Vec<(String, String, String, String, String, Option<String>)> =
      input
        .questions
        .iter()
        .map(|q| {
          Ok((
            encode_uuid(Uuid::new_v4()),
            q.module.clone(),
            q.prompt.clone(),
            serde_json::to_string(&q.options)?,
            q.correct_option.clone(),
            q.explanation.clone(),
          ))
        })
        .collect::<Result<_>>()?;

    let chosen_pin: String = self
      .transact(move |tx| {
        let mut chosen = None;
        for candidate in &pin_candidates {
          let in_use: Option<bool> = tx
            .query_row(
              "SELECT 1 FROM sessions
               WHERE pin = ?1 AND state IN ('scheduled', 'in_progress')",
              rusqlite::params![candidate],
              |_| Ok(true),
            )
            .optional()?;
          if !in_use.unwrap_or(false) {
            chosen = Some(candidate.clone());
            break;
          }
        }
        let pin = chosen
          .ok_or(Error::Core(baraza_core::Error::PinExhausted))?;

        tx.execute(
          "INSERT INTO sessions (
             session_id, title, description, scheduled_date,
             scheduled_time, duration_hours, province, district, venue,
             virtual_link, kind, state, facilitator_id,
             expected_participants, notes, pin, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     ?13, ?14, ?15, ?16, ?17)",
          rusqlite::params![
            id_str, title, description, date_str, time_str, duration,
            province, district, venue, link, kind_str, state_str,
            facilitator, expected, notes, pin, at_str,
          ],
        )?;

        for (aid, objective, atitle, adesc, criteria, prio, tti, capex, risk) in
          &activity_rows
        {
          tx.execute(
            "INSERT INTO activities (
               activity_id, session_id, objective, title, description,
               criteria_json, priority, time_to_impact, capex,
               maladaptation_risk, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
              aid, id_str, objective, atitle, adesc, criteria, prio, tti,
              capex, risk, at_str,
            ],
          )?;
        }

        for (qid, module, prompt, options, correct, explanation) in
          &question_rows
        {
          tx.execute(
            "INSERT INTO quiz_questions (
               question_id, session_id, module, prompt, options_json,
               correct_option, explanation, active
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
            rusqlite::params![
              qid, id_str, module, prompt, options, correct, explanation,
            ],
          )?;
        }

        Ok(pin)
      })
      .await?;

    Ok(Session {
      session_id,
      title: input.title,
      description: input.description,
      scheduled_date: input.scheduled_date,
      scheduled_time: input.scheduled_time,
      duration_hours: input.duration_hours,
      province: input.province,
      district: input.district,
      venue: input.venue,
      virtual_link: input.virtual_link,
      kind: input.kind,
      state: SessionState::Scheduled,
      facilitator_id: input.facilitator_id,
      expected_participants: input.expected_participants,
      notes: input.notes,
      pin: chosen_pin,
      created_at,
    })
  }

  async fn list_sessions(
    &self,
    filter: &SessionFilter,
    page: Pagination,
  ) -> Result<(Vec<Session>, u64)> {
    page.validate().map_err(Error::Core)?;

    let province  = filter.province.clone();
    let district  = filter.district.clone();
    let state_str = filter.state.map(encode_session_state).map(str::to_owned);
    let kind_str  = filter.kind.map(encode_session_kind).map(str::to_owned);
    let limit     = i64::from(page.limit);
    let offset    = page.offset() as i64;

    const FILTER_CLAUSE: &str = "WHERE (?1 IS NULL OR province = ?1)
         AND (?2 IS NULL OR district = ?2)
         AND (?3 IS NULL OR state = ?3)
         AND (?4 IS NULL OR kind = ?4)";

    self
      .call(move |conn| {
        let total: u64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM sessions {FILTER_CLAUSE}"),
          rusqlite::params![province, district, state_str, kind_str],
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
          "SELECT {SESSION_COLUMNS} FROM sessions {FILTER_CLAUSE}
           ORDER BY scheduled_date DESC, created_at DESC
           LIMIT ?5 OFFSET ?6"
        ))?;
        let raws = stmt
          .query_map(
            rusqlite::params![
              province, district, state_str, kind_str, limit, offset
            ],
            map_session,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let sessions = raws
          .into_iter()
          .map(RawSession::into_session)
          .collect::<Result<Vec<_>>>()?;
        Ok((sessions, total))
      })
      .await
  }

  async fn get_session(&self, id: Uuid) -> Result<Session> {
    let id_str = encode_uuid(id);

    let raw: Option<RawSession> = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = ?1"
              ),
              rusqlite::params![id_str],
              map_session,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .ok_or(Error::Core(baraza_core::Error::SessionNotFound(id)))?
      .into_session()
  }

  async fn update_session(
    &self,
    id: Uuid,
    update: SessionUpdate,
  ) -> Result<()> {
    let id_str    = encode_uuid(id);
    let title     = update.title;
    let desc      = update.description;
    let new_state = update.state;
    let state_str = new_state.map(encode_session_state).map(str::to_owned);
    let date_str  = update.scheduled_date.map(encode_date);
    let time_str  = update.scheduled_time.map(encode_time);

    self
      .call(move |conn| {
        let current = session_state_of(conn, &id_str)?
          .ok_or(Error::Core(baraza_core::Error::SessionNotFound(id)))?;

        if let Some(next) = new_state
          && !current.can_transition_to(next)
        {
          return Err(Error::Core(
            baraza_core::Error::InvalidStateTransition {
              session_id: id,
              from:       current,
              to:         next,
            },
          ));
        }

        conn.execute(
          "UPDATE sessions SET
             title          = COALESCE(?2, title),
             description    = COALESCE(?3, description),
             state          = COALESCE(?4, state),
             scheduled_date = COALESCE(?5, scheduled_date),
             scheduled_time = COALESCE(?6, scheduled_time)
           WHERE session_id = ?1",
          rusqlite::params![id_str, title, desc, state_str, date_str, time_str],
        )?;
        Ok(())
      })
      .await
  }

  async fn delete_session(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    self
      .transact(move |tx| {
        if !session_exists(tx, &id_str)? {
          return Err(Error::Core(baraza_core::Error::SessionNotFound(id)));
        }

        // Children first, respecting foreign keys: votes reference
        // activities, everything references the session.
        tx.execute("DELETE FROM votes WHERE session_id = ?1", rusqlite::params![id_str])?;
        tx.execute("DELETE FROM quiz_results WHERE session_id = ?1", rusqlite::params![id_str])?;
        tx.execute("DELETE FROM enrollments WHERE session_id = ?1", rusqlite::params![id_str])?;
        tx.execute("DELETE FROM quiz_questions WHERE session_id = ?1", rusqlite::params![id_str])?;
        tx.execute("DELETE FROM activities WHERE session_id = ?1", rusqlite::params![id_str])?;
        tx.execute("DELETE FROM sessions WHERE session_id = ?1", rusqlite::params![id_str])?;
        Ok(())
      })
      .await
  }

  async fn list_activities(
    &self,
    session_id: Uuid,
  ) -> Result<Vec<CandidateActivity>> {
    let id_str = encode_uuid(session_id);

    let raws: Vec<RawActivity> = self
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT activity_id, session_id, objective, title, description,
                  criteria_json, priority, time_to_impact, capex,
                  maladaptation_risk, created_at
           FROM activities WHERE session_id = ?1
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawActivity {
              activity_id:        row.get(0)?,
              session_id:         row.get(1)?,
              objective:          row.get(2)?,
              title:              row.get(3)?,
              description:        row.get(4)?,
              criteria_json:      row.get(5)?,
              priority:           row.get(6)?,
              time_to_impact:     row.get(7)?,
              capex:              row.get(8)?,
              maladaptation_risk: row.get(9)?,
              created_at:         row.get(10)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawActivity::into_activity).collect()
  }

  // ── Enrollment ────────────────────────────────────────────────────────

  async fn join_by_pin(
    &self,
    pin: &str,
    participant_id: Uuid,
  ) -> Result<Enrollment> {
    let needle          = baraza_core::pin::normalize(pin);
    let participant_str = encode_uuid(participant_id);
    let joined_str      = encode_dt(Utc::now());

    let raw: RawEnrollment = self
      .call(move |conn| {
        let session_str: Option<String> = conn
          .query_row(
            "SELECT session_id FROM sessions
             WHERE pin = ?1 AND state IN ('scheduled', 'in_progress')",
            rusqlite::params![needle],
            |r| r.get(0),
          )
          .optional()?;
        let session_str =
          session_str.ok_or(Error::Core(baraza_core::Error::PinNotFound))?;

        // Rejoining re-confirms; the original join timestamp and any
        // accrued progress flags are preserved.
        conn.execute(
          "INSERT INTO enrollments (
             session_id, participant_id, status, joined_at,
             training_progress, quiz_completed, quiz_passed,
             voting_completed
           ) VALUES (?1, ?2, 'confirmed', ?3, 0, 0, 0, 0)
           ON CONFLICT(session_id, participant_id)
           DO UPDATE SET status = 'confirmed'",
          rusqlite::params![session_str, participant_str, joined_str],
        )?;

        let session_id = crate::encode::decode_uuid(&session_str)?;
        enrollment_row(conn, &session_str, &participant_str)?.ok_or(
          Error::Core(baraza_core::Error::EnrollmentNotFound {
            session_id,
            participant_id,
          }),
        )
      })
      .await?;

    raw.into_enrollment()
  }

  async fn update_training_progress(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
    percentage: i32,
  ) -> Result<()> {
    let clamped         = enrollment::clamp_progress(percentage);
    let session_str     = encode_uuid(session_id);
    let participant_str = encode_uuid(participant_id);
    let joined_str      = encode_dt(Utc::now());

    self
      .call(move |conn| {
        if !session_exists(conn, &session_str)? {
          return Err(Error::Core(baraza_core::Error::SessionNotFound(
            session_id,
          )));
        }

        conn.execute(
          "INSERT INTO enrollments (
             session_id, participant_id, status, joined_at,
             training_progress, quiz_completed, quiz_passed,
             voting_completed
           ) VALUES (?1, ?2, 'confirmed', ?3, ?4, 0, 0, 0)
           ON CONFLICT(session_id, participant_id)
           DO UPDATE SET training_progress = excluded.training_progress",
          rusqlite::params![session_str, participant_str, joined_str, clamped],
        )?;
        Ok(())
      })
      .await
  }

  async fn get_enrollment(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
  ) -> Result<Option<Enrollment>> {
    let session_str     = encode_uuid(session_id);
    let participant_str = encode_uuid(participant_id);

    let raw = self
      .call(move |conn| enrollment_row(conn, &session_str, &participant_str))
      .await?;
    raw.map(RawEnrollment::into_enrollment).transpose()
  }

  async fn list_participants(
    &self,
    session_id: Uuid,
    page: Pagination,
  ) -> Result<(Vec<EnrolledParticipant>, u64)> {
    page.validate().map_err(Error::Core)?;

    let session_str = encode_uuid(session_id);
    let limit       = i64::from(page.limit);
    let offset      = page.offset() as i64;

    self
      .call(move |conn| {
        if !session_exists(conn, &session_str)? {
          return Err(Error::Core(baraza_core::Error::SessionNotFound(
            session_id,
          )));
        }

        let total: u64 = conn.query_row(
          "SELECT COUNT(*) FROM enrollments WHERE session_id = ?1",
          rusqlite::params![session_str],
          |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(
          "SELECT e.session_id, e.participant_id, e.status, e.joined_at,
                  e.training_progress, e.quiz_completed, e.quiz_passed,
                  e.voting_completed,
                  u.name, u.email, u.organization
           FROM enrollments e
           JOIN users u ON u.user_id = e.participant_id
           WHERE e.session_id = ?1
           ORDER BY e.joined_at DESC
           LIMIT ?2 OFFSET ?3",
        )?;
        let raws = stmt
          .query_map(
            rusqlite::params![session_str, limit, offset],
            |row| {
              Ok(RawParticipant {
                enrollment:   map_enrollment(row)?,
                name:         row.get(8)?,
                email:        row.get(9)?,
                organization: row.get(10)?,
              })
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let participants = raws
          .into_iter()
          .map(RawParticipant::into_participant)
          .collect::<Result<Vec<_>>>()?;
        Ok((participants, total))
      })
      .await
  }

  async fn set_participant_status(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
    status: EnrollmentStatus,
  ) -> Result<()> {
    let session_str     = encode_uuid(session_id);
    let participant_str = encode_uuid(participant_id);
    let status_str      = encode_enrollment_status(status).to_owned();
    let joined_str      = encode_dt(Utc::now());

    self
      .call(move |conn| {
        if !session_exists(conn, &session_str)? {
          return Err(Error::Core(baraza_core::Error::SessionNotFound(
            session_id,
          )));
        }

        conn.execute(
          "INSERT INTO enrollments (
             session_id, participant_id, status, joined_at,
             training_progress, quiz_completed, quiz_passed,
             voting_completed
           ) VALUES (?1, ?2, ?3, ?4, 0, 0, 0, 0)
           ON CONFLICT(session_id, participant_id)
           DO UPDATE SET status = excluded.status",
          rusqlite::params![session_str, participant_str, status_str, joined_str],
        )?;
        Ok(())
      })
      .await
  }

  async fn remove_participant(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
  ) -> Result<()> {
    let session_str     = encode_uuid(session_id);
    let participant_str = encode_uuid(participant_id);

    self
      .call(move |conn| {
        let removed = conn.execute(
          "DELETE FROM enrollments
           WHERE session_id = ?1 AND participant_id = ?2",
          rusqlite::params![session_str, participant_str],
        )?;
        if removed == 0 {
          return Err(Error::Core(
            baraza_core::Error::EnrollmentNotFound {
              session_id,
              participant_id,
            },
          ));
        }
        Ok(())
      })
      .await
  }

  // ── Quiz engine ───────────────────────────────────────────────────────

  async fn get_questions(
    &self,
    session_id: Uuid,
    count: Option<u32>,
  ) -> Result<Vec<QuizQuestion>> {
    let session_str = encode_uuid(session_id);

    let raws = self
      .call(move |conn| {
        if !session_exists(conn, &session_str)? {
          return Err(Error::Core(baraza_core::Error::SessionNotFound(
            session_id,
          )));
        }
        active_questions(conn, &session_str, count)
      })
      .await?;

    raws.into_iter().map(RawQuestion::into_question).collect()
  }

  async fn submit_quiz(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
    answers: Vec<SubmittedAnswer>,
  ) -> Result<QuizResult> {
    let result_id       = Uuid::new_v4();
    let completed_at    = Utc::now();
    let session_str     = encode_uuid(session_id);
    let participant_str = encode_uuid(participant_id);
    let result_str      = encode_uuid(result_id);
    let at_str          = encode_dt(completed_at);

    self
      .transact(move |tx| {
        if !session_exists(tx, &session_str)? {
          return Err(Error::Core(baraza_core::Error::SessionNotFound(
            session_id,
          )));
        }

        let questions = active_questions(tx, &session_str, None)?
          .into_iter()
          .map(RawQuestion::into_question)
          .collect::<Result<Vec<_>>>()?;
        if questions.is_empty() {
          return Err(Error::Core(baraza_core::Error::NoActiveQuestions(
            session_id,
          )));
        }

        let graded = quiz::grade(&questions, &answers).map_err(Error::Core)?;
        let breakdown_json = serde_json::to_string(&graded.breakdown)?;

        tx.execute(
          "INSERT INTO quiz_results (
             result_id, participant_id, session_id, score_percent, passed,
             total_questions, correct_answers, breakdown_json, completed_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            result_str,
            participant_str,
            session_str,
            graded.score_percent,
            graded.passed,
            graded.total_questions,
            graded.correct_answers,
            breakdown_json,
            at_str,
          ],
        )?;

        // Gate flags ride along in the same transaction; a participant who
        // never formally joined still gets an enrollment row to carry them.
        tx.execute(
          "INSERT INTO enrollments (
             session_id, participant_id, status, joined_at,
             training_progress, quiz_completed, quiz_passed,
             voting_completed
           ) VALUES (?1, ?2, 'confirmed', ?3, 0, 1, ?4, 0)
           ON CONFLICT(session_id, participant_id)
           DO UPDATE SET quiz_completed = 1,
                         quiz_passed    = excluded.quiz_passed",
          rusqlite::params![session_str, participant_str, at_str, graded.passed],
        )?;

        Ok(QuizResult {
          result_id,
          participant_id,
          session_id,
          score_percent: graded.score_percent,
          passed: graded.passed,
          total_questions: graded.total_questions,
          correct_answers: graded.correct_answers,
          breakdown: graded.breakdown,
          completed_at,
        })
      })
      .await
  }

  async fn latest_result(
    &self,
    participant_id: Uuid,
  ) -> Result<Option<QuizResult>> {
    let participant_str = encode_uuid(participant_id);

    let raw: Option<RawQuizResult> = self
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT result_id, participant_id, session_id, score_percent,
                      passed, total_questions, correct_answers,
                      breakdown_json, completed_at
               FROM quiz_results
               WHERE participant_id = ?1
               ORDER BY completed_at DESC
               LIMIT 1",
              rusqlite::params![participant_str],
              |row| {
                Ok(RawQuizResult {
                  result_id:       row.get(0)?,
                  participant_id:  row.get(1)?,
                  session_id:      row.get(2)?,
                  score_percent:   row.get(3)?,
                  passed:          row.get(4)?,
                  total_questions: row.get(5)?,
                  correct_answers: row.get(6)?,
                  breakdown_json:  row.get(7)?,
                  completed_at:    row.get(8)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawQuizResult::into_result).transpose()
  }

  // ── Voting aggregator ─────────────────────────────────────────────────

  async fn submit_votes(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
    votes: Vec<NewVote>,
  ) -> Result<VoteReceipt> {
    if votes.is_empty() {
      return Err(Error::Core(baraza_core::Error::Validation(
        "no votes to submit".into(),
      )));
    }
    // Bounds are checked for the whole batch before any row is written;
    // one bad entry rejects everything.
    for entry in &votes {
      entry.validate().map_err(Error::Core)?;
    }

    let completed_at    = Utc::now();
    let session_str     = encode_uuid(session_id);
    let participant_str = encode_uuid(participant_id);
    let now_str         = encode_dt(completed_at);
    let recorded        = votes.len() as u32;

    let vote_rows: Vec<(String, String, u8, u8, Option<String>, Uuid)> = votes
      .into_iter()
      .map(|v| {
        (
          encode_uuid(Uuid::new_v4()),
          encode_uuid(v.activity_id),
          v.score,
          v.priority,
          v.comment,
          v.activity_id,
        )
      })
      .collect();

    self
      .transact(move |tx| {
        let state = session_state_of(tx, &session_str)?
          .ok_or(Error::Core(baraza_core::Error::SessionNotFound(session_id)))?;
        if state.is_terminal() {
          return Err(Error::Core(baraza_core::Error::SessionClosed(
            session_id,
          )));
        }

        let enrollment = enrollment_row(tx, &session_str, &participant_str)?;
        if !enrollment.is_some_and(|e| e.quiz_passed) {
          return Err(Error::Core(baraza_core::Error::QuizNotPassed));
        }

        for (vote_str, activity_str, score, priority, comment, activity_id) in
          &vote_rows
        {
          let owner: Option<String> = tx
            .query_row(
              "SELECT session_id FROM activities WHERE activity_id = ?1",
              rusqlite::params![activity_str],
              |r| r.get(0),
            )
            .optional()?;
          if owner.as_deref() != Some(session_str.as_str()) {
            return Err(Error::Core(
              baraza_core::Error::ActivityNotInSession {
                activity_id: *activity_id,
                session_id,
              },
            ));
          }

          tx.execute(
            "INSERT INTO votes (
               vote_id, participant_id, activity_id, session_id, score,
               priority, comment, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT(participant_id, activity_id, session_id)
             DO UPDATE SET score      = excluded.score,
                           priority   = excluded.priority,
                           comment    = excluded.comment,
                           updated_at = excluded.updated_at",
            rusqlite::params![
              vote_str, participant_str, activity_str, session_str, score,
              priority, comment, now_str,
            ],
          )?;
        }

        tx.execute(
          "UPDATE enrollments SET voting_completed = 1
           WHERE session_id = ?1 AND participant_id = ?2",
          rusqlite::params![session_str, participant_str],
        )?;

        Ok(())
      })
      .await?;

    Ok(VoteReceipt {
      session_id,
      participant_id,
      votes_recorded: recorded,
      completed_at,
    })
  }

  async fn live_results(
    &self,
    session_id: Uuid,
  ) -> Result<Vec<RankedActivity>> {
    let session_str = encode_uuid(session_id);

    let pairs = self
      .call(move |conn| {
        if !session_exists(conn, &session_str)? {
          return Err(Error::Core(baraza_core::Error::SessionNotFound(
            session_id,
          )));
        }

        let mut stmt = conn.prepare(
          "SELECT activity_id, session_id, objective, title, description,
                  criteria_json, priority, time_to_impact, capex,
                  maladaptation_risk, created_at
           FROM activities WHERE session_id = ?1
           ORDER BY rowid",
        )?;
        let activities = stmt
          .query_map(rusqlite::params![session_str], |row| {
            Ok(RawActivity {
              activity_id:        row.get(0)?,
              session_id:         row.get(1)?,
              objective:          row.get(2)?,
              title:              row.get(3)?,
              description:        row.get(4)?,
              criteria_json:      row.get(5)?,
              priority:           row.get(6)?,
              time_to_impact:     row.get(7)?,
              capex:              row.get(8)?,
              maladaptation_risk: row.get(9)?,
              created_at:         row.get(10)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?
          .into_iter()
          .map(RawActivity::into_activity)
          .collect::<Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT participant_id, activity_id, session_id, score, priority,
                  comment, created_at, updated_at
           FROM votes WHERE session_id = ?1",
        )?;
        let votes = stmt
          .query_map(rusqlite::params![session_str], |row| {
            Ok(RawVote {
              participant_id: row.get(0)?,
              activity_id:    row.get(1)?,
              session_id:     row.get(2)?,
              score:          row.get(3)?,
              priority:       row.get(4)?,
              comment:        row.get(5)?,
              created_at:     row.get(6)?,
              updated_at:     row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?
          .into_iter()
          .map(RawVote::into_vote)
          .collect::<Result<Vec<_>>>()?;

        let mut by_activity: HashMap<Uuid, Vec<_>> = HashMap::new();
        for v in votes {
          by_activity.entry(v.activity_id).or_default().push(v);
        }

        Ok(
          activities
            .into_iter()
            .map(|a| {
              let votes =
                by_activity.remove(&a.activity_id).unwrap_or_default();
              (a, votes)
            })
            .collect::<Vec<_>>(),
        )
      })
      .await?;

    Ok(vote::rank(pairs))
  }

  async fn has_voted(
    &self,
    session_id: Uuid,
    participant_id: Uuid,
  ) -> Result<bool> {
    let session_str     = encode_uuid(session_id);
    let participant_str = encode_uuid(participant_id);

    self
      .call(move |conn| {
        let found: Option<bool> = conn
          .query_row(
            "SELECT 1 FROM votes
             WHERE session_id = ?1 AND participant_id = ?2
             LIMIT 1",
            rusqlite::params![session_str, participant_str],
            |_| Ok(true),
          )
          .optional()?;
        Ok(found.unwrap_or(false))
      })
      .await
  }
}
