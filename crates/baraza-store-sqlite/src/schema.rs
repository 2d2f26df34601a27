//! SQL schema for the baraza SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id        TEXT PRIMARY KEY,
    name           TEXT NOT NULL,
    email          TEXT NOT NULL UNIQUE,  -- stored lower-cased
    organization   TEXT,
    role           TEXT NOT NULL,         -- 'admin' | 'facilitator' | 'participant'
    password_hash  TEXT NOT NULL,         -- argon2 PHC string
    created_at     TEXT NOT NULL,
    last_active_at TEXT
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id            TEXT PRIMARY KEY,
    title                 TEXT NOT NULL,
    description           TEXT NOT NULL DEFAULT '',
    scheduled_date        TEXT NOT NULL,  -- YYYY-MM-DD
    scheduled_time        TEXT NOT NULL,  -- HH:MM:SS
    duration_hours        INTEGER NOT NULL DEFAULT 2,
    province              TEXT,
    district              TEXT,
    venue                 TEXT,
    virtual_link          TEXT,
    kind                  TEXT NOT NULL,  -- 'in_person' | 'virtual' | 'hybrid'
    state                 TEXT NOT NULL,  -- 'scheduled' | 'in_progress' | 'concluded' | 'cancelled'
    facilitator_id        TEXT NOT NULL REFERENCES users(user_id),
    expected_participants INTEGER NOT NULL DEFAULT 20,
    notes                 TEXT,
    pin                   TEXT NOT NULL,
    created_at            TEXT NOT NULL
);

-- A terminal session releases its PIN for reuse; uniqueness only holds
-- among sessions still accepting joins.
CREATE UNIQUE INDEX IF NOT EXISTS sessions_active_pin_idx
    ON sessions(pin) WHERE state IN ('scheduled', 'in_progress');

-- Candidate activities are written once at session creation; ballot order
-- is the insertion order (rowid).
CREATE TABLE IF NOT EXISTS activities (
    activity_id        TEXT PRIMARY KEY,
    session_id         TEXT NOT NULL REFERENCES sessions(session_id),
    objective          TEXT NOT NULL,
    title              TEXT NOT NULL,
    description        TEXT NOT NULL DEFAULT '',
    criteria_json      TEXT NOT NULL DEFAULT '{}',  -- open map, key -> number
    priority           TEXT NOT NULL,
    time_to_impact     TEXT NOT NULL,
    capex              TEXT NOT NULL,
    maladaptation_risk TEXT NOT NULL,
    created_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS enrollments (
    session_id        TEXT NOT NULL REFERENCES sessions(session_id),
    participant_id    TEXT NOT NULL REFERENCES users(user_id),
    status            TEXT NOT NULL,     -- 'pending' | 'confirmed' | 'cancelled'
    joined_at         TEXT NOT NULL,
    training_progress INTEGER NOT NULL DEFAULT 0,
    quiz_completed    INTEGER NOT NULL DEFAULT 0,
    quiz_passed       INTEGER NOT NULL DEFAULT 0,
    voting_completed  INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (session_id, participant_id)
);

CREATE TABLE IF NOT EXISTS quiz_questions (
    question_id    TEXT PRIMARY KEY,
    session_id     TEXT REFERENCES sessions(session_id),  -- NULL = shared bank
    module         TEXT NOT NULL DEFAULT 'general',
    prompt         TEXT NOT NULL,
    options_json   TEXT NOT NULL,  -- option key -> option text
    correct_option TEXT NOT NULL,
    explanation    TEXT,
    active         INTEGER NOT NULL DEFAULT 1
);

-- Append-only: one row per attempt, never updated.
CREATE TABLE IF NOT EXISTS quiz_results (
    result_id       TEXT PRIMARY KEY,
    participant_id  TEXT NOT NULL REFERENCES users(user_id),
    session_id      TEXT NOT NULL REFERENCES sessions(session_id),
    score_percent   REAL NOT NULL,
    passed          INTEGER NOT NULL,
    total_questions INTEGER NOT NULL,
    correct_answers INTEGER NOT NULL,
    breakdown_json  TEXT NOT NULL DEFAULT '[]',
    completed_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS votes (
    vote_id        TEXT PRIMARY KEY,
    participant_id TEXT NOT NULL REFERENCES users(user_id),
    activity_id    TEXT NOT NULL REFERENCES activities(activity_id),
    session_id     TEXT NOT NULL REFERENCES sessions(session_id),
    score          INTEGER NOT NULL,
    priority       INTEGER NOT NULL,
    comment        TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (participant_id, activity_id, session_id)
);

CREATE INDEX IF NOT EXISTS activities_session_idx   ON activities(session_id);
CREATE INDEX IF NOT EXISTS enrollments_user_idx     ON enrollments(participant_id);
CREATE INDEX IF NOT EXISTS questions_session_idx    ON quiz_questions(session_id);
CREATE INDEX IF NOT EXISTS results_participant_idx  ON quiz_results(participant_id, completed_at);
CREATE INDEX IF NOT EXISTS votes_session_idx        ON votes(session_id);

PRAGMA user_version = 1;
";
