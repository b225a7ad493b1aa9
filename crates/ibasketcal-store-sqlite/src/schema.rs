//! SQL schema for the SQLite store.
//!
//! Executed once at connection startup; idempotent thanks to
//! `CREATE TABLE IF NOT EXISTS`. The index set covers every filterable
//! match dimension so `find_matches` stays O(log N + k) at the typical
//! working set of ~10⁵ matches.

/// Full schema DDL, shared verbatim with the edge-SQL backend.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS metadata (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS seasons (
    id         TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    start_date TEXT,
    end_date   TEXT,
    raw        TEXT NOT NULL     -- upstream JSON, verbatim
);

CREATE TABLE IF NOT EXISTS competitions (
    id        TEXT PRIMARY KEY,
    season_id TEXT NOT NULL,
    name      TEXT NOT NULL,
    raw       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS groups (
    id             TEXT PRIMARY KEY,
    competition_id TEXT NOT NULL,
    season_id      TEXT NOT NULL,
    name           TEXT NOT NULL,
    kind           TEXT,          -- 'LEAGUE' | 'PLAYOFF' | ...
    raw            TEXT NOT NULL
);

-- Competition and group names are denormalised onto each match so name
-- filters never need a join.
CREATE TABLE IF NOT EXISTS matches (
    id               TEXT PRIMARY KEY,
    season_id        TEXT NOT NULL,
    competition_id   TEXT,
    competition_name TEXT NOT NULL,
    group_id         TEXT NOT NULL,
    group_name       TEXT NOT NULL,
    home_team_id     TEXT,
    home_team_name   TEXT,
    away_team_id     TEXT,
    away_team_name   TEXT,
    date             TEXT NOT NULL,  -- RFC 3339 UTC; sorts chronologically
    status           TEXT NOT NULL,
    home_score       INTEGER,
    away_score       INTEGER,
    venue            TEXT,
    venue_address    TEXT,
    raw              TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS teams (
    id       TEXT PRIMARY KEY,
    name     TEXT NOT NULL,
    logo_url TEXT
);

CREATE TABLE IF NOT EXISTS standings (
    group_id TEXT NOT NULL,
    team_id  TEXT NOT NULL,
    position INTEGER,
    raw      TEXT NOT NULL,
    PRIMARY KEY (group_id, team_id)
);

CREATE INDEX IF NOT EXISTS matches_season_idx    ON matches(season_id);
CREATE INDEX IF NOT EXISTS matches_group_idx     ON matches(group_id);
CREATE INDEX IF NOT EXISTS matches_comp_name_idx ON matches(competition_name);
CREATE INDEX IF NOT EXISTS matches_date_idx      ON matches(date);
CREATE INDEX IF NOT EXISTS matches_status_idx    ON matches(status);
CREATE INDEX IF NOT EXISTS matches_home_id_idx   ON matches(home_team_id);
CREATE INDEX IF NOT EXISTS matches_away_id_idx   ON matches(away_team_id);
CREATE INDEX IF NOT EXISTS matches_home_name_idx ON matches(home_team_name);
CREATE INDEX IF NOT EXISTS matches_away_name_idx ON matches(away_team_name);
CREATE INDEX IF NOT EXISTS groups_comp_idx       ON groups(competition_id);
CREATE INDEX IF NOT EXISTS groups_season_idx     ON groups(season_id);
CREATE INDEX IF NOT EXISTS competitions_season_idx ON competitions(season_id);
";
