//! [`SqliteStore`] — the SQLite implementation of [`MatchStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use unimatch_core::{
  interaction::{Action, Interaction},
  matching::{CanonicalPair, Match},
  profile::{Identity, NewProfile, Profile, ProfileUpdate},
  store::MatchStore,
};

use crate::{
  Result,
  encode::{PROFILE_COLUMNS, RawInteraction, RawMatch, RawProfile, encode_dt, encode_uuid, now},
  schema::{PRAGMAS, SCHEMA},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A unimatch store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Separate
/// stores opened on the same file behave like separate server processes.
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
        conn.execute_batch(PRAGMAS)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Number of match rows for `pair`; only ever 0 or 1 given the schema.
  pub async fn count_matches(&self, pair: &CanonicalPair) -> Result<u64> {
    let first = pair.first().to_string();
    let second = pair.second().to_string();

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM matches WHERE first = ?1 AND second = ?2",
          rusqlite::params![first, second],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count.unsigned_abs())
  }

  /// Number of ledger rows for the ordered pair `(actor, target)`.
  pub async fn count_interactions(
    &self,
    actor: &Identity,
    target: &Identity,
  ) -> Result<u64> {
    let actor = actor.to_string();
    let target = target.to_string();

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM interactions WHERE actor = ?1 AND target = ?2",
          rusqlite::params![actor, target],
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count.unsigned_abs())
  }

  /// Run a single-row `RETURNING`/`SELECT` statement over profile columns.
  async fn query_profile(
    &self,
    sql: String,
    params: Vec<rusqlite::types::Value>,
  ) -> Result<Option<Profile>> {
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &sql,
            rusqlite::params_from_iter(params),
            RawProfile::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }
}

// ─── MatchStore impl ─────────────────────────────────────────────────────────

impl MatchStore for SqliteStore {
  type Error = crate::Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn create_profile(&self, input: NewProfile) -> Result<Profile> {
    let profile = Profile {
      identity:    input.identity,
      email:       input.email,
      name:        input.name,
      age:         input.age,
      gender:      input.gender,
      hobby:       input.hobby,
      description: input.description,
      picture_id:  input.picture_id,
      is_active:   true,
      created_at:  now(),
    };

    let identity    = profile.identity.to_string();
    let email       = profile.email.clone();
    let name        = profile.name.clone();
    let age         = i64::from(profile.age);
    let gender      = profile.gender.as_ref().to_owned();
    let hobby       = profile.hobby.clone();
    let description = profile.description.clone();
    let picture_id  = profile.picture_id.clone();
    let created_at  = encode_dt(profile.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO profiles (
             identity, email, name, age, gender, hobby,
             description, picture_id, is_active, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9)",
          rusqlite::params![
            identity,
            email,
            name,
            age,
            gender,
            hobby,
            description,
            picture_id,
            created_at,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(profile)
  }

  async fn get_profile(&self, identity: &Identity) -> Result<Option<Profile>> {
    self
      .query_profile(
        format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE identity = ?1"),
        vec![identity.to_string().into()],
      )
      .await
  }

  async fn update_profile(
    &self,
    identity: &Identity,
    update: ProfileUpdate,
  ) -> Result<Option<Profile>> {
    use rusqlite::types::Value;

    self
      .query_profile(
        format!(
          "UPDATE profiles SET
             email       = ?2,
             name        = ?3,
             age         = ?4,
             gender      = ?5,
             hobby       = ?6,
             description = ?7,
             picture_id  = ?8,
             is_active   = COALESCE(?9, is_active)
           WHERE identity = ?1
           RETURNING {PROFILE_COLUMNS}"
        ),
        vec![
          identity.to_string().into(),
          update.email.into(),
          update.name.into(),
          i64::from(update.age).into(),
          update.gender.as_ref().to_owned().into(),
          update.hobby.into(),
          update.description.into(),
          update.picture_id.map_or(Value::Null, Value::Text),
          update.is_active.map_or(Value::Null, |a| Value::Integer(i64::from(a))),
        ],
      )
      .await
  }

  async fn delete_profile(&self, identity: &Identity) -> Result<Option<Profile>> {
    // Interactions and matches go with it through ON DELETE CASCADE.
    self
      .query_profile(
        format!("DELETE FROM profiles WHERE identity = ?1 RETURNING {PROFILE_COLUMNS}"),
        vec![identity.to_string().into()],
      )
      .await
  }

  async fn profile_exists(&self, identity: &Identity) -> Result<bool> {
    let id_str = identity.to_string();

    let exists = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM profiles WHERE identity = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false))
      })
      .await?;
    Ok(exists)
  }

  async fn is_active(&self, identity: &Identity) -> Result<bool> {
    let id_str = identity.to_string();

    let active: Option<bool> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT is_active FROM profiles WHERE identity = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;
    Ok(active.unwrap_or(false))
  }

  async fn random_candidate(&self, requester: &Identity) -> Result<Option<Profile>> {
    self
      .query_profile(
        format!(
          "SELECT {PROFILE_COLUMNS} FROM profiles p
           WHERE p.identity != ?1
             AND p.is_active = 1
             AND NOT EXISTS (
               SELECT 1 FROM interactions i
               WHERE i.actor = ?1 AND i.target = p.identity
             )
           ORDER BY RANDOM()
           LIMIT 1"
        ),
        vec![requester.to_string().into()],
      )
      .await
  }

  // ── Interaction ledger ────────────────────────────────────────────────────

  async fn upsert_interaction(
    &self,
    actor:  &Identity,
    target: &Identity,
    action: Action,
  ) -> Result<Interaction> {
    let actor_str  = actor.to_string();
    let target_str = target.to_string();
    let action_str = action.as_ref().to_owned();
    let at_str     = encode_dt(now());

    let raw: RawInteraction = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "INSERT INTO interactions (actor, target, action, updated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (actor, target) DO UPDATE SET
             action     = excluded.action,
             updated_at = excluded.updated_at
           RETURNING actor, target, action, updated_at",
          rusqlite::params![actor_str, target_str, action_str, at_str],
          RawInteraction::from_row,
        )?)
      })
      .await?;

    raw.into_interaction()
  }

  async fn find_interaction(
    &self,
    actor:  &Identity,
    target: &Identity,
  ) -> Result<Option<Interaction>> {
    let actor_str  = actor.to_string();
    let target_str = target.to_string();

    let raw: Option<RawInteraction> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT actor, target, action, updated_at FROM interactions
             WHERE actor = ?1 AND target = ?2",
            rusqlite::params![actor_str, target_str],
            RawInteraction::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawInteraction::into_interaction).transpose()
  }

  // ── Matches ───────────────────────────────────────────────────────────────

  async fn find_match(&self, pair: &CanonicalPair) -> Result<Option<Match>> {
    let first  = pair.first().to_string();
    let second = pair.second().to_string();

    let raw: Option<RawMatch> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT match_id, first, second, created_at FROM matches
             WHERE first = ?1 AND second = ?2",
            rusqlite::params![first, second],
            RawMatch::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawMatch::into_match).transpose()
  }

  async fn insert_match(&self, pair: &CanonicalPair) -> Result<Match> {
    let created = Match {
      match_id:   Uuid::new_v4(),
      first:      pair.first().clone(),
      second:     pair.second().clone(),
      created_at: now(),
    };

    let id_str = encode_uuid(created.match_id);
    let first  = created.first.to_string();
    let second = created.second.to_string();
    let at_str = encode_dt(created.created_at);

    // A duplicate pair fails on UNIQUE (first, second); the engine treats
    // that as a lost race, see `Error::is_conflict`.
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO matches (match_id, first, second, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, first, second, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(created)
  }

  async fn matches_for(&self, identity: &Identity) -> Result<Vec<Match>> {
    let id_str = identity.to_string();

    let raws: Vec<RawMatch> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT match_id, first, second, created_at FROM matches
           WHERE first = ?1 OR second = ?1
           ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], RawMatch::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMatch::into_match).collect()
  }
}
