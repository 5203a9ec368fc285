//! `MatchEngine` behaviour on the SQLite backend: ledger rules, exactly-once
//! match formation (including lost races and retries), and match queries.

use std::sync::{Arc, atomic::Ordering};

use unimatch_core::{
  Error, ErrorKind,
  engine::MatchEngine,
  interaction::Action,
  matching::{CanonicalPair, MatchOutcome},
  profile::ProfileUpdate,
  store::MatchStore,
};

use super::support::{Faulty, engine_with, id, new_profile, store};
use crate::SqliteStore;

fn pair(a: &str, b: &str) -> CanonicalPair {
  CanonicalPair::new(id(a), id(b)).unwrap()
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn recording_twice_keeps_one_row_with_latest_timestamp() {
  let engine = engine_with(&["alice", "bob"]).await;

  let first = engine
    .record_action(&id("alice"), &id("bob"), Action::Like)
    .await
    .unwrap();
  let second = engine
    .record_action(&id("alice"), &id("bob"), Action::Like)
    .await
    .unwrap();

  assert!(second.updated_at >= first.updated_at);
  let store = engine.store();
  assert_eq!(store.count_interactions(&id("alice"), &id("bob")).await.unwrap(), 1);
}

#[tokio::test]
async fn self_like_is_rejected_without_side_effects() {
  let engine = engine_with(&["alice"]).await;

  let err = engine.process_like(&id("alice"), &id("alice")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let store = engine.store();
  assert_eq!(store.count_interactions(&id("alice"), &id("alice")).await.unwrap(), 0);
  assert!(store.matches_for(&id("alice")).await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_actor_or_target_is_not_found() {
  let engine = engine_with(&["alice"]).await;

  let err = engine.process_like(&id("alice"), &id("ghost")).await.unwrap_err();
  assert!(matches!(err, Error::ProfileNotFound(ref who) if who == &id("ghost")));

  let err = engine.process_like(&id("ghost"), &id("alice")).await.unwrap_err();
  assert!(matches!(err, Error::ProfileNotFound(ref who) if who == &id("ghost")));
}

#[tokio::test]
async fn deactivated_profiles_can_still_be_liked_and_matched() {
  let engine = engine_with(&["alice", "bob"]).await;

  let bob = engine.profile(&id("bob")).await.unwrap();
  let mut update = ProfileUpdate::from(&bob);
  update.is_active = Some(false);
  engine.update_profile(&id("bob"), update).await.unwrap();

  let first = engine.process_like(&id("bob"), &id("alice")).await.unwrap();
  assert_eq!(first, MatchOutcome::NoMatch);
  let second = engine.process_like(&id("alice"), &id("bob")).await.unwrap();
  assert!(matches!(second, MatchOutcome::MatchCreated(_)));
  assert_eq!(engine.store().count_matches(&pair("alice", "bob")).await.unwrap(), 1);
}

// ─── Match formation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn first_like_alone_never_matches() {
  let engine = engine_with(&["alice", "bob"]).await;

  let outcome = engine.process_like(&id("alice"), &id("bob")).await.unwrap();
  assert_eq!(outcome, MatchOutcome::NoMatch);
  assert_eq!(engine.store().count_matches(&pair("alice", "bob")).await.unwrap(), 0);
}

#[tokio::test]
async fn mutual_like_creates_exactly_one_match() {
  let engine = engine_with(&["alice", "bob"]).await;

  engine.process_like(&id("alice"), &id("bob")).await.unwrap();
  let created = engine.process_like(&id("bob"), &id("alice")).await.unwrap();
  let MatchOutcome::MatchCreated(m) = created else {
    panic!("expected MatchCreated, got {created:?}");
  };
  let stored = engine.store().find_match(&pair("alice", "bob")).await.unwrap();
  assert_eq!(stored.as_ref(), Some(&m), "returned match must equal the stored row");

  for (a, b) in [("alice", "bob"), ("bob", "alice"), ("alice", "bob")] {
    let again = engine.process_like(&id(a), &id(b)).await.unwrap();
    assert_eq!(again, MatchOutcome::MatchAlreadyExisted(m.clone()));
  }
  assert_eq!(engine.store().count_matches(&pair("alice", "bob")).await.unwrap(), 1);
}

#[tokio::test]
async fn match_orientation_is_canonical_in_both_orders() {
  let forward = engine_with(&["alice", "bob"]).await;
  forward.process_like(&id("alice"), &id("bob")).await.unwrap();
  let f = forward.process_like(&id("bob"), &id("alice")).await.unwrap();

  let backward = engine_with(&["alice", "bob"]).await;
  backward.process_like(&id("bob"), &id("alice")).await.unwrap();
  let b = backward.process_like(&id("alice"), &id("bob")).await.unwrap();

  let (f, b) = (f.matched().unwrap(), b.matched().unwrap());
  assert_eq!((&f.first, &f.second), (&id("alice"), &id("bob")));
  assert_eq!((&b.first, &b.second), (&f.first, &f.second));
}

#[tokio::test]
async fn dislikes_never_match() {
  let engine = engine_with(&["alice", "bob"]).await;

  let outcomes = [
    engine.process_action(&id("alice"), &id("bob"), Action::Like).await.unwrap(),
    engine.process_action(&id("bob"), &id("alice"), Action::Dislike).await.unwrap(),
    engine.process_action(&id("alice"), &id("bob"), Action::Like).await.unwrap(),
  ];
  assert!(outcomes.iter().all(|o| *o == MatchOutcome::NoMatch));
  assert_eq!(engine.store().count_matches(&pair("alice", "bob")).await.unwrap(), 0);
}

#[tokio::test]
async fn changing_dislike_to_like_matches() {
  let engine = engine_with(&["alice", "bob"]).await;

  engine.process_action(&id("alice"), &id("bob"), Action::Dislike).await.unwrap();
  engine.process_like(&id("bob"), &id("alice")).await.unwrap();
  let outcome = engine.process_like(&id("alice"), &id("bob")).await.unwrap();
  assert!(matches!(outcome, MatchOutcome::MatchCreated(_)));
}

#[tokio::test]
async fn lost_insert_race_returns_the_winner() {
  let inner = store().await;
  let plain = MatchEngine::new(inner.clone());
  for name in ["alice", "bob"] {
    plain.register(new_profile(name)).await.unwrap();
  }
  plain.process_like(&id("alice"), &id("bob")).await.unwrap();
  let MatchOutcome::MatchCreated(winner) =
    plain.process_like(&id("bob"), &id("alice")).await.unwrap()
  else {
    panic!("expected the first engine to create the match");
  };

  // This engine's lookup misses the row, as if it ran just before the
  // winner committed, so its insert hits the uniqueness constraint.
  let faulty = Faulty::new(inner.clone());
  faulty.blind_lookups.store(1, Ordering::SeqCst);
  let racing = MatchEngine::new(faulty);

  let outcome = racing.process_like(&id("alice"), &id("bob")).await.unwrap();
  assert!(racing.store().saw_conflict.load(Ordering::SeqCst));
  assert_eq!(outcome, MatchOutcome::MatchAlreadyExisted(winner));
  assert_eq!(inner.count_matches(&pair("alice", "bob")).await.unwrap(), 1);
}

#[tokio::test]
async fn transient_insert_failure_is_retried_once() {
  let inner = store().await;
  let faulty = Faulty::new(inner.clone());
  faulty.failing_inserts.store(1, Ordering::SeqCst);
  let engine = MatchEngine::new(faulty);
  for name in ["alice", "bob"] {
    engine.register(new_profile(name)).await.unwrap();
  }

  engine.process_like(&id("alice"), &id("bob")).await.unwrap();
  let outcome = engine.process_like(&id("bob"), &id("alice")).await.unwrap();
  assert!(matches!(outcome, MatchOutcome::MatchCreated(_)), "{outcome:?}");
  assert_eq!(inner.count_matches(&pair("alice", "bob")).await.unwrap(), 1);
}

#[tokio::test]
async fn persistent_insert_failure_surfaces_as_storage_error() {
  let inner = store().await;
  let faulty = Faulty::new(inner.clone());
  let engine = MatchEngine::new(faulty);
  for name in ["alice", "bob"] {
    engine.register(new_profile(name)).await.unwrap();
  }
  engine.process_like(&id("alice"), &id("bob")).await.unwrap();

  engine.store().failing_inserts.store(2, Ordering::SeqCst);
  let err = engine.process_like(&id("bob"), &id("alice")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Storage);
  assert_eq!(engine.store().failing_inserts.load(Ordering::SeqCst), 0);

  // The like itself is durable, and retrying the call completes the match.
  let like = inner.find_interaction(&id("bob"), &id("alice")).await.unwrap();
  assert_eq!(like.map(|i| i.action), Some(Action::Like));
  let outcome = engine.process_like(&id("bob"), &id("alice")).await.unwrap();
  assert!(matches!(outcome, MatchOutcome::MatchCreated(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_mutual_likes_create_one_match_per_pair() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("race.db");

  // Two stores on one file stand in for two server processes.
  let left = MatchEngine::new(SqliteStore::open(&path).await.unwrap());
  let right = MatchEngine::new(SqliteStore::open(&path).await.unwrap());

  const PAIRS: usize = 16;
  for i in 0..PAIRS {
    left.register(new_profile(&format!("a{i}"))).await.unwrap();
    left.register(new_profile(&format!("b{i}"))).await.unwrap();
  }

  let mut handles = Vec::new();
  for i in 0..PAIRS {
    let (a, b) = (id(&format!("a{i}")), id(&format!("b{i}")));
    // Both directions race, each through a different "process".
    for (engine, actor, target) in [
      (left.clone(), a.clone(), b.clone()),
      (right.clone(), b.clone(), a.clone()),
    ] {
      handles.push(tokio::spawn(async move {
        let outcome = engine.process_like(&actor, &target).await.unwrap();
        (CanonicalPair::new(actor, target).unwrap(), outcome)
      }));
    }
  }

  let mut results = Vec::new();
  for h in handles {
    results.push(h.await.unwrap());
  }

  for i in 0..PAIRS {
    let key = pair(&format!("a{i}"), &format!("b{i}"));
    assert_eq!(left.store().count_matches(&key).await.unwrap(), 1, "pair {key}");

    let outcomes: Vec<_> = results
      .iter()
      .filter(|(p, _)| p == &key)
      .map(|(_, o)| o)
      .collect();
    let created = outcomes
      .iter()
      .filter(|o| matches!(o, MatchOutcome::MatchCreated(_)))
      .count();
    assert_eq!(created, 1, "pair {key}: {outcomes:?}");

    // Whoever observed the match saw the same row.
    let ids: Vec<_> = outcomes.iter().filter_map(|o| o.matched()).map(|m| m.match_id).collect();
    assert!(ids.windows(2).all(|w| w[0] == w[1]), "pair {key}: {ids:?}");
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn scenario_like_match_relike_and_list() {
  let engine = engine_with(&["alice", "bob"]).await;

  let o1 = engine.process_like(&id("alice"), &id("bob")).await.unwrap();
  assert_eq!(o1, MatchOutcome::NoMatch);

  let o2 = engine.process_like(&id("bob"), &id("alice")).await.unwrap();
  let MatchOutcome::MatchCreated(m) = o2 else { panic!("expected a match") };
  assert_eq!(m.pair(), pair("alice", "bob"));

  let o3 = engine.process_like(&id("alice"), &id("bob")).await.unwrap();
  let MatchOutcome::MatchAlreadyExisted(same) = o3 else { panic!("expected existing") };
  assert_eq!(same.match_id, m.match_id);

  let listed = engine.list_matches(&id("alice")).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].match_id, m.match_id);
  assert_eq!(listed[0].matched_at, m.created_at);
  assert_eq!(listed[0].partner.identity, id("bob"));

  let from_bob = engine.list_matches(&id("bob")).await.unwrap();
  assert_eq!(from_bob[0].partner.identity, id("alice"));
}

#[tokio::test]
async fn list_matches_is_newest_first() {
  let engine = engine_with(&["alice", "bob", "carol"]).await;

  for other in ["bob", "carol"] {
    engine.process_like(&id("alice"), &id(other)).await.unwrap();
    engine.process_like(&id(other), &id("alice")).await.unwrap();
  }

  let partners: Vec<_> = engine
    .list_matches(&id("alice"))
    .await
    .unwrap()
    .into_iter()
    .map(|v| v.partner.identity)
    .collect();
  assert_eq!(partners, vec![id("carol"), id("bob")]);
}

#[tokio::test]
async fn list_matches_reflects_partner_edits() {
  let engine = engine_with(&["alice", "bob"]).await;
  engine.process_like(&id("alice"), &id("bob")).await.unwrap();
  engine.process_like(&id("bob"), &id("alice")).await.unwrap();

  let bob = engine.profile(&id("bob")).await.unwrap();
  let mut update = ProfileUpdate::from(&bob);
  update.description = "new bio".into();
  engine.update_profile(&id("bob"), update).await.unwrap();

  let listed = engine.list_matches(&id("alice")).await.unwrap();
  assert_eq!(listed[0].partner.description, "new bio");
}

#[tokio::test]
async fn list_matches_for_unknown_identity_is_not_found() {
  let engine = engine_with(&[]).await;
  let err = engine.list_matches(&id("ghost")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn missing_partner_is_omitted_not_an_error() {
  let inner = store().await;
  let engine = MatchEngine::new(Faulty::new(inner));
  for name in ["alice", "bob", "carol"] {
    engine.register(new_profile(name)).await.unwrap();
  }
  for other in ["bob", "carol"] {
    engine.process_like(&id("alice"), &id(other)).await.unwrap();
    engine.process_like(&id(other), &id("alice")).await.unwrap();
  }

  // bob's profile vanishes while his match row is still visible.
  engine.store().hidden.lock().unwrap().push(id("bob"));

  let listed = engine.list_matches(&id("alice")).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].partner.identity, id("carol"));
}

#[tokio::test]
async fn deleting_a_partner_drops_the_match() {
  let engine = engine_with(&["alice", "bob"]).await;
  engine.process_like(&id("alice"), &id("bob")).await.unwrap();
  engine.process_like(&id("bob"), &id("alice")).await.unwrap();

  engine.delete_profile(&id("bob")).await.unwrap();
  assert!(engine.list_matches(&id("alice")).await.unwrap().is_empty());

  // Re-registering the same handle starts from a clean slate.
  engine.register(new_profile("bob")).await.unwrap();
  assert!(engine.list_matches(&id("alice")).await.unwrap().is_empty());
  let outcome = engine.process_like(&id("alice"), &id("bob")).await.unwrap();
  assert_eq!(outcome, MatchOutcome::NoMatch);
}

// ─── Profiles and candidates ─────────────────────────────────────────────────

#[tokio::test]
async fn register_validates_and_reports_conflicts() {
  let engine = engine_with(&["alice"]).await;

  let mut too_young = new_profile("bob");
  too_young.age = 12;
  assert_eq!(engine.register(too_young).await.unwrap_err().kind(), ErrorKind::Validation);

  let err = engine.register(new_profile("alice")).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn pick_candidate_walks_until_exhausted() {
  let engine = engine_with(&["alice", "bob", "carol"]).await;

  let mut seen = Vec::new();
  for _ in 0..2 {
    let candidate = engine.pick_candidate(&id("alice")).await.unwrap();
    assert_ne!(candidate.identity, id("alice"));
    engine
      .process_action(&id("alice"), &candidate.identity, Action::Dislike)
      .await
      .unwrap();
    seen.push(candidate.identity);
  }
  seen.sort();
  assert_eq!(seen, vec![id("bob"), id("carol")]);

  let err = engine.pick_candidate(&id("alice")).await.unwrap_err();
  assert!(matches!(err, Error::NoCandidates(_)));
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn pick_candidate_for_unregistered_requester_is_not_found() {
  let engine = engine_with(&["bob"]).await;
  let err = engine.pick_candidate(&id("ghost")).await.unwrap_err();
  assert!(matches!(err, Error::ProfileNotFound(_)));
}

#[tokio::test]
async fn shared_engine_is_usable_across_tasks() {
  let engine = Arc::new(engine_with(&["alice", "bob"]).await);
  let e = engine.clone();
  tokio::spawn(async move { e.process_like(&id("alice"), &id("bob")).await.unwrap() })
    .await
    .unwrap();
  let outcome = engine.process_like(&id("bob"), &id("alice")).await.unwrap();
  assert!(outcome.is_match());
}
