use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use pickem_common::{GameStatus, GameUpdate, NewPick, PickStatus};
use server::db::codec::item_key;
use server::db::keys::Keys;
use server::db::memory::MemoryStore;
use server::db::{Index, Item, PrimaryKey, Query, ScanFilter, StorageClient};
use server::{Database, Error, leaderboard, scoring};
use tokio::sync::Notify;

mod common;
use common::{Fixture, final_score, failing_db, seed_user};

const CONCURRENCY: usize = 4;

/// Holds the first put or delete of `gated` until a game-picks query has
/// returned, so the scoring pass lists picks while that write is in flight.
struct HeldWrite {
    inner: Arc<MemoryStore>,
    gated: Mutex<Option<PrimaryKey>>,
    entered: Notify,
    listed: Notify,
}

impl HeldWrite {
    fn new(inner: Arc<MemoryStore>, gated: PrimaryKey) -> Self {
        Self {
            inner,
            gated: Mutex::new(Some(gated)),
            entered: Notify::new(),
            listed: Notify::new(),
        }
    }

    async fn hold(&self, key: Option<PrimaryKey>) {
        let held = {
            let mut gated = self.gated.lock().unwrap();
            if gated.is_some() && key == *gated {
                gated.take()
            } else {
                None
            }
        };
        if held.is_some() {
            self.entered.notify_one();
            self.listed.notified().await;
        }
    }
}

#[async_trait]
impl StorageClient for HeldWrite {
    async fn get(&self, table: &str, key: &PrimaryKey) -> server::Result<Option<Item>> {
        self.inner.get(table, key).await
    }

    async fn put(&self, table: &str, item: Item) -> server::Result<()> {
        self.hold(item_key(&item)).await;
        self.inner.put(table, item).await
    }

    async fn put_if_absent(&self, table: &str, item: Item) -> server::Result<()> {
        self.inner.put_if_absent(table, item).await
    }

    async fn delete(&self, table: &str, key: &PrimaryKey) -> server::Result<()> {
        self.hold(Some(key.clone())).await;
        self.inner.delete(table, key).await
    }

    async fn query(&self, table: &str, query: &Query) -> server::Result<Vec<Item>> {
        let items = self.inner.query(table, query).await?;
        if query.index == Some(Index::Gsi3) {
            self.listed.notify_one();
        }
        Ok(items)
    }

    async fn scan(&self, table: &str, filter: Option<&ScanFilter>) -> server::Result<Vec<Item>> {
        self.inner.scan(table, filter).await
    }
}

async fn pick(db: &Database, user_id: &str, game_id: &str, team_id: &str) -> Result<()> {
    db.submit_pick(
        user_id,
        NewPick {
            game_id: game_id.to_string(),
            picked_team_id: team_id.to_string(),
            confidence: None,
        },
    )
    .await?;
    Ok(())
}

#[tokio::test]
async fn test_completing_a_game_scores_every_pick() -> Result<()> {
    let fx = Fixture::new().await?;
    let alice = seed_user(&fx.db, "alice").await?;
    let bob = seed_user(&fx.db, "bob").await?;
    let carol = seed_user(&fx.db, "carol").await?;
    pick(&fx.db, &alice.id, &fx.game.id, &fx.home.id).await?;
    pick(&fx.db, &bob.id, &fx.game.id, &fx.away.id).await?;
    pick(&fx.db, &carol.id, &fx.game.id, &fx.home.id).await?;

    let recorded = scoring::record_result(&fx.db, &fx.game.id, &final_score(24, 10), CONCURRENCY)
        .await?;
    assert_eq!(recorded.game.status, GameStatus::Completed);
    assert_eq!(recorded.game.winner_team_id(), Some(fx.home.id.as_str()));
    let report = recorded.scoring.ok_or_else(|| anyhow!("game was not scored"))?;
    assert_eq!(report.scored, 3);
    assert_eq!(report.failed, 0);

    for (user, correct, points) in [(&alice, true, 1), (&bob, false, 0), (&carol, true, 1)] {
        let stored = fx.db.get_pick(&user.id, &fx.game.id).await?;
        assert_eq!(stored.status, PickStatus::Scored);
        assert_eq!(stored.is_correct, Some(correct), "{}", user.username);
        assert_eq!(stored.points_earned, points, "{}", user.username);
    }

    let standings = leaderboard::week(&fx.db, &fx.league.id, 1).await?;
    assert_eq!(standings.len(), 3);
    assert_eq!(standings[2].user_id, bob.id);
    assert_eq!(standings[2].total_points, 0);
    assert_eq!(standings[2].username, "bob");

    // A complete pass refreshes the cached week
    let cached = leaderboard::cached_week(&fx.db, 1, Some(&fx.league.id)).await?;
    assert_eq!(cached, standings);
    Ok(())
}

#[tokio::test]
async fn test_scoring_twice_changes_nothing() -> Result<()> {
    let fx = Fixture::new().await?;
    let alice = seed_user(&fx.db, "alice").await?;
    let bob = seed_user(&fx.db, "bob").await?;
    pick(&fx.db, &alice.id, &fx.game.id, &fx.home.id).await?;
    pick(&fx.db, &bob.id, &fx.game.id, &fx.away.id).await?;

    scoring::record_result(&fx.db, &fx.game.id, &final_score(3, 0), CONCURRENCY).await?;
    let before = fx.db.list_picks_for_game(&fx.game.id).await?;

    let report = scoring::rescore_game(&fx.db, &fx.game.id, CONCURRENCY).await?;
    assert_eq!(report.scored, 0);
    assert_eq!(report.unchanged, 2);
    assert_eq!(fx.db.list_picks_for_game(&fx.game.id).await?, before);

    let alice_standing = leaderboard::user(&fx.db, &alice.id, None).await?;
    assert_eq!(alice_standing.total_points, 1);
    assert_eq!(alice_standing.total_picks, 1);
    Ok(())
}

#[tokio::test]
async fn test_score_edit_without_winner_change_skips_scoring() -> Result<()> {
    let fx = Fixture::new().await?;
    scoring::record_result(&fx.db, &fx.game.id, &final_score(24, 10), CONCURRENCY).await?;

    let recorded = scoring::record_result(&fx.db, &fx.game.id, &final_score(27, 10), CONCURRENCY)
        .await?;
    assert!(recorded.scoring.is_none());
    assert_eq!(recorded.game.home_score, Some(27));
    Ok(())
}

#[tokio::test]
async fn test_corrected_winner_rescored() -> Result<()> {
    let fx = Fixture::new().await?;
    let alice = seed_user(&fx.db, "alice").await?;
    let bob = seed_user(&fx.db, "bob").await?;
    pick(&fx.db, &alice.id, &fx.game.id, &fx.home.id).await?;
    pick(&fx.db, &bob.id, &fx.game.id, &fx.away.id).await?;

    scoring::record_result(&fx.db, &fx.game.id, &final_score(24, 10), CONCURRENCY).await?;
    let recorded = scoring::record_result(&fx.db, &fx.game.id, &final_score(10, 24), CONCURRENCY)
        .await?;
    let report = recorded.scoring.ok_or_else(|| anyhow!("winner change was not rescored"))?;
    assert_eq!(report.scored, 2);

    // Outcomes are replaced, never accumulated
    assert_eq!(fx.db.get_pick(&alice.id, &fx.game.id).await?.points_earned, 0);
    assert_eq!(fx.db.get_pick(&bob.id, &fx.game.id).await?.points_earned, 1);
    let standings = leaderboard::week(&fx.db, &fx.league.id, 1).await?;
    assert_eq!(standings[0].user_id, bob.id);
    Ok(())
}

#[tokio::test]
async fn test_partial_failure_resumes_on_rescore() -> Result<()> {
    let fx = Fixture::new().await?;
    let (league, home, away, game) = (&fx.league, &fx.home, &fx.away, &fx.game);
    let alice = seed_user(&fx.db, "alice").await?;
    let bob = seed_user(&fx.db, "bob").await?;
    let carol = seed_user(&fx.db, "carol").await?;
    pick(&fx.db, &alice.id, &game.id, &home.id).await?;
    pick(&fx.db, &bob.id, &game.id, &away.id).await?;
    pick(&fx.db, &carol.id, &game.id, &away.id).await?;

    let (store, db) = failing_db(&fx.store);
    store.block(Keys::pick(&bob.id, &game.id));
    store.set_failing(true);
    let recorded = scoring::record_result(&db, &game.id, &final_score(7, 14), CONCURRENCY).await?;
    let report = recorded.scoring.ok_or_else(|| anyhow!("game was not scored"))?;
    assert_eq!(report.scored, 2);
    assert_eq!(report.failed, 1);
    assert!(!report.is_complete());
    assert_eq!(db.get_pick(&bob.id, &game.id).await?.status, PickStatus::Pending);
    // Incomplete passes leave the cache alone
    assert!(leaderboard::cached_week(&db, 1, Some(&league.id)).await?.is_empty());

    store.set_failing(false);
    let report = scoring::rescore_game(&db, &game.id, CONCURRENCY).await?;
    assert_eq!(report.scored, 1);
    assert_eq!(report.unchanged, 2);
    assert!(report.is_complete());

    let bob_pick = db.get_pick(&bob.id, &game.id).await?;
    assert_eq!(bob_pick.is_correct, Some(true));
    assert_eq!(leaderboard::cached_week(&db, 1, Some(&league.id)).await?.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_rejected_edits_leave_game_untouched() -> Result<()> {
    let fx = Fixture::new().await?;

    let err = scoring::record_result(&fx.db, &fx.game.id, &final_score(14, 14), CONCURRENCY)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }), "got {:?}", err);
    assert_eq!(fx.db.get_game(&fx.game.id).await?.status, GameStatus::Pending);

    let missing_score = GameUpdate {
        status: Some(GameStatus::Completed),
        home_score: Some(3),
        away_score: None,
    };
    let err = scoring::record_result(&fx.db, &fx.game.id, &missing_score, CONCURRENCY)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { ref field, .. } if field == "away_score"));

    scoring::record_result(&fx.db, &fx.game.id, &final_score(14, 7), CONCURRENCY).await?;
    let reopen = GameUpdate {
        status: Some(GameStatus::InProgress),
        ..Default::default()
    };
    let err = scoring::record_result(&fx.db, &fx.game.id, &reopen, CONCURRENCY)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { ref field, .. } if field == "status"));
    assert_eq!(fx.db.get_game(&fx.game.id).await?.status, GameStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn test_scoring_requires_completed_game() -> Result<()> {
    let fx = Fixture::new().await?;
    let err = scoring::rescore_game(&fx.db, &fx.game.id, CONCURRENCY)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));

    let err = scoring::rescore_game(&fx.db, "missing", CONCURRENCY)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn test_pick_changed_during_scoring_keeps_the_change() -> Result<()> {
    let fx = Fixture::new().await?;
    let alice = seed_user(&fx.db, "alice").await?;
    pick(&fx.db, &alice.id, &fx.game.id, &fx.home.id).await?;

    let store = Arc::new(HeldWrite::new(
        fx.store.clone(),
        Keys::pick(&alice.id, &fx.game.id),
    ));
    let db = Database::new(store.clone(), common::TABLE);

    // The change passes its open-game check, then stalls on its write
    let change = tokio::spawn({
        let db = db.clone();
        let (user_id, game_id, away_id) = (alice.id.clone(), fx.game.id.clone(), fx.away.id.clone());
        async move { db.change_pick(&user_id, &game_id, &away_id, None).await }
    });
    store.entered.notified().await;

    let recorded = scoring::record_result(&db, &fx.game.id, &final_score(21, 14), CONCURRENCY).await?;
    let changed = change.await??;
    assert_eq!(changed.picked_team_id, fx.away.id);

    let report = recorded.scoring.ok_or_else(|| anyhow!("game was not scored"))?;
    assert_eq!(report.failed, 0);
    let stored = db.get_pick(&alice.id, &fx.game.id).await?;
    assert_eq!(stored.picked_team_id, fx.away.id);
    assert_eq!(stored.status, PickStatus::Scored);
    assert_eq!(stored.is_correct, Some(false));
    assert_eq!(stored.points_earned, 0);
    Ok(())
}

#[tokio::test]
async fn test_pick_withdrawn_during_scoring_stays_gone() -> Result<()> {
    let fx = Fixture::new().await?;
    let alice = seed_user(&fx.db, "alice").await?;
    let bob = seed_user(&fx.db, "bob").await?;
    pick(&fx.db, &alice.id, &fx.game.id, &fx.home.id).await?;
    pick(&fx.db, &bob.id, &fx.game.id, &fx.home.id).await?;

    let store = Arc::new(HeldWrite::new(
        fx.store.clone(),
        Keys::pick(&alice.id, &fx.game.id),
    ));
    let db = Database::new(store.clone(), common::TABLE);

    let withdraw = tokio::spawn({
        let db = db.clone();
        let (user_id, game_id) = (alice.id.clone(), fx.game.id.clone());
        async move { db.delete_pick(&user_id, &game_id).await }
    });
    store.entered.notified().await;

    let recorded = scoring::record_result(&db, &fx.game.id, &final_score(21, 14), CONCURRENCY).await?;
    withdraw.await??;

    let report = recorded.scoring.ok_or_else(|| anyhow!("game was not scored"))?;
    assert_eq!(report.scored, 1);
    assert_eq!(report.failed, 0);
    assert!(matches!(
        db.get_pick(&alice.id, &fx.game.id).await,
        Err(Error::NotFound(_))
    ));
    assert_eq!(db.get_pick(&bob.id, &fx.game.id).await?.points_earned, 1);
    Ok(())
}
