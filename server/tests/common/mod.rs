#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use pickem_common::{Game, GameStatus, GameUpdate, League, NewGame, NewLeague, NewTeam, NewUser, Team, User};
use server::db::codec::item_key;
use server::db::memory::MemoryStore;
use server::db::{Item, PrimaryKey, Query, ScanFilter, StorageClient};
use server::{Database, Error};

pub const TABLE: &str = "pickem-test";

pub fn memory_db() -> (Arc<MemoryStore>, Database) {
    let store = Arc::new(MemoryStore::new());
    let db = Database::new(store.clone(), TABLE);
    (store, db)
}

pub async fn seed_user(db: &Database, username: &str) -> Result<User> {
    let user = db
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            display_name: username.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            is_admin: false,
        })
        .await?;
    Ok(user)
}

pub async fn seed_team(db: &Database, name: &str, abbreviation: &str) -> Result<Team> {
    let team = db
        .create_team(NewTeam {
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            city: String::new(),
            conference_id: None,
        })
        .await?;
    Ok(team)
}

pub async fn seed_league(db: &Database, name: &str) -> Result<League> {
    let league = db
        .create_league(NewLeague {
            name: name.to_string(),
            season: Some("2025".to_string()),
            description: String::new(),
        })
        .await?;
    Ok(league)
}

pub async fn seed_game(
    db: &Database,
    league_id: &str,
    week: u32,
    home: &Team,
    away: &Team,
) -> Result<Game> {
    let game = db
        .create_game(NewGame {
            league_id: league_id.to_string(),
            week,
            home_team_id: home.id.clone(),
            away_team_id: away.id.clone(),
            kickoff: None,
        })
        .await?;
    Ok(game)
}

pub fn final_score(home_score: u32, away_score: u32) -> GameUpdate {
    GameUpdate {
        status: Some(GameStatus::Completed),
        home_score: Some(home_score),
        away_score: Some(away_score),
    }
}

/// One league with two teams and a week-1 game between them
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub db: Database,
    pub league: League,
    pub home: Team,
    pub away: Team,
    pub game: Game,
}

impl Fixture {
    pub async fn new() -> Result<Self> {
        let (store, db) = memory_db();
        let league = seed_league(&db, "Office Pool").await?;
        let home = seed_team(&db, "Chiefs", "KC").await?;
        let away = seed_team(&db, "Bills", "BUF").await?;
        let game = seed_game(&db, &league.id, 1, &home, &away).await?;
        Ok(Self {
            store,
            db,
            league,
            home,
            away,
            game,
        })
    }
}

/// Shares a memory store and rejects puts and deletes of chosen keys while
/// `failing` is set. Conditional creates always go through.
pub struct FailingWrites {
    inner: Arc<MemoryStore>,
    keys: Mutex<HashSet<PrimaryKey>>,
    failing: AtomicBool,
}

impl FailingWrites {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            keys: Mutex::new(HashSet::new()),
            failing: AtomicBool::new(false),
        }
    }

    pub fn block(&self, key: PrimaryKey) {
        self.keys.lock().unwrap().insert(key);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn rejects(&self, key: Option<&PrimaryKey>) -> bool {
        self.failing.load(Ordering::SeqCst)
            && key.is_some_and(|key| self.keys.lock().unwrap().contains(key))
    }
}

#[async_trait]
impl StorageClient for FailingWrites {
    async fn get(&self, table: &str, key: &PrimaryKey) -> server::Result<Option<Item>> {
        self.inner.get(table, key).await
    }

    async fn put(&self, table: &str, item: Item) -> server::Result<()> {
        if self.rejects(item_key(&item).as_ref()) {
            return Err(Error::Backend(anyhow!("injected write failure")));
        }
        self.inner.put(table, item).await
    }

    async fn put_if_absent(&self, table: &str, item: Item) -> server::Result<()> {
        self.inner.put_if_absent(table, item).await
    }

    async fn delete(&self, table: &str, key: &PrimaryKey) -> server::Result<()> {
        if self.rejects(Some(key)) {
            return Err(Error::Backend(anyhow!("injected delete failure")));
        }
        self.inner.delete(table, key).await
    }

    async fn query(&self, table: &str, query: &Query) -> server::Result<Vec<Item>> {
        self.inner.query(table, query).await
    }

    async fn scan(&self, table: &str, filter: Option<&ScanFilter>) -> server::Result<Vec<Item>> {
        self.inner.scan(table, filter).await
    }
}

/// A database over `store` whose writes can be made to fail
pub fn failing_db(store: &Arc<MemoryStore>) -> (Arc<FailingWrites>, Database) {
    let failing = Arc::new(FailingWrites::new(store.clone()));
    let db = Database::new(failing.clone(), TABLE);
    (failing, db)
}
