use chrono::Utc;
use pickem_common::{Applied, Game, GameStatus, GameUpdate, NewGame};
use tracing::{debug, info};

use super::keys::{EntityKind, GAME_PREFIX, Keys};
use super::{Database, Index, Query, SortCondition};
use crate::error::{Error, Result};

impl Database {
    /// Schedules a game in a league. Both teams and the league must exist;
    /// the game takes the league's season.
    pub async fn create_game(&self, new: NewGame) -> Result<Game> {
        new.validate()?;
        let league = self.get_league(&new.league_id).await?;
        self.get_team(&new.home_team_id).await?;
        self.get_team(&new.away_team_id).await?;

        let now = Utc::now();
        let game = Game {
            id: Self::new_id(),
            league_id: league.id,
            week: new.week,
            season: league.season,
            home_team_id: new.home_team_id,
            away_team_id: new.away_team_id,
            kickoff: new.kickoff,
            status: GameStatus::Pending,
            home_score: None,
            away_score: None,
            winner: None,
            created_at: now,
            updated_at: now,
        };
        self.create_entity(&game).await?;

        info!(
            "Created game {} in league {} week {}",
            game.id, game.league_id, game.week
        );
        Ok(game)
    }

    /// Finds a game by id alone through the by-kind index.
    pub async fn get_game(&self, game_id: &str) -> Result<Game> {
        let query = Query::index(Index::Gsi1, EntityKind::Game.as_str())
            .sort(SortCondition::Equals(Keys::game_sort(game_id)));
        let games: Vec<Game> = self.query_entities(&query).await?;
        let game = games.into_iter().next().ok_or_else(|| Error::not_found("game"))?;
        // The index is eventually consistent; re-read the item itself
        self.get_league_game(&game.league_id, &game.id).await
    }

    pub async fn get_league_game(&self, league_id: &str, game_id: &str) -> Result<Game> {
        self.require_entity(&Keys::game(league_id, game_id)).await
    }

    pub async fn list_games_by_league(&self, league_id: &str) -> Result<Vec<Game>> {
        self.query_entities(&Query::table(Keys::league_partition(league_id)).begins_with(GAME_PREFIX))
            .await
    }

    pub async fn list_games_by_week(&self, league_id: &str, week: u32) -> Result<Vec<Game>> {
        self.query_entities(
            &Query::index(Index::Gsi2, Keys::league_week(league_id, week)).begins_with(GAME_PREFIX),
        )
        .await
    }

    /// Applies a status/score edit and stores the game. Scoring is left to
    /// the caller, driven by `Applied::rescore`.
    pub async fn apply_game_update(
        &self,
        game_id: &str,
        update: &GameUpdate,
    ) -> Result<(Game, Applied)> {
        let game = self.get_game(game_id).await?;
        let _guard = self
            .locks()
            .lock(Keys::game(&game.league_id, game_id).to_string())
            .await;
        // Re-read under the lock so concurrent edits apply in order
        let mut game = self.get_league_game(&game.league_id, game_id).await?;
        let applied = game.apply_update(update, Utc::now())?;
        self.put_entity(&game).await?;

        debug!(
            "Game {} moved {} -> {} (rescore: {})",
            game_id,
            applied.previous.as_str(),
            game.status.as_str(),
            applied.rescore
        );
        Ok((game, applied))
    }

    /// Deletes the game and every pick made on it.
    pub async fn delete_game(&self, game_id: &str) -> Result<()> {
        let game = self.get_game(game_id).await?;
        let _guard = self
            .locks()
            .lock(Keys::game(&game.league_id, game_id).to_string())
            .await;

        let picks = self.list_picks_for_game(game_id).await?;
        for pick in &picks {
            self.delete_key(&Keys::pick(&pick.user_id, &pick.game_id))
                .await?;
        }
        self.delete_key(&Keys::game(&game.league_id, game_id))
            .await?;

        info!("Deleted game {} and {} picks", game_id, picks.len());
        Ok(())
    }
}
