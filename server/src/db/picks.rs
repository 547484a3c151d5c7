use chrono::Utc;
use pickem_common::{Game, NewPick, Pick};
use tracing::{debug, info};

use super::keys::{EntityKind, Keys, PICK_PREFIX};
use super::{Database, Index, Query};
use crate::error::{Error, Result};

fn check_open(game: &Game) -> Result<()> {
    if !game.is_open_for_picks() {
        return Err(Error::validation(
            "game_id",
            format!("game is {}, picks are closed", game.status.as_str()),
        ));
    }
    if matches!(game.kickoff, Some(kickoff) if kickoff <= Utc::now()) {
        return Err(Error::validation("game_id", "game has kicked off, picks are closed"));
    }
    Ok(())
}

fn check_team(game: &Game, team_id: &str) -> Result<()> {
    if game.involves(team_id) {
        Ok(())
    } else {
        Err(Error::validation(
            "picked_team_id",
            "must be the home or away team of the game",
        ))
    }
}

impl Database {
    /// Records a user's pick. A user gets one pick per game: a second
    /// submission fails with `Conflict` and leaves the first untouched.
    pub async fn submit_pick(&self, user_id: &str, new: NewPick) -> Result<Pick> {
        let game = self.get_game(&new.game_id).await?;
        check_team(&game, &new.picked_team_id)?;
        check_open(&game)?;

        let pick = Pick::new(user_id, &game, &new, Utc::now());
        match self.create_entity(&pick).await {
            Ok(()) => {
                info!("User {} picked {} in game {}", user_id, pick.picked_team_id, game.id);
                Ok(pick)
            }
            Err(Error::Conflict(_)) => Err(Error::conflict("pick")),
            Err(e) => Err(e),
        }
    }

    pub async fn get_pick(&self, user_id: &str, game_id: &str) -> Result<Pick> {
        self.require_entity(&Keys::pick(user_id, game_id)).await
    }

    /// Switches an existing pick to another team while the game is open.
    pub async fn change_pick(
        &self,
        user_id: &str,
        game_id: &str,
        picked_team_id: &str,
        confidence: Option<u32>,
    ) -> Result<Pick> {
        let key = Keys::pick(user_id, game_id);
        let _guard = self.locks().lock(key.to_string()).await;

        let mut pick: Pick = self.require_entity(&key).await?;
        let game = self.get_game(game_id).await?;
        check_team(&game, picked_team_id)?;
        check_open(&game)?;

        pick.picked_team_id = picked_team_id.to_string();
        if confidence.is_some() {
            pick.confidence = confidence;
        }
        pick.updated_at = Utc::now();
        self.put_entity(&pick).await?;

        debug!("User {} changed pick in game {}", user_id, game_id);
        Ok(pick)
    }

    /// Withdraws a pick while the game is open.
    pub async fn delete_pick(&self, user_id: &str, game_id: &str) -> Result<()> {
        let key = Keys::pick(user_id, game_id);
        let _guard = self.locks().lock(key.to_string()).await;

        let _: Pick = self.require_entity(&key).await?;
        let game = self.get_game(game_id).await?;
        check_open(&game)?;
        self.delete_key(&key).await
    }

    pub async fn list_picks_for_user(&self, user_id: &str) -> Result<Vec<Pick>> {
        self.query_entities(&Query::table(Keys::user_partition(user_id)).begins_with(PICK_PREFIX))
            .await
    }

    /// Every pick on one game; the scoring fan-out.
    pub async fn list_picks_for_game(&self, game_id: &str) -> Result<Vec<Pick>> {
        self.query_entities(&Query::index(Index::Gsi3, Keys::game_picks_partition(game_id)))
            .await
    }

    pub async fn list_picks_for_week(&self, league_id: &str, week: u32) -> Result<Vec<Pick>> {
        self.query_entities(
            &Query::index(Index::Gsi2, Keys::league_week(league_id, week)).begins_with(PICK_PREFIX),
        )
        .await
    }

    pub async fn list_picks_for_season(&self, season: &str) -> Result<Vec<Pick>> {
        self.query_entities(&Query::index(Index::Gsi4, Keys::season_partition(season)))
            .await
    }

    pub async fn list_all_picks(&self) -> Result<Vec<Pick>> {
        self.query_entities(&Query::index(Index::Gsi1, EntityKind::Pick.as_str()))
            .await
    }
}
