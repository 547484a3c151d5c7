use chrono::Utc;
use pickem_common::{League, NewLeague, validate_name};
use tracing::info;

use super::codec::item_key;
use super::keys::{EntityKind, Keys};
use super::{Database, Index, Query};
use crate::error::{Error, Result};
use crate::season::current_season;

fn check_league(new: &NewLeague) -> Result<()> {
    if let Some(message) = validate_name(&new.name) {
        return Err(Error::validation("name", message));
    }
    if matches!(&new.season, Some(season) if season.trim().is_empty()) {
        return Err(Error::validation("season", "Season must not be empty"));
    }
    Ok(())
}

impl Database {
    pub async fn create_league(&self, new: NewLeague) -> Result<League> {
        check_league(&new)?;
        let league = League {
            id: Self::new_id(),
            name: new.name.trim().to_string(),
            season: new
                .season
                .map(|s| s.trim().to_string())
                .unwrap_or_else(current_season),
            description: new.description,
            created_at: Utc::now(),
        };
        self.create_entity(&league).await?;
        info!("Created league {} for season {}", league.id, league.season);
        Ok(league)
    }

    pub async fn get_league(&self, league_id: &str) -> Result<League> {
        self.require_entity(&Keys::league(league_id)).await
    }

    pub async fn list_leagues(&self) -> Result<Vec<League>> {
        self.query_entities(&Query::index(Index::Gsi1, EntityKind::League.as_str()))
            .await
    }

    /// Games already created keep the season they were created with.
    pub async fn update_league(&self, league_id: &str, changes: NewLeague) -> Result<League> {
        check_league(&changes)?;
        let _guard = self.locks().lock(Keys::league(league_id).to_string()).await;
        let mut league = self.get_league(league_id).await?;
        league.name = changes.name.trim().to_string();
        if let Some(season) = changes.season {
            league.season = season.trim().to_string();
        }
        league.description = changes.description;
        self.put_entity(&league).await?;
        Ok(league)
    }

    /// Removes the league partition: the league itself and its games.
    /// Picks on those games stay with their users.
    pub async fn delete_league(&self, league_id: &str) -> Result<()> {
        let _guard = self.locks().lock(Keys::league(league_id).to_string()).await;
        self.get_league(league_id).await?;

        let items = self
            .client()
            .query(self.table(), &Query::table(Keys::league_partition(league_id)))
            .await?;
        for key in items.iter().filter_map(item_key) {
            self.delete_key(&key).await?;
        }
        info!("Deleted league {} and {} items", league_id, items.len());
        Ok(())
    }
}
