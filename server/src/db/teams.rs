use chrono::Utc;
use pickem_common::{Conference, NewConference, NewTeam, Team, normalize_name, validate_name};
use tracing::{info, warn};

use super::codec::NAME_SEARCH_ATTR;
use super::keys::{EntityKind, Keys, LookupKind, TEAM_PREFIX};
use super::{Database, Index, Query, ScanFilter};
use crate::error::{Error, Result};

fn check_name(name: &str) -> Result<()> {
    match validate_name(name) {
        Some(message) => Err(Error::validation("name", message)),
        None => Ok(()),
    }
}

impl Database {
    // === Conferences ===

    pub async fn create_conference(&self, new: NewConference) -> Result<Conference> {
        check_name(&new.name)?;
        let conference = Conference {
            id: Self::new_id(),
            name: new.name.trim().to_string(),
            abbreviation: new.abbreviation,
            created_at: Utc::now(),
        };

        self.claim(LookupKind::ConferenceName, &conference.name, &conference.id)
            .await?;
        if let Err(e) = self.create_entity(&conference).await {
            self.undo_claim(LookupKind::ConferenceName, &conference.name, &conference.id)
                .await;
            return Err(e);
        }

        info!("Created conference {} ({})", conference.name, conference.id);
        Ok(conference)
    }

    pub async fn get_conference(&self, conference_id: &str) -> Result<Conference> {
        self.require_entity(&Keys::conference(conference_id)).await
    }

    pub async fn get_conference_by_name(&self, name: &str) -> Result<Conference> {
        let id = self
            .resolve(LookupKind::ConferenceName, name)
            .await?
            .ok_or_else(|| Error::not_found("conference"))?;
        self.get_conference(&id).await
    }

    pub async fn list_conferences(&self) -> Result<Vec<Conference>> {
        self.query_entities(&Query::index(Index::Gsi1, EntityKind::Conference.as_str()))
            .await
    }

    pub async fn update_conference(
        &self,
        conference_id: &str,
        changes: NewConference,
    ) -> Result<Conference> {
        check_name(&changes.name)?;
        let _guard = self
            .locks()
            .lock(Keys::conference(conference_id).to_string())
            .await;
        let mut conference = self.get_conference(conference_id).await?;

        let name = changes.name.trim().to_string();
        self.rename(LookupKind::ConferenceName, &conference.name, &name, conference_id)
            .await?;
        let old_name = std::mem::replace(&mut conference.name, name);
        conference.abbreviation = changes.abbreviation;
        if let Err(e) = self.put_entity(&conference).await {
            warn!("Failed to write conference {}, restoring its name: {}", conference_id, e);
            self.undo_rename(LookupKind::ConferenceName, &old_name, &conference.name, conference_id)
                .await;
            return Err(e);
        }
        Ok(conference)
    }

    /// Teams keep their `conference_id`; listing by a deleted conference
    /// still finds them.
    pub async fn delete_conference(&self, conference_id: &str) -> Result<()> {
        let _guard = self
            .locks()
            .lock(Keys::conference(conference_id).to_string())
            .await;
        let conference = self.get_conference(conference_id).await?;
        self.delete_key(&Keys::conference(conference_id)).await?;
        self.release(LookupKind::ConferenceName, &conference.name, conference_id)
            .await?;
        info!("Deleted conference {}", conference_id);
        Ok(())
    }

    // === Teams ===

    pub async fn create_team(&self, new: NewTeam) -> Result<Team> {
        check_name(&new.name)?;
        if let Some(conference_id) = &new.conference_id {
            self.get_conference(conference_id).await?;
        }
        let team = Team {
            id: Self::new_id(),
            name: new.name.trim().to_string(),
            abbreviation: new.abbreviation,
            city: new.city,
            conference_id: new.conference_id,
            created_at: Utc::now(),
        };

        self.claim(LookupKind::TeamName, &team.name, &team.id).await?;
        if let Err(e) = self.create_entity(&team).await {
            self.undo_claim(LookupKind::TeamName, &team.name, &team.id)
                .await;
            return Err(e);
        }

        info!("Created team {} ({})", team.name, team.id);
        Ok(team)
    }

    pub async fn get_team(&self, team_id: &str) -> Result<Team> {
        self.require_entity(&Keys::team(team_id)).await
    }

    pub async fn get_team_by_name(&self, name: &str) -> Result<Team> {
        let id = self
            .resolve(LookupKind::TeamName, name)
            .await?
            .ok_or_else(|| Error::not_found("team"))?;
        match self.get_entity::<Team>(&Keys::team(&id)).await? {
            Some(team) => Ok(team),
            None => {
                warn!("Team name lookup {} points at missing team {}", name, id);
                Err(Error::not_found("team"))
            }
        }
    }

    pub async fn list_teams(&self) -> Result<Vec<Team>> {
        self.query_entities(&Query::index(Index::Gsi1, EntityKind::Team.as_str()))
            .await
    }

    pub async fn list_teams_by_conference(&self, conference_id: &str) -> Result<Vec<Team>> {
        self.query_entities(
            &Query::index(Index::Gsi2, Keys::conference_partition(conference_id))
                .begins_with(TEAM_PREFIX),
        )
        .await
    }

    /// Case-insensitive substring search over team names. Scans the table.
    pub async fn search_teams(&self, text: &str) -> Result<Vec<Team>> {
        let needle = normalize_name(text);
        if needle.is_empty() {
            return self.list_teams().await;
        }
        let filter = ScanFilter::default()
            .entity_type(EntityKind::Team)
            .contains(NAME_SEARCH_ATTR, needle);
        let mut teams: Vec<Team> = self.scan_entities(&filter).await?;
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }

    pub async fn update_team(&self, team_id: &str, changes: NewTeam) -> Result<Team> {
        check_name(&changes.name)?;
        if let Some(conference_id) = &changes.conference_id {
            self.get_conference(conference_id).await?;
        }
        let _guard = self.locks().lock(Keys::team(team_id).to_string()).await;
        let mut team = self.get_team(team_id).await?;

        let name = changes.name.trim().to_string();
        self.rename(LookupKind::TeamName, &team.name, &name, team_id)
            .await?;
        let old_name = std::mem::replace(&mut team.name, name);
        team.abbreviation = changes.abbreviation;
        team.city = changes.city;
        team.conference_id = changes.conference_id;
        if let Err(e) = self.put_entity(&team).await {
            warn!("Failed to write team {}, restoring its name: {}", team_id, e);
            self.undo_rename(LookupKind::TeamName, &old_name, &team.name, team_id)
                .await;
            return Err(e);
        }
        Ok(team)
    }

    pub async fn delete_team(&self, team_id: &str) -> Result<()> {
        let _guard = self.locks().lock(Keys::team(team_id).to_string()).await;
        let team = self.get_team(team_id).await?;
        self.delete_key(&Keys::team(team_id)).await?;
        self.release(LookupKind::TeamName, &team.name, team_id)
            .await?;
        info!("Deleted team {}", team_id);
        Ok(())
    }
}
