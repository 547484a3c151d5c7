//! Every key string in the table is built here. Other modules ask for keys
//! by entity and id and never format them by hand.

use std::fmt;

use pickem_common::normalize_email;

use super::{Index, PrimaryKey};

/// Entity discriminator, stored in `entity_type` and used as the GSI1
/// partition for "all items of a kind".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Team,
    Conference,
    League,
    Game,
    Pick,
    Leaderboard,
    Lookup,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "USER",
            EntityKind::Team => "TEAM",
            EntityKind::Conference => "CONFERENCE",
            EntityKind::League => "LEAGUE",
            EntityKind::Game => "GAME",
            EntityKind::Pick => "PICK",
            EntityKind::Leaderboard => "LEADERBOARD",
            EntityKind::Lookup => "LOOKUP",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alternate unique keys emulated with lookup records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    Username,
    Email,
    TeamName,
    ConferenceName,
}

impl LookupKind {
    fn prefix(&self) -> &'static str {
        match self {
            LookupKind::Username => "USERNAME",
            LookupKind::Email => "EMAIL",
            LookupKind::TeamName => "TEAM_NAME",
            LookupKind::ConferenceName => "CONFERENCE_NAME",
        }
    }

    /// Canonical form of the value as it appears in the key. Usernames are
    /// case-sensitive; everything else is compared lowercased.
    pub fn canonical(&self, value: &str) -> String {
        match self {
            LookupKind::Username => value.to_string(),
            LookupKind::Email => normalize_email(value),
            LookupKind::TeamName | LookupKind::ConferenceName => value.trim().to_lowercase(),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            LookupKind::Username => "username",
            LookupKind::Email => "email",
            LookupKind::TeamName => "team name",
            LookupKind::ConferenceName => "conference name",
        }
    }
}

const PROFILE: &str = "PROFILE";
const METADATA: &str = "METADATA";
const LOOKUP: &str = "LOOKUP";

pub const TEAM_PREFIX: &str = "TEAM#";
pub const GAME_PREFIX: &str = "GAME#";
pub const PICK_PREFIX: &str = "PICK#";
pub const LEADERBOARD_WEEK_PREFIX: &str = "LEADERBOARD#WEEK#";

pub struct Keys;

impl Keys {
    // === Primary keys ===

    pub fn user(user_id: &str) -> PrimaryKey {
        PrimaryKey::new(Self::user_partition(user_id), PROFILE)
    }

    pub fn lookup(kind: LookupKind, value: &str) -> PrimaryKey {
        PrimaryKey::new(format!("{}#{}", kind.prefix(), kind.canonical(value)), LOOKUP)
    }

    pub fn team(team_id: &str) -> PrimaryKey {
        PrimaryKey::new(format!("{}{}", TEAM_PREFIX, team_id), METADATA)
    }

    pub fn conference(conference_id: &str) -> PrimaryKey {
        PrimaryKey::new(Self::conference_partition(conference_id), METADATA)
    }

    pub fn league(league_id: &str) -> PrimaryKey {
        PrimaryKey::new(
            Self::league_partition(league_id),
            format!("METADATA#{}", league_id),
        )
    }

    /// Games live in their league's partition
    pub fn game(league_id: &str, game_id: &str) -> PrimaryKey {
        PrimaryKey::new(Self::league_partition(league_id), Self::game_sort(game_id))
    }

    /// One pick per (user, game) falls out of the key itself
    pub fn pick(user_id: &str, game_id: &str) -> PrimaryKey {
        PrimaryKey::new(Self::user_partition(user_id), format!("{}{}", PICK_PREFIX, game_id))
    }

    pub fn leaderboard_entry(user_id: &str, week: u32) -> PrimaryKey {
        PrimaryKey::new(
            Self::user_partition(user_id),
            format!("{}{}", LEADERBOARD_WEEK_PREFIX, week),
        )
    }

    // === Partitions and sort-key pieces ===

    pub fn user_partition(user_id: &str) -> String {
        format!("USER#{}", user_id)
    }

    pub fn league_partition(league_id: &str) -> String {
        format!("LEAGUE#{}", league_id)
    }

    pub fn conference_partition(conference_id: &str) -> String {
        format!("CONFERENCE#{}", conference_id)
    }

    pub fn game_sort(game_id: &str) -> String {
        format!("{}{}", GAME_PREFIX, game_id)
    }

    /// GSI2 partition shared by a league-week's games and picks
    pub fn league_week(league_id: &str, week: u32) -> String {
        format!("LEAGUE#{}#WEEK#{}", league_id, week)
    }

    /// GSI3 partition: every pick made on one game
    pub fn game_picks_partition(game_id: &str) -> String {
        format!("GAME#{}", game_id)
    }

    /// GSI4 partition: every pick of one season
    pub fn season_partition(season: &str) -> String {
        format!("SEASON#{}", season)
    }

    /// GSI2 partition: every cached leaderboard row of one week
    pub fn leaderboard_week(week: u32) -> String {
        format!("{}{}", LEADERBOARD_WEEK_PREFIX, week)
    }

    // === Secondary index keys, per entity ===

    pub fn by_kind(kind: EntityKind, sort: impl Into<String>) -> (Index, PrimaryKey) {
        (Index::Gsi1, PrimaryKey::new(kind.as_str(), sort))
    }

    pub fn user_indexes(user_id: &str) -> Vec<(Index, PrimaryKey)> {
        vec![Self::by_kind(EntityKind::User, Self::user_partition(user_id))]
    }

    pub fn team_indexes(team_id: &str, conference_id: Option<&str>) -> Vec<(Index, PrimaryKey)> {
        let team_sort = format!("{}{}", TEAM_PREFIX, team_id);
        let mut indexes = vec![Self::by_kind(EntityKind::Team, team_sort.clone())];
        if let Some(conference_id) = conference_id {
            indexes.push((
                Index::Gsi2,
                PrimaryKey::new(Self::conference_partition(conference_id), team_sort),
            ));
        }
        indexes
    }

    pub fn conference_indexes(conference_id: &str) -> Vec<(Index, PrimaryKey)> {
        vec![Self::by_kind(
            EntityKind::Conference,
            Self::conference_partition(conference_id),
        )]
    }

    pub fn league_indexes(league_id: &str) -> Vec<(Index, PrimaryKey)> {
        vec![Self::by_kind(
            EntityKind::League,
            Self::league_partition(league_id),
        )]
    }

    pub fn game_indexes(league_id: &str, game_id: &str, week: u32) -> Vec<(Index, PrimaryKey)> {
        vec![
            Self::by_kind(EntityKind::Game, Self::game_sort(game_id)),
            (
                Index::Gsi2,
                PrimaryKey::new(Self::league_week(league_id, week), Self::game_sort(game_id)),
            ),
        ]
    }

    pub fn pick_indexes(
        user_id: &str,
        game_id: &str,
        league_id: &str,
        week: u32,
        season: &str,
    ) -> Vec<(Index, PrimaryKey)> {
        vec![
            Self::by_kind(
                EntityKind::Pick,
                format!("{}{}#USER#{}", PICK_PREFIX, game_id, user_id),
            ),
            (
                Index::Gsi2,
                PrimaryKey::new(
                    Self::league_week(league_id, week),
                    format!("{}{}#{}", PICK_PREFIX, user_id, game_id),
                ),
            ),
            (
                Index::Gsi3,
                PrimaryKey::new(
                    Self::game_picks_partition(game_id),
                    Self::user_partition(user_id),
                ),
            ),
            (
                Index::Gsi4,
                PrimaryKey::new(
                    Self::season_partition(season),
                    format!("USER#{}#{}{}", user_id, PICK_PREFIX, game_id),
                ),
            ),
        ]
    }

    pub fn leaderboard_indexes(user_id: &str, week: u32) -> Vec<(Index, PrimaryKey)> {
        vec![
            Self::by_kind(
                EntityKind::Leaderboard,
                format!("USER#{}#WEEK#{}", user_id, week),
            ),
            (
                Index::Gsi2,
                PrimaryKey::new(Self::leaderboard_week(week), Self::user_partition(user_id)),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_primary_keys_are_bit_exact() {
        assert_eq!(Keys::user("42"), PrimaryKey::new("USER#42", "PROFILE"));
        assert_eq!(
            Keys::lookup(LookupKind::Username, "alice"),
            PrimaryKey::new("USERNAME#alice", "LOOKUP")
        );
        assert_eq!(
            Keys::lookup(LookupKind::Email, "Alice@Example.com"),
            PrimaryKey::new("EMAIL#alice@example.com", "LOOKUP")
        );
        assert_eq!(Keys::team("7"), PrimaryKey::new("TEAM#7", "METADATA"));
        assert_eq!(
            Keys::conference("3"),
            PrimaryKey::new("CONFERENCE#3", "METADATA")
        );
        assert_eq!(Keys::league("9"), PrimaryKey::new("LEAGUE#9", "METADATA#9"));
        assert_eq!(Keys::game("9", "g1"), PrimaryKey::new("LEAGUE#9", "GAME#g1"));
        assert_eq!(Keys::pick("42", "g1"), PrimaryKey::new("USER#42", "PICK#g1"));
        assert_eq!(
            Keys::leaderboard_entry("42", 3),
            PrimaryKey::new("USER#42", "LEADERBOARD#WEEK#3")
        );
    }

    #[test]
    fn test_keys_are_deterministic() {
        for id in ["", "0", "abc", "9f1c2d3e-aaaa-bbbb-cccc-123456789012"] {
            assert_eq!(Keys::user(id), Keys::user(id));
            assert_eq!(Keys::pick(id, "g"), Keys::pick(id, "g"));
            assert_eq!(Keys::game_indexes("l", id, 4), Keys::game_indexes("l", id, 4));
            assert_eq!(
                Keys::pick_indexes(id, "g", "l", 1, "2025"),
                Keys::pick_indexes(id, "g", "l", 1, "2025")
            );
        }
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let id = "1";
        let keys = vec![
            Keys::user(id),
            Keys::team(id),
            Keys::conference(id),
            Keys::league(id),
            Keys::game(id, id),
            Keys::pick(id, id),
            Keys::leaderboard_entry(id, 1),
            Keys::lookup(LookupKind::Username, id),
            Keys::lookup(LookupKind::Email, id),
            Keys::lookup(LookupKind::TeamName, id),
            Keys::lookup(LookupKind::ConferenceName, id),
        ];
        let unique: HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn test_week_is_decimal_without_padding() {
        assert_eq!(Keys::league_week("l1", 1), "LEAGUE#l1#WEEK#1");
        assert_eq!(Keys::league_week("l1", 12), "LEAGUE#l1#WEEK#12");
        assert_eq!(Keys::leaderboard_week(7), "LEADERBOARD#WEEK#7");
    }

    #[test]
    fn test_pick_indexes_cover_every_access_path() {
        let indexes = Keys::pick_indexes("u1", "g1", "l1", 2, "2025");
        let find = |index: Index| {
            indexes
                .iter()
                .find(|(i, _)| *i == index)
                .map(|(_, key)| key.clone())
                .unwrap()
        };
        assert_eq!(find(Index::Gsi1).pk, "PICK");
        assert_eq!(find(Index::Gsi2), PrimaryKey::new("LEAGUE#l1#WEEK#2", "PICK#u1#g1"));
        assert_eq!(find(Index::Gsi3), PrimaryKey::new("GAME#g1", "USER#u1"));
        assert_eq!(find(Index::Gsi4), PrimaryKey::new("SEASON#2025", "USER#u1#PICK#g1"));
    }

    #[test]
    fn test_team_listed_under_conference_only_when_assigned() {
        assert_eq!(Keys::team_indexes("t1", None).len(), 1);
        let indexes = Keys::team_indexes("t1", Some("c1"));
        assert_eq!(
            indexes[1],
            (Index::Gsi2, PrimaryKey::new("CONFERENCE#c1", "TEAM#t1"))
        );
    }
}
