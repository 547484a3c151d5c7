//! Domain records <-> stored items.
//!
//! An item carries its keys, index keys and `entity_type` as top-level
//! attributes; the record itself sits in the `data` map.

use aws_sdk_dynamodb::types::AttributeValue;
use pickem_common::{Conference, Game, LeaderboardEntry, League, Pick, Team, User};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use super::keys::{EntityKind, Keys};
use super::{DATA_ATTR, ENTITY_TYPE_ATTR, Index, Item, PK_ATTR, PrimaryKey, SK_ATTR};
use crate::error::{Error, Result};

/// Top-level attribute holding a lowercased team name for the scan search
pub const NAME_SEARCH_ATTR: &str = "name_search";

pub trait Entity: Serialize + DeserializeOwned + Send + Sync + Sized {
    const KIND: EntityKind;

    fn primary_key(&self) -> PrimaryKey;

    fn index_keys(&self) -> Vec<(Index, PrimaryKey)>;

    /// Additional top-level attributes, outside `data`
    fn extra_attributes(&self) -> Vec<(&'static str, AttributeValue)> {
        Vec::new()
    }

    /// Applied after decoding to restore invariants the type cannot express.
    fn normalize(self) -> Self {
        self
    }
}

/// Assembles the envelope around an already-encoded payload.
pub fn build_item(
    kind: EntityKind,
    key: &PrimaryKey,
    indexes: &[(Index, PrimaryKey)],
    data: AttributeValue,
) -> Item {
    let mut item = Item::new();
    item.insert(PK_ATTR.to_string(), AttributeValue::S(key.pk.clone()));
    item.insert(SK_ATTR.to_string(), AttributeValue::S(key.sk.clone()));
    for (index, index_key) in indexes {
        item.insert(
            index.pk_attr().to_string(),
            AttributeValue::S(index_key.pk.clone()),
        );
        item.insert(
            index.sk_attr().to_string(),
            AttributeValue::S(index_key.sk.clone()),
        );
    }
    item.insert(
        ENTITY_TYPE_ATTR.to_string(),
        AttributeValue::S(kind.as_str().to_string()),
    );
    item.insert(DATA_ATTR.to_string(), data);
    item
}

pub fn encode<E: Entity>(entity: &E) -> Result<Item> {
    let key = entity.primary_key();
    let data: AttributeValue =
        serde_dynamo::to_attribute_value(entity).map_err(|e| Error::corrupt(key.to_string(), e))?;
    if !data.is_m() {
        return Err(Error::corrupt(key.to_string(), "payload is not a map"));
    }

    let mut item = build_item(E::KIND, &key, &entity.index_keys(), data);
    for (name, value) in entity.extra_attributes() {
        item.insert(name.to_string(), value);
    }
    Ok(item)
}

/// Decodes one item, failing on any shape mismatch.
pub fn decode<E: Entity>(item: &Item) -> Result<E> {
    let key = describe_key(item);
    match item.get(ENTITY_TYPE_ATTR).and_then(|v| v.as_s().ok()) {
        Some(kind) if kind == E::KIND.as_str() => {}
        Some(kind) => {
            return Err(Error::corrupt(
                key,
                format!("expected a {} item, found {}", E::KIND, kind),
            ));
        }
        None => return Err(Error::corrupt(key, "missing entity_type")),
    }

    let data = payload(item).map_err(|reason| Error::corrupt(key.clone(), reason))?;
    let entity: E =
        serde_dynamo::from_attribute_value(data.clone()).map_err(|e| Error::corrupt(key, e))?;
    Ok(entity.normalize())
}

/// Decodes a listing, skipping (and logging) items that do not decode.
pub fn decode_list<E: Entity>(items: &[Item]) -> Vec<E> {
    items
        .iter()
        .filter_map(|item| match decode::<E>(item) {
            Ok(entity) => Some(entity),
            Err(e) => {
                warn!("Skipping undecodable {} item: {}", E::KIND, e);
                None
            }
        })
        .collect()
}

pub(crate) fn payload(item: &Item) -> std::result::Result<&AttributeValue, &'static str> {
    match item.get(DATA_ATTR) {
        Some(data) if data.is_m() => Ok(data),
        Some(_) => Err("data is not a map"),
        None => Err("missing data"),
    }
}

/// Primary key of a stored item, when both key attributes are strings.
pub fn item_key(item: &Item) -> Option<PrimaryKey> {
    let pk = item.get(PK_ATTR)?.as_s().ok()?;
    let sk = item.get(SK_ATTR)?.as_s().ok()?;
    Some(PrimaryKey::new(pk.as_str(), sk.as_str()))
}

pub(crate) fn describe_key(item: &Item) -> String {
    let part = |name: &str| {
        item.get(name)
            .and_then(|v| v.as_s().ok())
            .cloned()
            .unwrap_or_else(|| "?".to_string())
    };
    format!("{}|{}", part(PK_ATTR), part(SK_ATTR))
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn primary_key(&self) -> PrimaryKey {
        Keys::user(&self.id)
    }

    fn index_keys(&self) -> Vec<(Index, PrimaryKey)> {
        Keys::user_indexes(&self.id)
    }
}

impl Entity for Conference {
    const KIND: EntityKind = EntityKind::Conference;

    fn primary_key(&self) -> PrimaryKey {
        Keys::conference(&self.id)
    }

    fn index_keys(&self) -> Vec<(Index, PrimaryKey)> {
        Keys::conference_indexes(&self.id)
    }
}

impl Entity for Team {
    const KIND: EntityKind = EntityKind::Team;

    fn primary_key(&self) -> PrimaryKey {
        Keys::team(&self.id)
    }

    fn index_keys(&self) -> Vec<(Index, PrimaryKey)> {
        Keys::team_indexes(&self.id, self.conference_id.as_deref())
    }

    fn extra_attributes(&self) -> Vec<(&'static str, AttributeValue)> {
        vec![(
            NAME_SEARCH_ATTR,
            AttributeValue::S(self.name.to_lowercase()),
        )]
    }
}

impl Entity for League {
    const KIND: EntityKind = EntityKind::League;

    fn primary_key(&self) -> PrimaryKey {
        Keys::league(&self.id)
    }

    fn index_keys(&self) -> Vec<(Index, PrimaryKey)> {
        Keys::league_indexes(&self.id)
    }
}

impl Entity for Game {
    const KIND: EntityKind = EntityKind::Game;

    fn primary_key(&self) -> PrimaryKey {
        Keys::game(&self.league_id, &self.id)
    }

    fn index_keys(&self) -> Vec<(Index, PrimaryKey)> {
        Keys::game_indexes(&self.league_id, &self.id, self.week)
    }

    fn normalize(self) -> Self {
        self.sanitize()
    }
}

impl Entity for Pick {
    const KIND: EntityKind = EntityKind::Pick;

    fn primary_key(&self) -> PrimaryKey {
        Keys::pick(&self.user_id, &self.game_id)
    }

    fn index_keys(&self) -> Vec<(Index, PrimaryKey)> {
        Keys::pick_indexes(
            &self.user_id,
            &self.game_id,
            &self.league_id,
            self.week,
            &self.season,
        )
    }
}

impl Entity for LeaderboardEntry {
    const KIND: EntityKind = EntityKind::Leaderboard;

    fn primary_key(&self) -> PrimaryKey {
        Keys::leaderboard_entry(&self.user_id, self.week)
    }

    fn index_keys(&self) -> Vec<(Index, PrimaryKey)> {
        Keys::leaderboard_indexes(&self.user_id, self.week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pickem_common::{GameStatus, PickStatus, Side};
    use std::collections::HashMap;

    fn at() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 7, 17, 0, 0).unwrap()
    }

    fn user(username: &str) -> User {
        User {
            id: "u1".to_string(),
            username: username.to_string(),
            email: "alice@example.com".to_string(),
            display_name: String::new(),
            password_hash: "hash".to_string(),
            is_admin: false,
            created_at: at(),
            updated_at: at(),
        }
    }

    fn game(status: GameStatus, winner: Option<Side>) -> Game {
        Game {
            id: "g1".to_string(),
            league_id: "l1".to_string(),
            week: 1,
            season: "2025".to_string(),
            home_team_id: "A".to_string(),
            away_team_id: "B".to_string(),
            kickoff: Some(at()),
            status,
            home_score: Some(21),
            away_score: Some(14),
            winner,
            created_at: at(),
            updated_at: at(),
        }
    }

    fn assert_item_round_trip<E: Entity + PartialEq + std::fmt::Debug>(entity: &E) {
        let item = encode(entity).unwrap();
        let decoded: E = decode(&item).unwrap();
        assert_eq!(&decoded, entity);
        assert_eq!(encode(&decoded).unwrap(), item);
    }

    #[test]
    fn test_round_trip_every_kind() {
        assert_item_round_trip(&user("alice"));
        assert_item_round_trip(&Conference {
            id: "c1".to_string(),
            name: "North".to_string(),
            abbreviation: String::new(),
            created_at: at(),
        });
        assert_item_round_trip(&Team {
            id: "t1".to_string(),
            name: "Otters".to_string(),
            abbreviation: "OTT".to_string(),
            city: String::new(),
            conference_id: Some("c1".to_string()),
            created_at: at(),
        });
        assert_item_round_trip(&League {
            id: "l1".to_string(),
            name: "Office".to_string(),
            season: "2025".to_string(),
            description: String::new(),
            created_at: at(),
        });
        assert_item_round_trip(&game(GameStatus::Completed, Some(Side::Home)));
        assert_item_round_trip(&Pick {
            user_id: "u1".to_string(),
            game_id: "g1".to_string(),
            league_id: "l1".to_string(),
            week: 1,
            season: "2025".to_string(),
            picked_team_id: "A".to_string(),
            confidence: None,
            status: PickStatus::Scored,
            is_correct: Some(false),
            points_earned: 0,
            created_at: at(),
            updated_at: at(),
        });
        assert_item_round_trip(&LeaderboardEntry {
            user_id: "u1".to_string(),
            username: "alice".to_string(),
            week: 1,
            league_id: "l1".to_string(),
            season: "2025".to_string(),
            total_points: 0,
            correct_picks: 0,
            total_picks: 0,
            win_pct: 0.0,
            updated_at: at(),
        });
    }

    #[test]
    fn test_round_trip_boundary_values() {
        assert_item_round_trip(&user(""));
        assert_item_round_trip(&user(&"z".repeat(20)));
        let mut g = game(GameStatus::Completed, Some(Side::Away));
        g.home_score = Some(0);
        g.away_score = Some(u32::MAX);
        g.kickoff = None;
        assert_item_round_trip(&g);
    }

    #[test]
    fn test_envelope_attributes() {
        let item = encode(&game(GameStatus::Pending, None)).unwrap();
        let s = |name: &str| item.get(name).unwrap().as_s().unwrap().as_str();
        assert_eq!(s("PK"), "LEAGUE#l1");
        assert_eq!(s("SK"), "GAME#g1");
        assert_eq!(s("entity_type"), "GAME");
        assert_eq!(s("GSI1_PK"), "GAME");
        assert_eq!(s("GSI1_SK"), "GAME#g1");
        assert_eq!(s("GSI2_PK"), "LEAGUE#l1#WEEK#1");
        assert!(item.get("GSI3_PK").is_none());
        assert!(item.get("data").unwrap().is_m());
    }

    #[test]
    fn test_stray_winner_is_dropped_on_decode() {
        let item = encode(&game(GameStatus::InProgress, Some(Side::Home))).unwrap();
        let decoded: Game = decode(&item).unwrap();
        assert!(decoded.winner.is_none());
    }

    #[test]
    fn test_wrong_shapes_are_corrupt() {
        let mut item = encode(&user("alice")).unwrap();
        item.insert(
            DATA_ATTR.to_string(),
            AttributeValue::S("not a map".to_string()),
        );
        assert!(matches!(decode::<User>(&item), Err(Error::CorruptData { .. })));

        let mut item = encode(&user("alice")).unwrap();
        let mut data = HashMap::new();
        data.insert("id".to_string(), AttributeValue::N("12".to_string()));
        item.insert(DATA_ATTR.to_string(), AttributeValue::M(data));
        assert!(matches!(decode::<User>(&item), Err(Error::CorruptData { .. })));

        let item = encode(&user("alice")).unwrap();
        assert!(matches!(decode::<Team>(&item), Err(Error::CorruptData { .. })));
    }

    #[test]
    fn test_list_decoding_skips_corrupt_items() {
        let good = encode(&user("alice")).unwrap();
        let mut bad = encode(&user("bob")).unwrap();
        bad.remove(DATA_ATTR);
        let users: Vec<User> = decode_list(&[good, bad]);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "alice");
    }
}
