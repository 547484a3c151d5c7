// Expression helpers for DynamoDB operations

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use super::{ENTITY_TYPE_ATTR, PK_ATTR, PrimaryKey, Query, SK_ATTR, ScanFilter, SortCondition};

pub fn pk_sk_key(key: &PrimaryKey) -> HashMap<String, AttributeValue> {
    let mut map = HashMap::new();
    map.insert(PK_ATTR.to_string(), AttributeValue::S(key.pk.clone()));
    map.insert(SK_ATTR.to_string(), AttributeValue::S(key.sk.clone()));
    map
}

/// A condition expression with its placeholder tables filled in
#[derive(Debug, Default, PartialEq)]
pub struct Expression {
    pub expression: String,
    pub names: HashMap<String, String>,
    pub values: HashMap<String, AttributeValue>,
}

impl Expression {
    fn name(&mut self, placeholder: &str, attribute: &str) {
        self.names
            .insert(placeholder.to_string(), attribute.to_string());
    }

    fn value(&mut self, placeholder: &str, value: &str) {
        self.values
            .insert(placeholder.to_string(), AttributeValue::S(value.to_string()));
    }
}

pub fn key_condition(query: &Query) -> Expression {
    let mut expr = Expression::default();
    expr.name("#pk", query.pk_attr());
    expr.value(":pk", &query.partition);

    let sort_clause = match &query.sort {
        None => None,
        Some(SortCondition::Equals(v)) => {
            expr.value(":sk", v);
            Some("#sk = :sk".to_string())
        }
        Some(SortCondition::BeginsWith(prefix)) => {
            expr.value(":sk", prefix);
            Some("begins_with(#sk, :sk)".to_string())
        }
        Some(SortCondition::Between(low, high)) => {
            expr.value(":sk_low", low);
            expr.value(":sk_high", high);
            Some("#sk BETWEEN :sk_low AND :sk_high".to_string())
        }
        Some(SortCondition::AtLeast(v)) => {
            expr.value(":sk", v);
            Some("#sk >= :sk".to_string())
        }
        Some(SortCondition::AtMost(v)) => {
            expr.value(":sk", v);
            Some("#sk <= :sk".to_string())
        }
    };

    expr.expression = match sort_clause {
        Some(clause) => {
            expr.name("#sk", query.sk_attr());
            format!("#pk = :pk AND {}", clause)
        }
        None => "#pk = :pk".to_string(),
    };
    expr
}

/// `None` when the filter has nothing to check.
pub fn scan_filter(filter: &ScanFilter) -> Option<Expression> {
    let mut expr = Expression::default();
    let mut clauses = Vec::new();

    if let Some(kind) = &filter.entity_type {
        expr.name("#et", ENTITY_TYPE_ATTR);
        expr.value(":et", kind);
        clauses.push("#et = :et");
    }
    if let Some((attribute, needle)) = &filter.contains {
        expr.name("#attr", attribute);
        expr.value(":needle", needle);
        clauses.push("contains(#attr, :needle)");
    }

    if clauses.is_empty() {
        return None;
    }
    expr.expression = clauses.join(" AND ");
    Some(expr)
}

/// Condition that makes a put fail when the key is already taken
pub fn not_exists_condition() -> (String, HashMap<String, String>) {
    let mut names = HashMap::new();
    names.insert("#pk".to_string(), PK_ATTR.to_string());
    ("attribute_not_exists(#pk)".to_string(), names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Index;

    #[test]
    fn test_partition_only_query() {
        let expr = key_condition(&Query::table("USER#1"));
        assert_eq!(expr.expression, "#pk = :pk");
        assert_eq!(expr.names.get("#pk").map(String::as_str), Some("PK"));
        assert!(!expr.names.contains_key("#sk"));
        assert_eq!(
            expr.values.get(":pk"),
            Some(&AttributeValue::S("USER#1".to_string()))
        );
    }

    #[test]
    fn test_index_prefix_query() {
        let query = Query::index(Index::Gsi2, "LEAGUE#l1#WEEK#1").begins_with("PICK#");
        let expr = key_condition(&query);
        assert_eq!(expr.expression, "#pk = :pk AND begins_with(#sk, :sk)");
        assert_eq!(expr.names.get("#pk").map(String::as_str), Some("GSI2_PK"));
        assert_eq!(expr.names.get("#sk").map(String::as_str), Some("GSI2_SK"));
    }

    #[test]
    fn test_between_query() {
        let query = Query::table("USER#1").sort(SortCondition::Between(
            "LEADERBOARD#WEEK#1".to_string(),
            "LEADERBOARD#WEEK#9".to_string(),
        ));
        let expr = key_condition(&query);
        assert_eq!(expr.expression, "#pk = :pk AND #sk BETWEEN :sk_low AND :sk_high");
        assert_eq!(expr.values.len(), 3);
    }

    #[test]
    fn test_scan_filter() {
        assert!(scan_filter(&ScanFilter::default()).is_none());
        let filter = ScanFilter::default()
            .entity_type(crate::db::keys::EntityKind::Team)
            .contains("name_search", "ott");
        let expr = scan_filter(&filter).unwrap();
        assert_eq!(expr.expression, "#et = :et AND contains(#attr, :needle)");
        assert_eq!(
            expr.values.get(":et"),
            Some(&AttributeValue::S("TEAM".to_string()))
        );
    }
}
