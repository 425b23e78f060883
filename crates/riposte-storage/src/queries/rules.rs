// SPDX-FileCopyrightText: 2026 Riposte Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-reply rule CRUD.

use std::str::FromStr;

use chrono::Utc;
use rusqlite::params;

use riposte_core::types::{AccountId, Rule, RuleId, StopPolicy};
use riposte_core::RiposteError;

use crate::database::{map_tr_err, Database};
use crate::queries::{conversion_err, parse_timestamp};

const RULE_COLUMNS: &str = "id, account_id, name, priority, salience, enabled, matchers,
     conditions, actions, stop_policy, max_triggers, trigger_count, created_at, updated_at";

fn row_to_rule(row: &rusqlite::Row<'_>) -> Result<Rule, rusqlite::Error> {
    let matchers: String = row.get(6)?;
    let conditions: String = row.get(7)?;
    let actions: String = row.get(8)?;
    let stop_policy: String = row.get(9)?;
    let created_at: String = row.get(12)?;
    let updated_at: String = row.get(13)?;

    Ok(Rule {
        id: RuleId(row.get(0)?),
        account_id: AccountId(row.get(1)?),
        name: row.get(2)?,
        priority: row.get(3)?,
        salience: row.get(4)?,
        enabled: row.get(5)?,
        matchers: serde_json::from_str(&matchers).map_err(|e| conversion_err(6, e))?,
        conditions: serde_json::from_str(&conditions).map_err(|e| conversion_err(7, e))?,
        actions: serde_json::from_str(&actions).map_err(|e| conversion_err(8, e))?,
        stop_policy: StopPolicy::from_str(&stop_policy).map_err(|e| conversion_err(9, e))?,
        max_triggers: row.get(10)?,
        trigger_count: row.get(11)?,
        created_at: parse_timestamp(12, &created_at)?,
        updated_at: parse_timestamp(13, &updated_at)?,
    })
}

fn encode(rule: &Rule) -> Result<(String, String, String), RiposteError> {
    let err = |e: serde_json::Error| RiposteError::Storage {
        source: Box::new(e),
    };
    Ok((
        serde_json::to_string(&rule.matchers).map_err(err)?,
        serde_json::to_string(&rule.conditions).map_err(err)?,
        serde_json::to_string(&rule.actions).map_err(err)?,
    ))
}

/// Insert a new rule.
pub async fn insert_rule(db: &Database, rule: &Rule) -> Result<(), RiposteError> {
    let (matchers, conditions, actions) = encode(rule)?;
    let rule = rule.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO rules (id, account_id, name, priority, salience, enabled, matchers,
                     conditions, actions, stop_policy, max_triggers, trigger_count,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    rule.id.0,
                    rule.account_id.0,
                    rule.name,
                    rule.priority,
                    rule.salience,
                    rule.enabled,
                    matchers,
                    conditions,
                    actions,
                    rule.stop_policy.to_string(),
                    rule.max_triggers,
                    rule.trigger_count,
                    rule.created_at.to_rfc3339(),
                    rule.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a rule by id.
pub async fn get_rule(db: &Database, id: &RuleId) -> Result<Option<Rule>, RiposteError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {RULE_COLUMNS} FROM rules WHERE id = ?1"))?;
            let mut rows = stmt.query_map(params![id], row_to_rule)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// All enabled rules for an account, in storage order.
pub async fn find_enabled_by_account(
    db: &Database,
    account_id: &AccountId,
) -> Result<Vec<Rule>, RiposteError> {
    let account_id = account_id.0.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RULE_COLUMNS} FROM rules
                 WHERE account_id = ?1 AND enabled = 1
                 ORDER BY priority DESC, salience DESC, id ASC"
            ))?;
            let rows = stmt.query_map(params![account_id], row_to_rule)?;
            let mut rules = Vec::new();
            for row in rows {
                rules.push(row?);
            }
            Ok(rules)
        })
        .await
        .map_err(map_tr_err)
}

/// Replace an existing rule's definition.
pub async fn update_rule(db: &Database, rule: &Rule) -> Result<(), RiposteError> {
    let (matchers, conditions, actions) = encode(rule)?;
    let rule = rule.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE rules SET name = ?2, priority = ?3, salience = ?4, enabled = ?5,
                     matchers = ?6, conditions = ?7, actions = ?8, stop_policy = ?9,
                     max_triggers = ?10, trigger_count = ?11, updated_at = ?12
                 WHERE id = ?1",
                params![
                    rule.id.0,
                    rule.name,
                    rule.priority,
                    rule.salience,
                    rule.enabled,
                    matchers,
                    conditions,
                    actions,
                    rule.stop_policy.to_string(),
                    rule.max_triggers,
                    rule.trigger_count,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a rule. Returns `true` if a row was removed.
pub async fn delete_rule(db: &Database, id: &RuleId) -> Result<bool, RiposteError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            let removed = conn.execute("DELETE FROM rules WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Toggle a rule without touching its definition.
pub async fn set_enabled(db: &Database, id: &RuleId, enabled: bool) -> Result<(), RiposteError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE rules SET enabled = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, enabled, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Increment a rule's trigger count.
pub async fn record_trigger(db: &Database, id: &RuleId) -> Result<(), RiposteError> {
    let id = id.0.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE rules SET trigger_count = trigger_count + 1 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use riposte_config::StorageConfig;
    use riposte_core::types::{
        ActionKind, ActionSpec, ChatKind, ConditionSpec, MatcherKind, MatcherSpec,
    };
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("rules.db");
        let config = StorageConfig {
            database_path: db_path.to_str().unwrap().to_string(),
            wal_mode: true,
        };
        let db = Database::open(&config).await.unwrap();
        (db, dir)
    }

    fn make_rule(id: &str, priority: i32) -> Rule {
        let now = Utc::now();
        Rule {
            id: RuleId(id.to_string()),
            account_id: AccountId("a1".into()),
            name: format!("rule {id}"),
            priority,
            salience: 0,
            enabled: true,
            matchers: vec![MatcherSpec {
                kind: MatcherKind::Regex,
                pattern: r"order\s+\d+".into(),
                case_sensitive: false,
            }],
            conditions: vec![ConditionSpec::ChatKind {
                kind: ChatKind::Private,
            }],
            actions: vec![ActionSpec {
                kind: ActionKind::SendText,
                payload: "Hi {sender}".into(),
                delay_ms: Some(500),
                enabled: true,
            }],
            stop_policy: StopPolicy::First,
            max_triggers: Some(10),
            trigger_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_and_get_round_trips_json_columns() {
        let (db, _dir) = setup_db().await;
        let rule = make_rule("r1", 10);
        insert_rule(&db, &rule).await.unwrap();

        let loaded = get_rule(&db, &rule.id).await.unwrap().unwrap();
        assert_eq!(loaded.matchers, rule.matchers);
        assert_eq!(loaded.conditions, rule.conditions);
        assert_eq!(loaded.actions, rule.actions);
        assert_eq!(loaded.stop_policy, StopPolicy::First);
        assert_eq!(loaded.max_triggers, Some(10));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn find_enabled_skips_disabled_rules() {
        let (db, _dir) = setup_db().await;
        insert_rule(&db, &make_rule("on", 10)).await.unwrap();
        let mut off = make_rule("off", 20);
        off.enabled = false;
        insert_rule(&db, &off).await.unwrap();

        let rules = find_enabled_by_account(&db, &AccountId("a1".into()))
            .await
            .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id.0, "on");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_enabled_toggles() {
        let (db, _dir) = setup_db().await;
        let rule = make_rule("r1", 10);
        insert_rule(&db, &rule).await.unwrap();

        set_enabled(&db, &rule.id, false).await.unwrap();
        let loaded = get_rule(&db, &rule.id).await.unwrap().unwrap();
        assert!(!loaded.enabled);

        set_enabled(&db, &rule.id, true).await.unwrap();
        let loaded = get_rule(&db, &rule.id).await.unwrap().unwrap();
        assert!(loaded.enabled);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn record_trigger_increments() {
        let (db, _dir) = setup_db().await;
        let rule = make_rule("r1", 10);
        insert_rule(&db, &rule).await.unwrap();

        record_trigger(&db, &rule.id).await.unwrap();
        record_trigger(&db, &rule.id).await.unwrap();

        let loaded = get_rule(&db, &rule.id).await.unwrap().unwrap();
        assert_eq!(loaded.trigger_count, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_rule_reports_removal() {
        let (db, _dir) = setup_db().await;
        let rule = make_rule("r1", 10);
        insert_rule(&db, &rule).await.unwrap();

        assert!(delete_rule(&db, &rule.id).await.unwrap());
        assert!(!delete_rule(&db, &rule.id).await.unwrap());

        db.close().await.unwrap();
    }
}
