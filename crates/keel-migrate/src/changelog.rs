//! The changelog model: an ordered list of change sets read from JSON.
//!
//! A changelog file looks like this:
//!
//! ```json
//! {
//!   "databaseChangeLog": [
//!     {
//!       "changeSet": {
//!         "id": "1",
//!         "author": "alice",
//!         "changes": [
//!           { "change": "createTable", "tableName": "users", "columns": [] }
//!         ]
//!       }
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use keel_core::change::Change;
use keel_core::changelog::GeneratedChangeSet;
use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

fn is_false(value: &bool) -> bool {
    !*value
}

/// A unit of change tracked as one row in the history table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    /// Identifier, unique together with author and filename.
    pub id: String,
    /// Author of the change set.
    pub author: String,
    /// Changelog file the change set belongs to. Filled from the file path
    /// when omitted.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,
    /// Free-form comment stored in the history table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Changes applied in order.
    pub changes: Vec<Change>,
    /// Explicit rollback changes. When empty, the changes are reversed
    /// automatically.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rollback: Vec<Change>,
    /// Run on every update, even if already ran.
    #[serde(default, skip_serializing_if = "is_false")]
    pub run_always: bool,
    /// Re-run when the checksum changes instead of failing.
    #[serde(default, skip_serializing_if = "is_false")]
    pub run_on_change: bool,
    /// Contexts the change set runs in. Empty means every context.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<String>,
}

impl ChangeSet {
    /// Creates an empty change set.
    pub fn new(id: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            filename: String::new(),
            comment: None,
            changes: Vec::new(),
            rollback: Vec::new(),
            run_always: false,
            run_on_change: false,
            contexts: Vec::new(),
        }
    }

    /// Adds a change.
    #[must_use]
    pub fn change(mut self, change: Change) -> Self {
        self.changes.push(change);
        self
    }

    /// Adds an explicit rollback change.
    #[must_use]
    pub fn rollback(mut self, change: Change) -> Self {
        self.rollback.push(change);
        self
    }

    /// Sets the changelog file name.
    #[must_use]
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Sets the comment.
    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Marks the change set to run on every update.
    #[must_use]
    pub const fn run_always(mut self) -> Self {
        self.run_always = true;
        self
    }

    /// Marks the change set to re-run when edited.
    #[must_use]
    pub const fn run_on_change(mut self) -> Self {
        self.run_on_change = true;
        self
    }

    /// Restricts the change set to a context.
    #[must_use]
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.contexts.push(context.into());
        self
    }

    /// Returns the `filename::id::author` identity.
    #[must_use]
    pub fn identity(&self) -> String {
        format!("{}::{}::{}", self.filename, self.id, self.author)
    }

    /// Returns `true` if this change set is the one recorded under the
    /// given history key.
    #[must_use]
    pub fn is(&self, id: &str, author: &str, filename: &str) -> bool {
        self.id == id && self.author == author && self.filename == filename
    }

    /// Computes the `8:<md5>` checksum of the changes.
    ///
    /// Editing any change alters the checksum. Comments, contexts and the
    /// rollback block do not take part.
    ///
    /// # Errors
    ///
    /// Returns an error if the changes cannot be serialized.
    pub fn checksum(&self) -> Result<String> {
        let canonical = serde_json::to_vec(&self.changes)?;
        Ok(format!("8:{:x}", md5::compute(canonical)))
    }

    /// Describes the changes, separated by `; `.
    #[must_use]
    pub fn description(&self) -> String {
        self.changes
            .iter()
            .map(Change::description)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Returns `true` if the change set runs under the active contexts.
    #[must_use]
    pub fn matches_contexts(&self, active: &[String]) -> bool {
        active.is_empty()
            || self.contexts.is_empty()
            || self
                .contexts
                .iter()
                .any(|c| active.iter().any(|a| a.eq_ignore_ascii_case(c)))
    }

    /// Returns the changes that undo this change set, in execution order.
    ///
    /// An explicit rollback block wins. Otherwise every change is reversed,
    /// last change first; `None` if any of them cannot be.
    #[must_use]
    pub fn rollback_changes(&self) -> Option<Vec<Change>> {
        if !self.rollback.is_empty() {
            return Some(self.rollback.clone());
        }
        let mut reversed = Vec::new();
        for change in self.changes.iter().rev() {
            reversed.extend(change.reverse()?);
        }
        Some(reversed)
    }

    /// Returns the tag set by a `tagDatabase` change, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.changes.iter().rev().find_map(|change| match change {
            Change::TagDatabase { tag } => Some(tag.as_str()),
            _ => None,
        })
    }
}

impl From<GeneratedChangeSet> for ChangeSet {
    fn from(generated: GeneratedChangeSet) -> Self {
        Self {
            changes: generated.changes,
            ..Self::new(generated.id, generated.author)
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeLogFile {
    database_change_log: Vec<ChangeLogEntry>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeLogEntry {
    change_set: ChangeSet,
}

/// An ordered list of change sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseChangeLog {
    /// Change sets in execution order.
    pub change_sets: Vec<ChangeSet>,
}

impl DatabaseChangeLog {
    /// Creates a changelog.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::DuplicateChangeSet`] if two change sets
    /// share an identity.
    pub fn new(change_sets: Vec<ChangeSet>) -> Result<Self> {
        let changelog = Self { change_sets };
        changelog.check_unique()?;
        Ok(changelog)
    }

    /// Reads a changelog file. Change sets without a filename get the
    /// path as given.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or holds
    /// duplicate change sets.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, &path.display().to_string()).map_err(|e| match e {
            MigrateError::Serialization(e) => MigrateError::ParseError {
                path: PathBuf::from(path),
                message: e.to_string(),
            },
            other => other,
        })
    }

    /// Parses changelog JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or holds duplicate change
    /// sets.
    pub fn parse(json: &str, filename: &str) -> Result<Self> {
        let file: ChangeLogFile = serde_json::from_str(json)?;
        let change_sets = file
            .database_change_log
            .into_iter()
            .map(|entry| {
                let mut change_set = entry.change_set;
                if change_set.filename.is_empty() {
                    change_set.filename = filename.to_string();
                }
                change_set
            })
            .collect();
        Self::new(change_sets)
    }

    /// Serializes the changelog to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let file = ChangeLogFile {
            database_change_log: self
                .change_sets
                .iter()
                .cloned()
                .map(|change_set| ChangeLogEntry { change_set })
                .collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Finds a change set by its history key.
    #[must_use]
    pub fn find(&self, id: &str, author: &str, filename: &str) -> Option<&ChangeSet> {
        self.change_sets
            .iter()
            .find(|cs| cs.is(id, author, filename))
    }

    fn check_unique(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for change_set in &self.change_sets {
            let key = (
                change_set.id.as_str(),
                change_set.author.as_str(),
                change_set.filename.as_str(),
            );
            if !seen.insert(key) {
                return Err(MigrateError::DuplicateChangeSet {
                    id: change_set.id.clone(),
                    author: change_set.author.clone(),
                    filename: change_set.filename.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::change::ColumnConfig;
    use keel_core::DataType;

    const CHANGELOG: &str = r#"{
        "databaseChangeLog": [
            {
                "changeSet": {
                    "id": "1",
                    "author": "alice",
                    "comment": "users table",
                    "changes": [
                        {
                            "change": "createTable",
                            "tableName": "users",
                            "columns": [
                                { "name": "id", "type": "INT", "primaryKey": true, "nullable": false },
                                { "name": "email", "type": "VARCHAR(255)" }
                            ]
                        }
                    ]
                }
            },
            {
                "changeSet": {
                    "id": "2",
                    "author": "alice",
                    "runOnChange": true,
                    "contexts": ["test"],
                    "changes": [
                        { "change": "sql", "sql": "INSERT INTO users (id) VALUES (1)" }
                    ],
                    "rollback": [
                        { "change": "sql", "sql": "DELETE FROM users WHERE id = 1" }
                    ]
                }
            }
        ]
    }"#;

    fn create_users() -> Change {
        Change::CreateTable {
            schema_name: None,
            table_name: "users".to_string(),
            columns: vec![
                ColumnConfig::new("id", DataType::Int).primary_key(),
                ColumnConfig::new("email", DataType::Varchar(Some(255))),
            ],
            tablespace: None,
            remarks: None,
        }
    }

    #[test]
    fn test_parse_fills_filename() {
        let changelog = DatabaseChangeLog::parse(CHANGELOG, "db/changelog.json").unwrap();
        assert_eq!(changelog.change_sets.len(), 2);

        let first = &changelog.change_sets[0];
        assert_eq!(first.identity(), "db/changelog.json::1::alice");
        assert_eq!(first.comment.as_deref(), Some("users table"));
        assert_eq!(first.changes, vec![create_users()]);

        let second = &changelog.change_sets[1];
        assert!(second.run_on_change);
        assert!(!second.run_always);
        assert_eq!(second.contexts, vec!["test".to_string()]);
        assert_eq!(second.rollback.len(), 1);
    }

    #[test]
    fn test_duplicate_change_sets_are_rejected() {
        let result = DatabaseChangeLog::new(vec![
            ChangeSet::new("1", "alice").filename("a.json"),
            ChangeSet::new("1", "bob").filename("a.json"),
            ChangeSet::new("1", "alice").filename("a.json"),
        ]);
        match result {
            Err(MigrateError::DuplicateChangeSet { id, author, .. }) => {
                assert_eq!(id, "1");
                assert_eq!(author, "alice");
            }
            other => panic!("expected a duplicate error, got {other:?}"),
        }
    }

    #[test]
    fn test_same_id_in_other_file_is_allowed() {
        let changelog = DatabaseChangeLog::new(vec![
            ChangeSet::new("1", "alice").filename("a.json"),
            ChangeSet::new("1", "alice").filename("b.json"),
        ]);
        assert!(changelog.is_ok());
    }

    #[test]
    fn test_checksum_tracks_changes_only() {
        let base = ChangeSet::new("1", "alice").change(create_users());
        let checksum = base.checksum().unwrap();
        assert!(checksum.starts_with("8:"));
        assert_eq!(checksum.len(), 34);

        let commented = base.clone().comment("ignored").context("prod");
        assert_eq!(commented.checksum().unwrap(), checksum);

        let edited = base.change(Change::TagDatabase {
            tag: "v1".to_string(),
        });
        assert_ne!(edited.checksum().unwrap(), checksum);
    }

    #[test]
    fn test_description_joins_changes() {
        let change_set = ChangeSet::new("1", "alice")
            .change(create_users())
            .change(Change::TagDatabase {
                tag: "v1".to_string(),
            });
        assert_eq!(
            change_set.description(),
            format!("{}; Tag database 'v1'", create_users().description())
        );
        assert_eq!(change_set.tag(), Some("v1"));
    }

    #[test]
    fn test_rollback_reverses_changes_last_first() {
        let change_set = ChangeSet::new("1", "alice")
            .change(create_users())
            .change(Change::RenameTable {
                schema_name: None,
                old_table_name: "users".to_string(),
                new_table_name: "members".to_string(),
            });

        let names: Vec<&str> = change_set
            .rollback_changes()
            .unwrap()
            .iter()
            .map(Change::name)
            .collect();
        assert_eq!(names, vec!["renameTable", "dropTable"]);
    }

    #[test]
    fn test_explicit_rollback_wins_and_raw_sql_is_irreversible() {
        let raw = Change::Sql {
            sql: "UPDATE users SET email = NULL".to_string(),
            end_delimiter: None,
        };
        let change_set = ChangeSet::new("1", "alice").change(raw.clone());
        assert!(change_set.rollback_changes().is_none());

        let undo = Change::Sql {
            sql: "SELECT 1".to_string(),
            end_delimiter: None,
        };
        let change_set = change_set.rollback(undo.clone());
        assert_eq!(change_set.rollback_changes(), Some(vec![undo]));
    }

    #[test]
    fn test_contexts() {
        let active = vec!["TEST".to_string()];
        assert!(ChangeSet::new("1", "a").matches_contexts(&active));
        assert!(ChangeSet::new("1", "a").context("test").matches_contexts(&active));
        assert!(!ChangeSet::new("1", "a").context("prod").matches_contexts(&active));
        assert!(ChangeSet::new("1", "a").context("prod").matches_contexts(&[]));
    }

    #[test]
    fn test_json_round_trip_keeps_filename() {
        let changelog = DatabaseChangeLog::parse(CHANGELOG, "changelog.json").unwrap();
        let json = changelog.to_json().unwrap();
        let reparsed = DatabaseChangeLog::parse(&json, "other.json").unwrap();
        assert_eq!(reparsed, changelog);
    }
}
