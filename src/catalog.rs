//! Detectable games catalog.
//!
//! This module provides:
//!
//! - `GameRecord` and `Executable`: Deserialized catalog entries
//! - `is_valid_game_list`: Structural check applied to untrusted mirror payloads
//! - Parsing of the bundled catalog
//! - Lookups used for process detection (by executable name, by name/alias)
//!
//! Mirrors serve executables as objects (`{"name", "os", "is_launcher"}`), while
//! hand-written lists often use bare file names. Both forms are accepted.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Keys the first entry of a payload must carry to be treated as a catalog
const REQUIRED_KEYS: [&str; 3] = ["aliases", "name", "executables"];

/// A game that can be detected from a running process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub aliases: Vec<String>,
    #[serde(default, deserialize_with = "known_executables")]
    pub executables: Vec<Executable>,
    /// Application id from the upstream catalog, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// An executable entry, either a bare file name or the mirror's object form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Executable {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        os: Option<String>,
        #[serde(default)]
        is_launcher: bool,
    },
}

impl Executable {
    /// File name (or relative path) of the executable
    pub fn name(&self) -> &str {
        match self {
            Executable::Name(name) => name,
            Executable::Detailed { name, .. } => name,
        }
    }

    /// Target OS, if the entry specifies one
    pub fn os(&self) -> Option<&str> {
        match self {
            Executable::Name(_) => None,
            Executable::Detailed { os, .. } => os.as_deref(),
        }
    }

    pub fn is_launcher(&self) -> bool {
        matches!(self, Executable::Detailed { is_launcher: true, .. })
    }
}

impl GameRecord {
    /// Check whether a process executable belongs to this game.
    ///
    /// Comparison is case-insensitive. Entries like `bin/game.exe` match a
    /// process reported as `game.exe` and the other way round.
    pub fn matches_executable(&self, exe: &str) -> bool {
        let wanted = file_component(exe).to_lowercase();
        if wanted.is_empty() {
            return false;
        }
        self.executables
            .iter()
            .any(|e| file_component(e.name()).to_lowercase() == wanted)
    }

    /// Check whether the name or any alias contains `query` (case-insensitive)
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.aliases.iter().any(|a| a.to_lowercase().contains(&query))
    }
}

/// `null` decodes like a missing field
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Executables that fit neither form are dropped instead of failing the game
fn known_executables<'de, D>(deserializer: D) -> Result<Vec<Executable>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Value> = null_as_empty(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|exe| serde_json::from_value(exe).ok())
        .collect())
}

/// Last path component, accepting both separator styles
fn file_component(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path).trim()
}

/// Structural check for an untrusted catalog payload.
///
/// True iff `data` is a non-empty array whose first element is an object
/// carrying `aliases`, `name` and `executables`. Only the first entry is
/// inspected.
pub fn is_valid_game_list(data: &Value) -> bool {
    let Some(first) = data.as_array().and_then(|list| list.first()) else {
        return false;
    };
    let Some(entry) = first.as_object() else {
        return false;
    };
    REQUIRED_KEYS.iter().all(|key| entry.contains_key(*key))
}

/// Parse a catalog from JSON text
pub fn parse_game_list(json: &str) -> Result<Vec<GameRecord>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Decode a payload entry by entry.
///
/// Entries that cannot be decoded are skipped and returned with their index,
/// so one bad record never costs the rest of the catalog.
pub fn decode_game_list(data: &Value) -> (Vec<GameRecord>, Vec<(usize, serde_json::Error)>) {
    let mut games = Vec::new();
    let mut skipped = Vec::new();

    for (index, entry) in data.as_array().into_iter().flatten().enumerate() {
        match GameRecord::deserialize(entry) {
            Ok(game) => games.push(game),
            Err(e) => skipped.push((index, e)),
        }
    }

    (games, skipped)
}

/// Find the game a process executable belongs to
pub fn find_by_executable<'a>(list: &'a [GameRecord], exe: &str) -> Option<&'a GameRecord> {
    list.iter().find(|game| game.matches_executable(exe))
}

/// Games whose name or alias contains `query`, in catalog order
pub fn search<'a>(list: &'a [GameRecord], query: &str) -> Vec<&'a GameRecord> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    list.iter().filter(|game| game.matches_query(query)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::app_data::bundled_gamelist_json;

    fn sample() -> Vec<GameRecord> {
        serde_json::from_value(json!([
            {
                "name": "Counter-Strike 2",
                "aliases": ["CS2"],
                "executables": [{ "name": "cs2.exe", "os": "win32", "is_launcher": false }]
            },
            {
                "name": "Minecraft",
                "aliases": [],
                "executables": ["bin/Minecraft.exe", "javaw.exe"]
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_is_valid_game_list() {
        assert!(!is_valid_game_list(&json!([])));
        assert!(is_valid_game_list(
            &json!([{ "name": "x", "aliases": [], "executables": [] }])
        ));
        assert!(!is_valid_game_list(&json!([{ "name": "x" }])));
    }

    #[test]
    fn test_is_valid_game_list_rejects_non_arrays() {
        assert!(!is_valid_game_list(&json!({ "name": "x", "aliases": [], "executables": [] })));
        assert!(!is_valid_game_list(&json!(null)));
        assert!(!is_valid_game_list(&json!("[]")));
        assert!(!is_valid_game_list(&json!([null])));
        assert!(!is_valid_game_list(&json!([42])));
    }

    #[test]
    fn test_is_valid_game_list_only_checks_first_entry() {
        let data = json!([
            { "name": "x", "aliases": [], "executables": [] },
            { "unrelated": true }
        ]);
        assert!(is_valid_game_list(&data));
    }

    #[test]
    fn test_executable_forms() {
        let games = sample();
        let cs = &games[0].executables[0];
        assert_eq!(cs.name(), "cs2.exe");
        assert_eq!(cs.os(), Some("win32"));
        assert!(!cs.is_launcher());

        let mc = &games[1].executables[1];
        assert_eq!(mc, &Executable::Name("javaw.exe".to_string()));
        assert_eq!(mc.os(), None);
    }

    #[test]
    fn test_find_by_executable() {
        let games = sample();
        assert_eq!(
            find_by_executable(&games, "CS2.EXE").map(|g| g.name.as_str()),
            Some("Counter-Strike 2")
        );
        assert_eq!(
            find_by_executable(&games, r"C:\Games\Minecraft\minecraft.exe").map(|g| g.name.as_str()),
            Some("Minecraft")
        );
        assert!(find_by_executable(&games, "notepad.exe").is_none());
        assert!(find_by_executable(&games, "").is_none());
    }

    #[test]
    fn test_search_by_name_and_alias() {
        let games = sample();
        let hits: Vec<_> = search(&games, "cs2").iter().map(|g| g.name.clone()).collect();
        assert_eq!(hits, vec!["Counter-Strike 2"]);

        let hits = search(&games, "mine");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Minecraft");

        assert!(search(&games, "   ").is_empty());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let games = parse_game_list(r#"[{"name": "Solo"}]"#).unwrap();
        assert_eq!(games[0].name, "Solo");
        assert!(games[0].aliases.is_empty());
        assert!(games[0].executables.is_empty());
        assert!(games[0].id.is_none());
    }

    #[test]
    fn test_null_lists_decode_as_empty() {
        let games = parse_game_list(r#"[{"name": "Beta", "aliases": null, "executables": null}]"#)
            .unwrap();
        assert!(games[0].aliases.is_empty());
        assert!(games[0].executables.is_empty());
    }

    #[test]
    fn test_unknown_executable_shapes_are_dropped() {
        let games = parse_game_list(
            r#"[{"name": "Gamma", "executables": [{"os": "win32"}, 7, "gamma.exe"]}]"#,
        )
        .unwrap();
        assert_eq!(games[0].executables, vec![Executable::Name("gamma.exe".to_string())]);
    }

    #[test]
    fn test_decode_game_list_skips_bad_entries() {
        let data = json!([
            { "name": "Alpha", "aliases": [], "executables": [] },
            { "aliases": ["no name"] },
            { "name": "Beta", "aliases": null, "executables": [] },
            "stray",
            { "name": "Gamma", "aliases": "oops", "executables": [] }
        ]);

        let (games, skipped) = decode_game_list(&data);
        let names: Vec<_> = games.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
        let indexes: Vec<_> = skipped.iter().map(|(i, _)| *i).collect();
        assert_eq!(indexes, vec![1, 3, 4]);

        let (games, skipped) = decode_game_list(&json!({ "name": "x" }));
        assert!(games.is_empty());
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_bundled_catalog_is_valid() {
        let raw: Value = serde_json::from_str(bundled_gamelist_json()).unwrap();
        assert!(is_valid_game_list(&raw));

        let games = parse_game_list(bundled_gamelist_json()).unwrap();
        assert!(!games.is_empty());
        assert!(games.iter().all(|g| !g.name.is_empty()));
        assert!(find_by_executable(&games, "Terraria.exe").is_some());
    }
}
