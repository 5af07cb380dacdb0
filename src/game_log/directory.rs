//! Player identity resolution and name autocomplete.
//!
//! Well-known players carry a pre-resolved provider identifier so the live
//! provider can skip its search round-trip. The roster is the set of names
//! offered by autocomplete.

use std::collections::HashMap;

/// Name → provider identifier for frequently queried players.
const KNOWN_IDS: &[(&str, &str)] = &[
    ("LeBron James", "jamesle01"),
    ("Stephen Curry", "curryst01"),
    ("Kevin Durant", "duranke01"),
    ("Giannis Antetokounmpo", "antetgi01"),
    ("Luka Doncic", "doncilu01"),
    ("Nikola Jokic", "jokicni01"),
    ("Joel Embiid", "embiijo01"),
    ("Jayson Tatum", "tatumja01"),
    ("Damian Lillard", "lillada01"),
    ("Anthony Davis", "davisan02"),
    ("Kawhi Leonard", "leonaka01"),
    ("James Harden", "hardeja01"),
    ("Russell Westbrook", "westbru01"),
    ("Paul George", "georgpa01"),
    ("Jimmy Butler", "butleji01"),
    ("Devin Booker", "bookede01"),
    ("Kyrie Irving", "irvinky01"),
    ("Klay Thompson", "thompkl01"),
    ("Draymond Green", "greendr01"),
    ("Anthony Edwards", "edwaran01"),
];

/// Additional autocomplete names without a pre-resolved identifier.
const EXTRA_ROSTER: &[&str] = &[
    "Ja Morant",
    "Trae Young",
    "Donovan Mitchell",
    "Bam Adebayo",
    "Tyrese Haliburton",
    "De'Aaron Fox",
    "Shai Gilgeous-Alexander",
    "Karl-Anthony Towns",
    "Zion Williamson",
    "Brandon Ingram",
    "Pascal Siakam",
    "Scottie Barnes",
    "Cade Cunningham",
    "LaMelo Ball",
    "Darius Garland",
    "Evan Mobley",
    "Jaren Jackson Jr",
    "Desmond Bane",
    "Tyler Herro",
    "Jalen Brunson",
    "Julius Randle",
    "RJ Barrett",
    "Mikal Bridges",
    "Deandre Ayton",
    "Chris Paul",
    "Bradley Beal",
    "Lauri Markkanen",
    "Paolo Banchero",
    "Franz Wagner",
    "Victor Wembanyama",
];

pub const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct PlayerDirectory {
    /// lowercase name → provider identifier
    ids: HashMap<String, String>,
    roster: Vec<String>,
}

impl Default for PlayerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerDirectory {
    pub fn new() -> Self {
        let ids = KNOWN_IDS
            .iter()
            .map(|(name, id)| (name.to_lowercase(), id.to_string()))
            .collect();
        let roster = KNOWN_IDS
            .iter()
            .map(|(name, _)| *name)
            .chain(EXTRA_ROSTER.iter().copied())
            .map(str::to_string)
            .collect();
        PlayerDirectory { ids, roster }
    }

    /// Pre-resolved provider identifier for `name`, if one is known.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.ids.get(&name.trim().to_lowercase()).map(String::as_str)
    }

    /// Case-insensitive substring search for autocomplete.
    ///
    /// Names starting with the query rank first, then by match position,
    /// then alphabetically.
    pub fn search(&self, query: &str, limit: usize) -> Vec<String> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return vec![];
        }

        let mut matches: Vec<(bool, usize, &String)> = self
            .roster
            .iter()
            .filter_map(|name| {
                let pos = name.to_lowercase().find(&q)?;
                Some((pos != 0, pos, name))
            })
            .collect();
        matches.sort();

        matches
            .into_iter()
            .take(limit)
            .map(|(_, _, name)| name.clone())
            .collect()
    }

    pub fn all_sorted(&self) -> Vec<String> {
        let mut names = self.roster.clone();
        names.sort();
        names
    }
}
