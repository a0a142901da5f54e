//! Player identity resolution
//!
//! Turns a bookmaker display name into a canonical key so that name
//! variants ("Ronald Acuña Jr.", "Ronald Acuna") share one stats lookup.
//! Aggregation itself stays keyed by the exact display name.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

static SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+(jr|sr|ii|iii|iv)$").expect("valid suffix regex"));

/// Canonical identity of a player name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PlayerKey(String);

impl PlayerKey {
    /// Normalize a display name.
    ///
    /// Rules applied:
    /// 1. Lowercase and fold common Latin accents
    /// 2. Drop periods and apostrophes, hyphens become spaces
    /// 3. Collapse whitespace
    /// 4. Strip a trailing generational suffix
    pub fn from_display_name(name: &str) -> Self {
        let folded: String = name
            .chars()
            .flat_map(char::to_lowercase)
            .filter_map(|c| match c {
                '.' | '\'' | '\u{2019}' => None,
                '-' | '_' => Some(' '),
                c => Some(fold_accent(c)),
            })
            .collect();

        let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
        let stripped = SUFFIX.replace(&collapsed, "");

        PlayerKey(stripped.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' | 'ø' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'ý' | 'ÿ' => 'y',
        c => c,
    }
}
