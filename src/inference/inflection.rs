//! Table-name inflection.
//!
//! Relationship names are derived from table names, which are usually
//! compound identifiers (`order_lines`, `OrderLines`). Only the last word is
//! inflected; the rest of the identifier and the capitalisation of the last
//! word are kept. Irregular nouns common in schemas are handled before
//! falling back to the `inflector` rules.

use inflector::Inflector;

/// (singular, plural) pairs the `inflector` rules get wrong or ambiguous.
static IRREGULAR_NOUNS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("leaf", "leaves"),
    ("life", "lives"),
    ("knife", "knives"),
    ("wife", "wives"),
    ("half", "halves"),
    ("shelf", "shelves"),
    ("hero", "heroes"),
    ("analysis", "analyses"),
    ("base", "bases"),
    ("crisis", "crises"),
    ("thesis", "theses"),
    ("criterion", "criteria"),
    ("phenomenon", "phenomena"),
    ("datum", "data"),
    ("medium", "media"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
];

/// Words whose singular and plural are the same.
static INVARIANT_NOUNS: &[&str] = &[
    "equipment",
    "information",
    "metadata",
    "news",
    "series",
    "sheep",
    "species",
    "status",
];

/// Singular form of an identifier's last word (`order_lines` → `order_line`).
pub fn singular_name(identifier: &str) -> String {
    inflect_last_word(identifier, singularize)
}

/// Plural form of an identifier's last word (`order_line` → `order_lines`).
pub fn plural_name(identifier: &str) -> String {
    inflect_last_word(identifier, pluralize)
}

/// Singularize one lowercase word.
pub fn singularize(word: &str) -> String {
    if word.is_empty() || INVARIANT_NOUNS.contains(&word) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR_NOUNS {
        if word == *plural || word == *singular {
            return singular.to_string();
        }
    }
    word.to_singular()
}

/// Pluralize one lowercase word.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() || INVARIANT_NOUNS.contains(&word) {
        return word.to_string();
    }
    for (singular, plural) in IRREGULAR_NOUNS {
        if word == *singular || word == *plural {
            return plural.to_string();
        }
    }
    word.to_plural()
}

fn inflect_last_word(identifier: &str, inflect: fn(&str) -> String) -> String {
    let (head, word) = split_last_word(identifier);
    if word.is_empty() {
        return identifier.to_string();
    }

    let lower = word.to_lowercase();
    let mut inflected = inflect(&lower);
    if inflected.is_empty() {
        return identifier.to_string();
    }

    if word.chars().all(|c| !c.is_lowercase()) && word.chars().any(char::is_alphabetic) {
        inflected = inflected.to_uppercase();
    } else if word.starts_with(char::is_uppercase) {
        inflected = capitalize(&inflected);
    }
    format!("{}{}", head, inflected)
}

/// Split `order_lines` into (`order_`, `lines`) and `OrderLines` into
/// (`Order`, `Lines`).
fn split_last_word(identifier: &str) -> (&str, &str) {
    let underscore = identifier.rfind(['_', ' ', '-']).map(|i| i + 1);

    let mut boundary = None;
    let chars: Vec<(usize, char)> = identifier.char_indices().collect();
    for window in chars.windows(2) {
        let (_, prev) = window[0];
        let (idx, c) = window[1];
        if c.is_uppercase() && prev.is_lowercase() {
            boundary = Some(idx);
        }
    }

    let start = match (underscore, boundary) {
        (Some(u), Some(b)) => u.max(b),
        (Some(u), None) => u,
        (None, Some(b)) => b,
        (None, None) => 0,
    };
    identifier.split_at(start)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
