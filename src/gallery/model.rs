use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Server-assigned identifier.
///
/// Backends hand out either numbers or strings. Both are accepted, and ids
/// that round-trip through `u64` are written back as JSON numbers so query
/// parameters and request bodies match what the server stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn as_number(&self) -> Option<u64> {
        self.0
            .parse::<u64>()
            .ok()
            .filter(|n| n.to_string() == self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<u64> for EntityId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl FromStr for EntityId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_number() {
            Some(n) => serializer.serialize_u64(n),
            None => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Unsigned(u64),
            Signed(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Unsigned(n) => Self(n.to_string()),
            Raw::Signed(n) => Self(n.to_string()),
            Raw::Text(s) => Self(s),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: EntityId,
    pub user_id: EntityId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: EntityId,
    pub album_id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// Reference to any entity by id alone.
///
/// Enough for removals and for scoping a fetch when the full owning entity
/// is not at hand (the CLI only knows ids).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
}

impl NewUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn random() -> Self {
        Self::new(random_full_name(&mut rand::thread_rng()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAlbum {
    pub user_id: EntityId,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPhoto {
    pub album_id: EntityId,
    pub title: String,
    pub url: String,
}

const FIRST_NAMES: &[&str] = &[
    "Ann", "Bo", "Cleo", "Dmitri", "Esme", "Farid", "Greta", "Hiro", "Ines", "Jonah", "Kaia",
    "Luca", "Mina", "Nils", "Odile", "Priya",
];

const LAST_NAMES: &[&str] = &[
    "Abbott", "Baptiste", "Castro", "Dunmore", "Eriksen", "Fontaine", "Garza", "Holm", "Ibarra",
    "Jansen", "Kowalski", "Lindqvist", "Moreau", "Nakamura",
];

const ADJECTIVES: &[&str] = &[
    "Rustic", "Sleek", "Handcrafted", "Ergonomic", "Refined", "Gorgeous", "Tasty", "Practical",
    "Intelligent", "Licensed", "Small", "Fantastic",
];

const MATERIALS: &[&str] = &[
    "Granite", "Cotton", "Bronze", "Wooden", "Frozen", "Steel", "Plastic", "Concrete", "Rubber",
    "Soft",
];

const PRODUCTS: &[&str] = &[
    "Chair", "Gloves", "Bike", "Table", "Lamp", "Keyboard", "Towels", "Shoes", "Cheese", "Hat",
    "Sausages", "Pizza",
];

fn pick<'a, R: Rng>(rng: &mut R, words: &'a [&'a str]) -> &'a str {
    words.choose(rng).copied().unwrap_or_default()
}

pub(crate) fn random_full_name<R: Rng>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
}

pub(crate) fn random_title<R: Rng>(rng: &mut R) -> String {
    format!(
        "{} {} {}",
        pick(rng, ADJECTIVES),
        pick(rng, MATERIALS),
        pick(rng, PRODUCTS)
    )
}

/// Placeholder image URL under a random seed.
pub(crate) fn random_image_url<R: Rng>(rng: &mut R) -> String {
    format!(
        "https://picsum.photos/seed/{}/150/150",
        rng.gen_range(1..100_000u32)
    )
}
