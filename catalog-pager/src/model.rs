//! Wire types of the remote collection service.
//!
//! Field names follow the service's JSON (with `feature = "serde"`). Optional fields default
//! to empty values so partially populated payloads still deserialize.

/// A named reference to another resource, e.g. `{ "name": "bulbasaur", "url": ".../1/" }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NamedResource {
    pub name: String,
    pub url: String,
}

/// A catalog entry as listed by the collection endpoints.
pub type CatalogItem = NamedResource;

impl NamedResource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Catalog identity: the trailing numeric path segment of the locator.
    pub fn catalog_id(&self) -> Option<u32> {
        catalog_id(&self.url)
    }
}

/// Parses the trailing numeric segment of a resource locator (`".../pokemon/25/"` → `25`).
///
/// Returns `None` when the last non-empty segment is not a number.
pub fn catalog_id(url: &str) -> Option<u32> {
    url.split('/')
        .filter(|segment| !segment.is_empty())
        .next_back()?
        .parse()
        .ok()
}

/// One page of the unfiltered collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CollectionPage {
    pub count: usize,
    /// Continuation marker; absent on the last page.
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<CatalogItem>,
}

/// Everything in one category, fetched in bulk.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CategoryCollection {
    pub id: u32,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "pokemon"))]
    pub members: Vec<CategoryMember>,
}

impl CategoryCollection {
    pub fn items(&self) -> Vec<CatalogItem> {
        self.members.iter().map(|m| m.item.clone()).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CategoryMember {
    #[cfg_attr(feature = "serde", serde(rename = "pokemon"))]
    pub item: CatalogItem,
    pub slot: u32,
}

/// A single catalog entity as shown by the detail view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Entity {
    pub id: u32,
    pub name: String,
    pub height: u32,
    pub weight: u32,
    pub types: Vec<TypeSlot>,
    pub species: NamedResource,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TypeSlot {
    pub slot: u32,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: NamedResource,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ResourceLink {
    pub url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Species {
    pub id: u32,
    pub name: String,
    pub evolution_chain: Option<ResourceLink>,
    pub flavor_text_entries: Vec<FlavorText>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FlavorText {
    pub flavor_text: String,
    pub language: NamedResource,
}

impl Species {
    /// Id of the evolution chain this species belongs to.
    pub fn evolution_chain_id(&self) -> Option<u32> {
        self.evolution_chain
            .as_ref()
            .and_then(|link| catalog_id(&link.url))
    }

    /// The first English flavor text with form feeds flattened to spaces, or `"N/A"`.
    pub fn english_flavor_text(&self) -> String {
        self.flavor_text_entries
            .iter()
            .find(|entry| entry.language.name == "en")
            .map(|entry| entry.flavor_text.replace('\u{c}', " "))
            .unwrap_or_else(|| "N/A".to_owned())
    }
}

/// Root of an evolution relationship tree.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EvolutionChain {
    pub id: u32,
    pub chain: ChainLink,
}

/// One node of the evolution tree.
///
/// `evolution_details` describes the edge from the parent to this node; it is empty on the
/// root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChainLink {
    pub is_baby: bool,
    pub species: NamedResource,
    pub evolution_details: Vec<EvolutionDetail>,
    pub evolves_to: Vec<ChainLink>,
}

impl ChainLink {
    pub fn new(species: NamedResource) -> Self {
        Self {
            species,
            ..Self::default()
        }
    }

    pub fn with_detail(mut self, detail: EvolutionDetail) -> Self {
        self.evolution_details.push(detail);
        self
    }

    pub fn with_child(mut self, child: ChainLink) -> Self {
        self.evolves_to.push(child);
        self
    }
}

/// Conditions attached to one evolution edge. Every field is optional on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EvolutionDetail {
    /// `1` = female, `2` = male.
    pub gender: Option<u8>,
    pub held_item: Option<NamedResource>,
    pub item: Option<NamedResource>,
    pub known_move: Option<NamedResource>,
    pub known_move_type: Option<NamedResource>,
    pub location: Option<NamedResource>,
    pub min_affection: Option<u32>,
    pub min_beauty: Option<u32>,
    pub min_happiness: Option<u32>,
    pub min_level: Option<u32>,
    pub needs_overworld_rain: bool,
    pub party_species: Option<NamedResource>,
    pub party_type: Option<NamedResource>,
    /// Sign of `attack - defense` required: `1`, `-1` or `0`.
    pub relative_physical_stats: Option<i32>,
    /// `None` or empty when unrestricted.
    pub time_of_day: Option<String>,
    pub trade_species: Option<NamedResource>,
    pub trigger: Option<NamedResource>,
    pub turn_upside_down: bool,
}
