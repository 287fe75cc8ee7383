//! Linearization of an evolution tree into the left-to-right display sequence.
//!
//! The traversal is a pre-order walk over an explicit stack, so arbitrarily deep chains do not
//! grow the call stack. Children keep their source order; the output is deterministic for a
//! given tree.

use core::fmt;

use crate::model::{ChainLink, EvolutionChain, EvolutionDetail, NamedResource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Gender {
    Female,
    Male,
}

/// Required relation between the attack and defense stats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatComparison {
    AttackGreater,
    AttackLess,
    Equal,
}

/// One structured condition on an evolution edge.
///
/// `Display` renders the human-readable phrase used in [`ChainStep::special`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EvolutionCondition {
    MinLevel(u32),
    UseItem(String),
    Trade { for_species: Option<String> },
    HeldItem(String),
    KnownMove(String),
    KnownMoveType(String),
    Location(String),
    TimeOfDay(String),
    MinHappiness(u32),
    MinBeauty(u32),
    MinAffection(u32),
    OverworldRain,
    RelativePhysicalStats(StatComparison),
    TurnUpsideDown,
    Gender(Gender),
    /// Fallback when the edge names a trigger but no other condition.
    Trigger(String),
}

impl fmt::Display for EvolutionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinLevel(level) => write!(f, "Lv. {level}"),
            Self::UseItem(item) => write!(f, "Use {}", humanize(item)),
            Self::Trade {
                for_species: Some(species),
            } => write!(f, "Trade for {}", humanize(species)),
            Self::Trade { for_species: None } => f.write_str("Trade"),
            Self::HeldItem(item) => write!(f, "Hold {}", humanize(item)),
            Self::KnownMove(name) => write!(f, "Know move {}", humanize(name)),
            Self::KnownMoveType(kind) => write!(f, "Know a {}-type move", humanize(kind)),
            Self::Location(place) => write!(f, "At {}", humanize(place)),
            Self::TimeOfDay(time) => write!(f, "During {}", humanize(time)),
            Self::MinHappiness(n) => write!(f, "High friendship ({n}+)"),
            Self::MinBeauty(n) => write!(f, "High beauty ({n}+)"),
            Self::MinAffection(n) => write!(f, "High affection ({n}+)"),
            Self::OverworldRain => f.write_str("While raining"),
            Self::RelativePhysicalStats(StatComparison::AttackGreater) => f.write_str("Atk > Def"),
            Self::RelativePhysicalStats(StatComparison::AttackLess) => f.write_str("Atk < Def"),
            Self::RelativePhysicalStats(StatComparison::Equal) => f.write_str("Atk = Def"),
            Self::TurnUpsideDown => f.write_str("Hold console upside down"),
            Self::Gender(Gender::Female) => f.write_str("Female-only"),
            Self::Gender(Gender::Male) => f.write_str("Male-only"),
            Self::Trigger(name) => f.write_str(&humanize(name)),
        }
    }
}

/// One entry of the flattened chain.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainStep {
    /// Catalog id parsed from the species locator.
    pub id: Option<u32>,
    pub name: String,
    /// Minimum level required to reach this step from its parent.
    pub level: Option<u32>,
    /// Joined human-readable conditions, set only when `level` is not.
    pub special: Option<String>,
    /// Every condition of the edge from the parent, in display order.
    pub conditions: Vec<EvolutionCondition>,
}

impl ChainStep {
    fn root(species: &NamedResource) -> Self {
        Self {
            id: species.catalog_id(),
            name: species.name.clone(),
            level: None,
            special: None,
            conditions: Vec::new(),
        }
    }

    fn reached_by(species: &NamedResource, detail: Option<&EvolutionDetail>) -> Self {
        let Some(detail) = detail else {
            return Self::root(species);
        };
        let conditions = conditions(detail);
        let level = detail.min_level;
        let special = match level {
            Some(_) => None,
            None => join(&conditions),
        };
        Self {
            id: species.catalog_id(),
            name: species.name.clone(),
            level,
            special,
            conditions,
        }
    }

    /// Label on the connector leading into this step: `"Lv. {level}"`, the special text, or
    /// nothing.
    pub fn edge_label(&self) -> Option<String> {
        match (self.level, &self.special) {
            (Some(level), _) => Some(format!("Lv. {level}")),
            (None, Some(special)) => Some(special.clone()),
            (None, None) => None,
        }
    }
}

/// Flattens the tree rooted at `root` into pre-order.
///
/// Only the first evolution detail of each edge is considered. The root never has a level or
/// special condition.
pub fn flatten(root: &ChainLink) -> Vec<ChainStep> {
    let mut out = Vec::new();
    let mut stack: Vec<(&ChainLink, Option<&EvolutionDetail>)> = vec![(root, None)];
    while let Some((node, edge)) = stack.pop() {
        out.push(ChainStep::reached_by(&node.species, edge));
        stack.extend(
            node.evolves_to
                .iter()
                .rev()
                .map(|child| (child, child.evolution_details.first())),
        );
    }
    out
}

impl EvolutionChain {
    pub fn steps(&self) -> Vec<ChainStep> {
        flatten(&self.chain)
    }
}

/// Connector labels between consecutive steps: entry `i` sits between `steps[i]` and
/// `steps[i + 1]`.
pub fn connector_labels(steps: &[ChainStep]) -> Vec<Option<String>> {
    steps.iter().skip(1).map(ChainStep::edge_label).collect()
}

/// Structured conditions of one edge, in display order.
pub fn conditions(detail: &EvolutionDetail) -> Vec<EvolutionCondition> {
    use EvolutionCondition as C;

    let named = |r: &Option<NamedResource>| {
        r.as_ref()
            .map(|r| r.name.clone())
            .filter(|name| !name.is_empty())
    };
    let trigger = named(&detail.trigger);

    let mut out = Vec::new();
    if let Some(level) = detail.min_level {
        out.push(C::MinLevel(level));
    }

    if let Some(item) = named(&detail.item) {
        out.push(C::UseItem(item));
    }
    if trigger.as_deref() == Some("trade") {
        out.push(C::Trade {
            for_species: named(&detail.trade_species),
        });
    }
    if let Some(item) = named(&detail.held_item) {
        out.push(C::HeldItem(item));
    }
    if let Some(name) = named(&detail.known_move) {
        out.push(C::KnownMove(name));
    }
    if let Some(kind) = named(&detail.known_move_type) {
        out.push(C::KnownMoveType(kind));
    }
    if let Some(place) = named(&detail.location) {
        out.push(C::Location(place));
    }
    if let Some(time) = detail.time_of_day.as_ref().filter(|t| !t.is_empty()) {
        out.push(C::TimeOfDay(time.clone()));
    }
    if let Some(n) = detail.min_happiness {
        out.push(C::MinHappiness(n));
    }
    if let Some(n) = detail.min_beauty {
        out.push(C::MinBeauty(n));
    }
    if let Some(n) = detail.min_affection {
        out.push(C::MinAffection(n));
    }
    if detail.needs_overworld_rain {
        out.push(C::OverworldRain);
    }
    if let Some(rel) = detail.relative_physical_stats {
        out.push(C::RelativePhysicalStats(match rel.signum() {
            1 => StatComparison::AttackGreater,
            -1 => StatComparison::AttackLess,
            _ => StatComparison::Equal,
        }));
    }
    if detail.turn_upside_down {
        out.push(C::TurnUpsideDown);
    }
    if let Some(gender) = detail.gender {
        out.push(C::Gender(if gender == 1 {
            Gender::Female
        } else {
            Gender::Male
        }));
    }

    if out.is_empty() {
        out.extend(trigger.map(C::Trigger));
    }
    out
}

fn join(conditions: &[EvolutionCondition]) -> Option<String> {
    let phrases: Vec<String> = conditions
        .iter()
        .filter(|c| !matches!(c, EvolutionCondition::MinLevel(_)))
        .map(ToString::to_string)
        .collect();
    if phrases.is_empty() {
        None
    } else {
        Some(phrases.join(", "))
    }
}

/// `"thunder-stone"` → `"Thunder Stone"`.
pub fn humanize(name: &str) -> String {
    name.split(['-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
