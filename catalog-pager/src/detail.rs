use crate::evolution::ChainStep;
use crate::model::{Entity, Species};
use crate::{CatalogClient, FetchResult, FetchResultExt};

/// Everything the detail view renders for one entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityDetail {
    pub entity: Entity,
    /// `None` when the species lookup failed; the entity is still shown.
    pub species: Option<Species>,
    /// Flattened evolution chain; empty when unknown.
    pub evolution: Vec<ChainStep>,
    pub nav: EntityNav,
}

/// Previous/next ids around an entity, bounded to the catalog's id range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityNav {
    pub id: u32,
    pub previous: Option<u32>,
    pub next: Option<u32>,
}

impl EntityNav {
    pub const FIRST_ID: u32 = 1;
    pub const LAST_ID: u32 = 10_303;

    pub fn around(id: u32) -> Self {
        Self {
            id,
            previous: (id > Self::FIRST_ID).then(|| id - 1),
            next: (id < Self::LAST_ID).then(|| id + 1),
        }
    }
}

/// The flattened evolution chain of the species `id` belongs to.
///
/// `Ok(None)` when the species or its chain does not exist.
pub async fn evolution_steps(
    client: &CatalogClient,
    id: u32,
) -> FetchResult<Option<Vec<ChainStep>>> {
    let Some(species) = client.species(id).await.found()? else {
        return Ok(None);
    };
    chain_of(client, &species).await
}

async fn chain_of(
    client: &CatalogClient,
    species: &Species,
) -> FetchResult<Option<Vec<ChainStep>>> {
    let Some(chain_id) = species.evolution_chain_id() else {
        return Ok(None);
    };
    let chain = client.evolution_chain(chain_id).await.found()?;
    Ok(chain.map(|chain| chain.steps()))
}

/// Loads entity, species and evolution chain for the detail view.
///
/// Returns `Ok(None)` for id `0` (no selection) and when the entity does not exist. Species and
/// evolution lookups are best effort: their failures degrade to empty sections.
pub async fn load_detail(client: &CatalogClient, id: u32) -> FetchResult<Option<EntityDetail>> {
    if id == 0 {
        return Ok(None);
    }
    let Some(entity) = client.entity(id).await.found()? else {
        pdebug!(id, "entity not found");
        return Ok(None);
    };

    let species = match client.species(id).await {
        Ok(species) => Some(species),
        Err(_err) => {
            pwarn!(id, error = %_err, "species lookup failed");
            None
        }
    };
    let evolution = match &species {
        Some(species) => match chain_of(client, species).await {
            Ok(steps) => steps.unwrap_or_default(),
            Err(_err) => {
                pwarn!(id, error = %_err, "evolution chain lookup failed");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    Ok(Some(EntityDetail {
        entity,
        species,
        evolution,
        nav: EntityNav::around(id),
    }))
}
