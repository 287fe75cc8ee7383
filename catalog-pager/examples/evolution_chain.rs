// Example: flattening a branching evolution tree into display order.
use catalog_pager::model::{ChainLink, EvolutionDetail, NamedResource};
use catalog_pager::{connector_labels, flatten};

fn species(name: &str, id: u32) -> NamedResource {
    NamedResource::new(name, format!("https://catalog.test/pokemon-species/{id}/"))
}

fn named(name: &str) -> Option<NamedResource> {
    Some(NamedResource::new(name, ""))
}

fn main() {
    let stone = |item: &str| EvolutionDetail {
        item: named(item),
        trigger: named("use-item"),
        ..EvolutionDetail::default()
    };
    let chain = ChainLink::new(species("eevee", 133))
        .with_child(ChainLink::new(species("vaporeon", 134)).with_detail(stone("water-stone")))
        .with_child(ChainLink::new(species("jolteon", 135)).with_detail(stone("thunder-stone")))
        .with_child(
            ChainLink::new(species("espeon", 196)).with_detail(EvolutionDetail {
                min_happiness: Some(160),
                time_of_day: Some("day".into()),
                trigger: named("level-up"),
                ..EvolutionDetail::default()
            }),
        );

    let steps = flatten(&chain);
    let labels = connector_labels(&steps);
    for (i, step) in steps.iter().enumerate() {
        let label = i.checked_sub(1).and_then(|j| labels[j].as_deref()).unwrap_or("-");
        println!("{:>3?} {:<10} {label}", step.id, step.name);
    }
}
