//! Benchmarks for planning and graph building.

use std::sync::Arc;

use campaignflow::core::{CampaignKind, InputDescriptor};
use campaignflow::graph::{FanOutExpander, StageGraphBuilder};
use campaignflow::planner::CampaignPlanner;
use campaignflow::profiles::{EngineDescriptor, ExecutorProfileRegistry, LAMMPS};
use campaignflow::testing::{sample_config, MapClassifier};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn planner() -> CampaignPlanner {
    CampaignPlanner::new(Arc::new(
        MapClassifier::new()
            .with("relax.json", CampaignKind::Relax)
            .with("props.json", CampaignKind::Properties),
    ))
}

fn campaign_benchmark(c: &mut Criterion) {
    let planner = planner();
    let registry = ExecutorProfileRegistry::from_config(&sample_config(), EngineDescriptor::builtin());
    let descriptors = [InputDescriptor::from("relax.json"), InputDescriptor::from("props.json")];

    c.bench_function("plan_and_build_joint", |b| {
        b.iter(|| {
            let plan = planner.plan(black_box(&descriptors)).unwrap();
            StageGraphBuilder::new(LAMMPS, "/work")
                .build(&plan, &registry)
                .unwrap()
        });
    });

    let plan = planner.plan(&descriptors).unwrap();
    let graph = StageGraphBuilder::new(LAMMPS, "/work")
        .build(&plan, &registry)
        .unwrap();
    let template = graph.node("RelaxLAMMPS-Cal").unwrap();

    c.bench_function("expand_1000", |b| {
        b.iter(|| FanOutExpander::expand(template, black_box(1000)).unwrap());
    });

    c.bench_function("fingerprint_joint", |b| {
        b.iter(|| black_box(&graph).fingerprint());
    });
}

criterion_group!(benches, campaign_benchmark);
criterion_main!(benches);
