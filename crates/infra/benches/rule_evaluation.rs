use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use tradedesk_contracts::{ContractLifecycleState, ContractSnapshot, Party, QualitySpecs, TradeType};
use tradedesk_core::{ContractId, ExpectedVersion};
use tradedesk_infra::{ContractDesk, EngineConfig, InMemoryContractRepository};
use tradedesk_rules::{
    BusinessRule, Decision, RuleAction, RuleCatalog, RuleCondition, RuleSeverity, RuleType,
};

fn contract(quantity: u64) -> ContractSnapshot {
    ContractSnapshot::draft(ContractId::new("BENCH-1"), TradeType::Cci)
        .with_parties(Party::new("B-1", "Buyer"), Party::new("S-1", "Seller"))
        .with_quantity(quantity)
        .with_rate(6100)
        .with_bargain_type("Pucca Sauda")
        .with_emd_paid(true)
        .with_quality_specs(QualitySpecs {
            staple_length_mm: Some(29.0),
            micronaire: Some(4.1),
            strength_gpt: Some(29.5),
            trash_percent: Some(2.5),
            moisture_percent: Some(8.0),
        })
}

/// Synthetic catalog of `size` rules, each with three conditions.
fn synthetic_catalog(size: usize) -> RuleCatalog {
    RuleCatalog::new(
        (0..size)
            .map(|i| {
                BusinessRule::new(
                    format!("synthetic-{i}"),
                    format!("Synthetic {i}"),
                    RuleType::Quantity,
                    RuleSeverity::Warning,
                    RuleAction::Warn,
                )
                .with_condition(RuleCondition::greater_than("quantityBales", i as u64))
                .with_condition(RuleCondition::between("qualitySpecs.micronaire", 3.5, 4.9))
                .with_condition(RuleCondition::equals("buyer.id", "B-1"))
            })
            .collect(),
    )
}

fn bench_default_catalog(c: &mut Criterion) {
    let catalog = RuleCatalog::default();
    let contract = contract(450);

    let mut group = c.benchmark_group("default_catalog");
    group.bench_function("evaluate", |b| {
        b.iter(|| black_box(catalog.evaluate(black_box(&contract))))
    });
    group.bench_function("evaluate_and_decide", |b| {
        b.iter(|| {
            let results = catalog.evaluate(black_box(&contract));
            black_box(Decision::from_results(&results))
        })
    });
    group.finish();
}

fn bench_catalog_size(c: &mut Criterion) {
    let contract = contract(450);

    let mut group = c.benchmark_group("catalog_size");
    for size in [10usize, 100, 1000] {
        let catalog = synthetic_catalog(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &catalog, |b, catalog| {
            b.iter(|| black_box(catalog.evaluate(black_box(&contract))))
        });
    }
    group.finish();
}

fn bench_desk_round_trip(c: &mut Criterion) {
    c.bench_function("desk_evaluate_and_transition", |b| {
        b.iter_with_setup(
            || {
                let repo = InMemoryContractRepository::new();
                repo.insert_contract(contract(450).with_status(ContractLifecycleState::Draft))
                    .expect("seed contract");
                ContractDesk::new(repo, EngineConfig::default())
            },
            |desk| {
                let id = ContractId::new("BENCH-1");
                let report = desk.evaluate_contract(&id).expect("evaluate");
                desk.advance(&id, "system", "bench", ExpectedVersion::Exact(0))
                    .expect("advance");
                black_box(report)
            },
        )
    });
}

criterion_group!(benches, bench_default_catalog, bench_catalog_size, bench_desk_round_trip);
criterion_main!(benches);
