use bpmn_drafter::classify::classify;
use bpmn_drafter::config::{CompilerConfig, DraftLimits};
use bpmn_drafter::fold::fold_loops;
use bpmn_drafter::layout::compute_layout;
use bpmn_drafter::parser::read_candidate;
use bpmn_drafter::pipeline::compile_draft;
use bpmn_drafter::schema::validate_draft;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const TASK_LABELS: [&str; 6] = [
    "Registrar solicitação",
    "Sistema valida cadastro",
    "Gerente aprova pedido",
    "Checar política interna",
    "Diretoria delibera exceção",
    "Notificar cliente por email",
];

/// Linear chain with a gateway every fifth node, `nodes` long including
/// start and end.
fn chain_candidate(nodes: usize) -> String {
    let mut node_list = vec![serde_json::json!({"id": "n0", "type": "start", "label": "Início"})];
    let mut flows = Vec::new();
    for i in 1..nodes {
        let kind = if i == nodes - 1 {
            "end"
        } else if i % 5 == 0 {
            "gateway_exclusive"
        } else {
            "task"
        };
        let label = TASK_LABELS[i % TASK_LABELS.len()];
        node_list.push(serde_json::json!({"id": format!("n{i}"), "type": kind, "label": label}));
        flows.push(serde_json::json!({
            "id": format!("f{i:02}"),
            "source": format!("n{}", i - 1),
            "target": format!("n{i}")
        }));
    }
    serde_json::json!({"processName": "Benchmark", "nodes": node_list, "flows": flows}).to_string()
}

fn fixture(name: &str) -> String {
    match name {
        "pdca_cycle" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/pdca_cycle.json"
        ))
        .to_string(),
        "procurement" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/procurement.json"
        ))
        .to_string(),
        "chain_12" => chain_candidate(12),
        "chain_24" => chain_candidate(24),
        "chain_40" => chain_candidate(40),
        _ => panic!("unknown fixture"),
    }
}

fn bench_config() -> CompilerConfig {
    CompilerConfig {
        limits: DraftLimits {
            max_nodes: 40,
            max_flows: 80,
            max_response_bytes: 100_000,
        },
        ..Default::default()
    }
}

const FIXTURES: [&str; 5] = ["pdca_cycle", "procurement", "chain_12", "chain_24", "chain_40"];

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    let config = bench_config();
    for name in FIXTURES {
        let input = fixture(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, data| {
            b.iter(|| {
                let value = read_candidate(black_box(data), &config.limits).expect("read failed");
                let draft = validate_draft(&value, &config.limits).expect("validate failed");
                black_box(draft.nodes.len());
            });
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = bench_config();
    for name in FIXTURES {
        let value = read_candidate(&fixture(name), &config.limits).expect("read failed");
        let draft = validate_draft(&value, &config.limits).expect("validate failed");
        let graph = fold_loops(classify(&draft, &config.rules), &config.rules);
        group.bench_with_input(BenchmarkId::from_parameter(name), &graph, |b, data| {
            b.iter(|| {
                let layout = compute_layout(black_box(data), &config.layout);
                black_box(layout.nodes.len());
            });
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    let config = bench_config();
    for name in FIXTURES {
        let input = fixture(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), &input, |b, data| {
            b.iter(|| {
                let compiled = compile_draft(black_box(data), &config).expect("compile failed");
                black_box(compiled.bpmn_xml.len());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_validate, bench_layout, bench_end_to_end);
criterion_main!(benches);
