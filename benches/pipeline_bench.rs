//! Text cleaning and join throughput.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use geipan::dataset::cases::{CaseRecord, CaseTable};
use geipan::dataset::clean::clean_str;
use geipan::dataset::join::join;
use geipan::dataset::table::Table;

fn narrative(i: usize) -> String {
    format!(
        "Temoin {i}:<br>lumiere orange immobile<BR/>puis   deplacement rapide<br />vers le nord-est.<br>Duree environ {} minutes.",
        i % 30
    )
}

fn bench_clean(c: &mut Criterion) {
    let texts: Vec<String> = (0..1_000).map(narrative).collect();

    let mut group = c.benchmark_group("clean");
    group.throughput(Throughput::Elements(texts.len() as u64));
    group.bench_function("clean_str_1000_narratives", |b| {
        b.iter(|| {
            for text in &texts {
                black_box(clean_str(black_box(text)));
            }
        })
    });
    group.finish();
}

fn bench_join(c: &mut Criterion) {
    let cases = CaseTable {
        records: (0..3_000)
            .map(|i| {
                let mut record = CaseRecord::new(format!("C{i}"));
                record.titre_localisation = Some(format!("COMMUNE ({}) {}", i % 95, 1950 + i % 70));
                record.description_detaillee = Some(narrative(i));
                record.classification = Some("D".to_string());
                record
            })
            .collect(),
    };
    let testimonies = Table {
        columns: vec!["case_id".into(), "temoin".into(), "age".into()],
        rows: (0..10_000)
            .map(|i| {
                vec![
                    Some(format!("C{}", i % 3_200)),
                    Some(format!("T{i}")),
                    Some((18 + i % 60).to_string()),
                ]
            })
            .collect(),
    };

    let mut group = c.benchmark_group("join");
    group.sample_size(20);
    group.throughput(Throughput::Elements(testimonies.len() as u64));
    group.bench_function("join_10k_testimonies_3k_cases", |b| {
        b.iter(|| black_box(join(black_box(&cases), black_box(&testimonies))))
    });
    group.finish();
}

criterion_group!(benches, bench_clean, bench_join);
criterion_main!(benches);
