use criterion::{criterion_group, criterion_main, Criterion};
use demgrid::Grid;
use geo::{coord, line_string};
use xsection::{
    BoreholeRecord, DepthInterval, ElevUnits, GridSpec, Length, LinearUnit, Pipeline, Project,
    TraverseLine,
};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// 4 km square grid, 10 m cells, rising gently to the east.
#[allow(clippy::cast_precision_loss)]
fn sloped_grid(base: f32) -> Grid {
    let (cols, rows) = (400, 400);
    let samples = (0..rows)
        .flat_map(|_| 0..cols)
        .map(|col| base + col as f32 * 0.05)
        .collect();
    Grid::from_samples(coord! { x: 0.0, y: 0.0 }, 10.0, (cols, rows), None, samples).unwrap()
}

#[allow(clippy::cast_precision_loss)]
fn wells() -> (Vec<BoreholeRecord>, Vec<DepthInterval>) {
    let mut records = Vec::new();
    let mut lithology = Vec::new();
    for i in 0..100 {
        let id = format!("W{i}");
        let x = 100.0 + 38.0 * i as f64;
        let y = 2000.0 + if i % 2 == 0 { 60.0 } else { -60.0 };
        let mut record = BoreholeRecord::new(id.clone(), coord! { x: x, y: y }, 150.0);
        record.depth_to_bedrock = Some(80.0);
        records.push(record);
        lithology.push(DepthInterval::new(id.clone(), 0.0, 80.0));
        lithology.push(DepthInterval::new(id, 80.0, 150.0));
    }
    (records, lithology)
}

fn cross_section(c: &mut Criterion) {
    let mut group = c.benchmark_group("Cross Section");

    let topography = sloped_grid(250.0);
    let bedrock = sloped_grid(200.0);
    let (records, lithology) = wells();
    let project = Project::new(ElevUnits::Meters, 10.0, Length::new(150.0, LinearUnit::Meters)).grid(
        GridSpec {
            distance_interval: 500.0,
            distance_unit: LinearUnit::Meters,
            elevation_interval: 25.0,
            elevation_unit: ElevUnits::Meters,
        },
    );
    let pipeline = Pipeline::builder()
        .project(&project)
        .topography(&topography)
        .bedrock(&bedrock)
        .boreholes(&records)
        .lithology(&lithology)
        .build()
        .unwrap();
    let lines = [TraverseLine::new(
        "A",
        "W-E",
        line_string![(x: 50.0, y: 2000.0), (x: 3950.0, y: 2000.0)],
    )];

    group.sample_size(10);
    group.bench_with_input("west-east", &lines, |b, lines| {
        b.iter(|| pipeline.run(lines).unwrap())
    });
}

criterion_group!(benches, cross_section);
criterion_main!(benches);
