use criterion::{Criterion, criterion_group, criterion_main};
use libvenlink::prelude::*;

fn synthetic_places(count: usize) -> Vec<Place> {
  (0..count)
    .map(|i| Place {
      id: format!("p-{i}"),
      name: format!("The Copper Kettle {}", i % 97),
      address: format!("{} High Street, SW{} 1AA", i % 200, i % 20),
      coordinates: Coordinates::new(51.30 + (i % 400) as f64 * 0.001, -0.50 + (i / 400) as f64 * 0.001),
      ..Default::default()
    })
    .collect()
}

fn synthetic_establishments(count: usize) -> Vec<Establishment> {
  (0..count)
    .map(|i| Establishment {
      id: format!("e-{i}"),
      name: format!("Copper Kettle {}", i % 101),
      postcode: format!("SW{} 1AA", i % 20),
      coordinates: Coordinates::new(51.30 + (i % 400) as f64 * 0.001, -0.50 + (i / 400) as f64 * 0.001),
      ..Default::default()
    })
    .collect()
}

fn linking(c: &mut Criterion) {
  let places = synthetic_places(1_000);
  let establishments = synthetic_establishments(5_000);
  let linker = Linker::new(MatchParams::default()).unwrap();

  c.bench_function("link_1000_x_5000", |b| b.iter(|| linker.link(&places, &establishments)));
}

criterion_group!(benches, linking);
criterion_main!(benches);
