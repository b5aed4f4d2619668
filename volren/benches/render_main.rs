use common::*;

mod common;

fn render_variants(c: &mut Criterion) {
    let scene = BenchScene::new();
    let settings = bench_settings(Quality::Normal, true);
    let mut color = TextureData::new(&TextureSpec::color(WIDTH, HEIGHT));

    let mut group = c.benchmark_group("variants");
    for kind in RaycasterKind::ALL {
        group.bench_function(BenchmarkId::from_parameter(format!("{kind:?}")), |b| {
            b.iter(|| scene.render(kind, &settings, &mut color))
        });
    }
    group.finish();
}

fn render_quality(c: &mut Criterion) {
    let scene = BenchScene::new();
    let mut color = TextureData::new(&TextureSpec::color(WIDTH, HEIGHT));

    let mut group = c.benchmark_group("quality");
    for quality in [Quality::Low, Quality::Normal, Quality::High] {
        let settings = bench_settings(quality, true);
        group.bench_function(BenchmarkId::from_parameter(format!("{quality:?}")), |b| {
            b.iter(|| scene.render(RaycasterKind::SimpleDvr, &settings, &mut color))
        });
    }
    group.finish();
}

fn render_ert(c: &mut Criterion) {
    let scene = BenchScene::new();
    let mut color = TextureData::new(&TextureSpec::color(WIDTH, HEIGHT));

    let mut group = c.benchmark_group("ray_termination");
    for ert in [false, true] {
        let settings = bench_settings(Quality::Normal, ert);
        group.bench_function(BenchmarkId::from_parameter(ert), |b| {
            b.iter(|| scene.render(RaycasterKind::SimpleDvr, &settings, &mut color))
        });
    }
    group.finish();
}

fn bake_transfer_function(c: &mut Criterion) {
    let tf = TransferFunction::from(KeyedIntensity::standard());
    c.bench_function("bake keyed", |b| b.iter(|| black_box(tf.bake().unwrap())));
}

criterion_group! {
    name = sequential;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = render_variants, render_quality, render_ert
}

criterion_group! {
    name = transfer_function;
    config = Criterion::default().sample_size(20);
    targets = bake_transfer_function
}

criterion_main!(sequential, transfer_function);
