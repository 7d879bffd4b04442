use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pixelchain::prelude::*;

fn gradient(size: u32) -> ImageBuffer {
    ImageBuffer::from_fn(size, size, 3, |x, y, c| (x + y * 3 + c as u32 * 40) as u8)
        .expect("valid dimensions")
}

fn single_steps(c: &mut Criterion) {
    let image = gradient(512);
    let runner = PipelineRunner::global();
    let mut group = c.benchmark_group("step");

    for (name, params) in [
        ("brightness", r#"{"factor": 1.2}"#),
        ("saturation", r#"{"factor": 0.5}"#),
        ("hue", r#"{"degrees": 45}"#),
        ("boxblur", r#"{"radius": 4}"#),
        ("unsharpmask", r#"{"radius": 4, "amount": 1.0}"#),
        ("rotate", r#"{"degrees": 30}"#),
    ] {
        let json = format!(r#"[{{"step": "{}", "params": {}}}]"#, name, params);
        let definition = PipelineDefinition::from_json(&json).expect("valid pipeline");
        let pipeline = runner.validate(&definition, None).expect("valid parameters");
        group.bench_with_input(BenchmarkId::from_parameter(name), &pipeline, |b, pipeline| {
            b.iter(|| runner.execute(black_box(image.clone()), pipeline))
        });
    }
    group.finish();
}

fn full_chain(c: &mut Criterion) {
    let runner = PipelineRunner::global();
    let definition = PipelineDefinition::new()
        .then(StepInvocation::new("brightness").with_param("factor", 1.1))
        .then(StepInvocation::new("hue").with_param("degrees", 20))
        .then(StepInvocation::new("boxblur").with_param("radius", 2))
        .then(StepInvocation::new("unsharpmask"))
        .then(StepInvocation::new("crop").with_param("width", 200).with_param("height", 200))
        .then(StepInvocation::new("rotate").with_param("degrees", 90));
    let pipeline = runner.validate(&definition, None).expect("valid parameters");

    let mut group = c.benchmark_group("chain");
    for size in [256u32, 1024] {
        let image = gradient(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &image, |b, image| {
            b.iter(|| runner.execute(black_box(image.clone()), &pipeline))
        });
    }
    group.finish();
}

criterion_group!(benches, single_steps, full_chain);
criterion_main!(benches);
