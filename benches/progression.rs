use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use learnpath::model::{Category, Course, Lecture, LectureId, PublicationStatus, Section};
use learnpath::progression::Progression;

fn course(sections: usize, lectures: usize) -> Course {
    Course {
        id: "bench".into(),
        title: "Bench".into(),
        status: PublicationStatus::Published,
        category: Category {
            id: "cat".into(),
            name: "Category".into(),
        },
        sections: (0..sections)
            .map(|s| Section {
                id: format!("s{s}").into(),
                title: format!("Section {s}"),
                lectures: (0..lectures)
                    .map(|l| Lecture {
                        id: format!("s{s}l{l}").into(),
                        title: format!("Lecture {l}"),
                        duration_secs: 300,
                        video: None,
                        is_preview: false,
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn complete_everything(c: &mut Criterion) {
    let mut group = c.benchmark_group("complete_everything");

    for size in [4usize, 16, 64] {
        let course = course(size, 10);
        let ids: Vec<LectureId> = course.lectures().map(|lecture| lecture.id.clone()).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size * 10), &ids, |b, ids| {
            b.iter(|| {
                let mut progression = Progression::new(&course);
                for id in ids {
                    let _ = progression.complete(black_box(id));
                }
                black_box(progression.view())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, complete_everything);
criterion_main!(benches);
