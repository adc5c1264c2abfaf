use criterion::{black_box, criterion_group, criterion_main, Criterion};

use proctor_core::model::{Assessment, CodingProblem, Language, Question, QuestionBody, TestCase};
use proctor_core::response::{CodingResult, Response, ResponseMap};
use proctor_core::scorer::{score, ScoreSheet};

fn make_assessment(n: usize) -> Assessment {
    let questions: Vec<Question> = (0..n)
        .map(|i| {
            let body = match i % 4 {
                0 => QuestionBody::Choice {
                    options: vec!["a".into(), "b".into(), "c".into()],
                    correct_answer: "b".into(),
                },
                1 => QuestionBody::SpotError {
                    lines: vec!["one".into(), "two".into(), "three".into()],
                    error_line: 1,
                    explanation: String::new(),
                    correction: String::new(),
                },
                2 => QuestionBody::Matching {
                    left: vec!["x".into(), "y".into()],
                    right: vec!["1".into(), "2".into()],
                },
                _ => QuestionBody::Coding(CodingProblem {
                    statement: "echo".into(),
                    input_format: String::new(),
                    output_format: String::new(),
                    constraints: String::new(),
                    language: Language::Python,
                    starter_code: String::new(),
                    test_cases: vec![TestCase {
                        input: "1".into(),
                        expected_output: "1".into(),
                    }],
                }),
            };
            Question {
                id: format!("q{i}"),
                title: format!("Question {i}"),
                content: String::new(),
                points: 5.0,
                body,
            }
        })
        .collect();

    Assessment {
        id: "bench".into(),
        module_id: "bench".into(),
        title: "Benchmark".into(),
        description: String::new(),
        total_points: 5.0 * n as f64,
        passing_score: 70.0,
        time_limit_secs: None,
        questions,
    }
}

fn make_responses(assessment: &Assessment) -> ResponseMap {
    assessment
        .questions
        .iter()
        .map(|q| {
            let response = match &q.body {
                QuestionBody::Choice { .. } => Response::Text("b".into()),
                QuestionBody::SpotError { .. } => Response::Index(1),
                QuestionBody::Matching { .. } => Response::Map(
                    [("0".to_string(), "1".to_string())].into_iter().collect(),
                ),
                _ => Response::Coding(CodingResult {
                    code: "print(input())".into(),
                    passed: true,
                    results: Vec::new(),
                }),
            };
            (q.id.clone(), response)
        })
        .collect()
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    for n in [20, 200] {
        let assessment = make_assessment(n);
        let responses = make_responses(&assessment);

        group.bench_function(format!("{n}_questions"), |b| {
            b.iter(|| {
                score(
                    black_box(&assessment.questions),
                    black_box(&responses),
                    assessment.total_points,
                )
            })
        });

        group.bench_function(format!("{n}_questions_breakdown"), |b| {
            b.iter(|| ScoreSheet::compute(black_box(&assessment), black_box(&responses)))
        });
    }

    group.bench_function("20_questions_unanswered", |b| {
        let assessment = make_assessment(20);
        let empty = ResponseMap::new();
        b.iter(|| score(black_box(&assessment.questions), &empty, assessment.total_points))
    });

    group.finish();
}

criterion_group!(benches, bench_score);
criterion_main!(benches);
