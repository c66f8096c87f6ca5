use criterion::{black_box, criterion_group, criterion_main, Criterion};

use film::reconcile::{film_columns as c, films_from_rows};
use filmrate_sql::{Row, Value};

/// `films` films, each joined against 3 genres x 2 directors x `likes` likers.
fn fan_out_rows(films: i64, likes: i64) -> Vec<Row> {
    let mut rows = Vec::new();
    for film in 1..=films {
        for genre in 1..=3 {
            for director in 1..=2 {
                for liker in 1..=likes {
                    rows.push(Row::from_pairs([
                        (c::ID, Value::Integer(film)),
                        (c::NAME, Value::Text(format!("film {}", film))),
                        (c::DESCRIPTION, Value::Text(String::new())),
                        (c::RELEASE_DATE, Value::Text("1999-03-31".into())),
                        (c::DURATION, Value::Integer(136)),
                        (c::MPA_ID, Value::Integer(4)),
                        (c::MPA_NAME, Value::Text("R".into())),
                        (c::GENRE_ID, Value::Integer(genre)),
                        (c::GENRE_NAME, Value::Text(format!("genre {}", genre))),
                        (c::DIRECTOR_ID, Value::Integer(director)),
                        (c::DIRECTOR_NAME, Value::Text(format!("director {}", director))),
                        (c::LIKER_ID, Value::Integer(liker)),
                    ]));
                }
            }
        }
    }
    rows
}

fn bench_reconcile_small(c: &mut Criterion) {
    let rows = fan_out_rows(100, 5);

    c.bench_function("reconcile_100_films_x30_rows", |b| {
        b.iter(|| {
            let films = films_from_rows(black_box(&rows)).unwrap();
            assert_eq!(films.len(), 100);
        });
    });
}

fn bench_reconcile_wide(c: &mut Criterion) {
    let rows = fan_out_rows(10, 200);

    c.bench_function("reconcile_10_films_x1200_rows", |b| {
        b.iter(|| {
            let films = films_from_rows(black_box(&rows)).unwrap();
            assert_eq!(films[0].like_count(), 200);
        });
    });
}

criterion_group!(benches, bench_reconcile_small, bench_reconcile_wide);
criterion_main!(benches);
