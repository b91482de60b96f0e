use criterion::{Criterion, criterion_group, criterion_main};
use fusedb_core::Database;
use tempfile::tempdir;

fn bench_insert(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    db.execute("CREATE TABLE 'bench' (id INT PRIMARY KEY, payload CHAR(64))")
        .unwrap();

    let mut i = 0u64;
    c.bench_function("insert_single_row", |b| {
        b.iter(|| {
            i += 1;
            db.execute(&format!("INSERT INTO 'bench' (payload) VALUES ('row-{i}')"))
                .unwrap();
        })
    });
}

fn bench_insert_batch(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    db.execute("CREATE TABLE 'batch' (id INT PRIMARY KEY, payload CHAR(64))")
        .unwrap();

    let values: Vec<String> = (0..100).map(|i| format!("('row-{i}')")).collect();
    let sql = format!("INSERT INTO 'batch' (payload) VALUES {}", values.join(","));
    c.bench_function("insert_100_row_batch", |b| {
        b.iter(|| db.execute(&sql).unwrap())
    });
}

fn bench_scan(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let db = Database::open(dir.path()).unwrap();
    db.execute("CREATE TABLE 'scan' (id INT PRIMARY KEY, payload CHAR(64))")
        .unwrap();
    for i in 0..1000 {
        db.execute(&format!("INSERT INTO 'scan' (payload) VALUES ('row-{i}')"))
            .unwrap();
    }

    c.bench_function("scan_1k_rows", |b| {
        b.iter(|| {
            let rows: Vec<_> = db.execute("SELECT * FROM 'scan'").unwrap().unwrap().collect();
            assert_eq!(rows.len(), 1000);
        })
    });
}

criterion_group!(benches, bench_insert, bench_insert_batch, bench_scan);
criterion_main!(benches);
