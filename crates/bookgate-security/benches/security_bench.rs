// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for password hashing, fingerprinting, and audit
// logging in the bookgate-security crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use bookgate_security::{AuditLog, PasswordHasher, fingerprint, generate_token};

/// Hash and verify at the default work factor.
///
/// This is the cost a login pays, so it should stay in the tens of
/// milliseconds on commodity hardware.
fn bench_password_hash_verify(c: &mut Criterion) {
    let hasher = PasswordHasher::new(100_000).expect("hasher");
    let stored = hasher.hash("correct-horse").expect("hash");

    let mut group = c.benchmark_group("password_pbkdf2_100k");
    group.sample_size(10);
    group.bench_function("hash", |b| {
        b.iter(|| black_box(hasher.hash(black_box("correct-horse")).expect("hash")));
    });
    group.bench_function("verify", |b| {
        b.iter(|| {
            black_box(
                hasher
                    .verify(black_box("correct-horse"), &stored)
                    .expect("verify"),
            )
        });
    });
    group.finish();
}

/// Fingerprint and generate credential values.
fn bench_credential_values(c: &mut Criterion) {
    c.bench_function("generate_token", |b| {
        b.iter(|| black_box(generate_token().expect("token")));
    });
    c.bench_function("fingerprint", |b| {
        b.iter(|| black_box(fingerprint(black_box("0F1E2D3C4B5A69788796A5B4C3D2E1F0"))));
    });
}

/// Recording an audit entry to an in-memory SQLite database.
fn bench_audit_record(c: &mut Criterion) {
    c.bench_function("audit_record (in-memory SQLite)", |b| {
        let log = AuditLog::open_in_memory().expect("open in-memory audit log");

        b.iter(|| {
            log.record(
                black_box("key_redeem"),
                black_box("key:0f1e2d3c4b5a"),
                black_box(true),
                black_box(Some("book 42")),
            )
            .expect("record failed");
        });
    });
}

criterion_group!(
    benches,
    bench_password_hash_verify,
    bench_credential_values,
    bench_audit_record,
);
criterion_main!(benches);
