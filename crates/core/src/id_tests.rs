// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn uuid_gen_creates_short_unique_ids() {
    let id_gen = UuidIdGen;
    let id1 = id_gen.next();
    let id2 = id_gen.next();
    assert_ne!(id1, id2);
    assert_eq!(id1.len(), 12);
    assert!(id1.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn sequential_gen_creates_predictable_ids() {
    let id_gen = SequentialIdGen::new("r");
    assert_eq!(id_gen.next(), "r1");
    assert_eq!(id_gen.next(), "r2");
}

#[test]
fn sequential_gen_is_shared_between_clones() {
    let id_gen1 = SequentialIdGen::new("s");
    let id_gen2 = id_gen1.clone();
    assert_eq!(id_gen1.next(), "s1");
    assert_eq!(id_gen2.next(), "s2");
    assert_eq!(id_gen1.next(), "s3");
}
