// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for logical path parsing

#![no_main]

use fernfs_core::LogicalPath;
use libfuzzer_sys::fuzz_target;
use std::path::{Component, Path};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(path) = LogicalPath::parse(input) else {
        return;
    };

    // Whatever survives parsing must stay under the base when joined.
    let base = Path::new("/sandbox/base");
    let real = path.to_real_path(base);
    assert!(real.starts_with(base));
    assert!(real
        .components()
        .all(|c| !matches!(c, Component::ParentDir | Component::CurDir)));

    // Normalization is stable.
    let reparsed = LogicalPath::parse(&path.to_string()).expect("normalized path reparses");
    assert_eq!(reparsed, path);
});
