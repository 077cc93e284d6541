//! Shared fixtures for the integration tests
//!
//! A small corpus shaped like a real harvest: one fully populated project,
//! a sparse one, and one with nothing but languages.

#![allow(dead_code)]

use corpus::{Corpus, Record};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Project with every sub-category populated
pub fn full_project() -> Value {
    json!({
        "id": 1,
        "name": "Test Project",
        "description": "test description",
        "created_at": "2021-05-10T15:00:00.000Z",
        "default_branch": "master",
        "visibility": "internal",
        "archived": false,
        "issues_enabled": true,
        "issue_statistics": {"counts": {"all": 1, "closed": 0, "opened": 1}},
        "languages": {"Python": 80.0, "HTML": 20.0},
        "namespace": {"id": 10, "name": "group", "kind": "group"},
        "owner": {"id": 5, "name": "Doe, Jane", "username": "jdoe"},
        "users": [
            {"id": 5, "name": "Doe, Jane", "username": "jdoe"},
            {"id": 6, "name": "Richard Roe", "username": "rroe"}
        ],
        "contributors": [
            {"name": "Jane Doe", "commits": 3},
            {"name": "Unknown Person", "commits": 1}
        ],
        "commits": [
            {"id": "123abc", "title": "Initial commit", "committer_name": "Jane Doe"},
            {"id": "456def", "title": "Add docs", "committer_name": "Richard Roe"}
        ],
        "files": [
            {"id": "hash123", "name": "test.py", "type": "blob", "path": "test.py"}
        ],
        "milestones": [
            {"id": 30, "title": "v1.0"}
        ],
        "issues": [
            {
                "id": 100,
                "title": "Crash on start",
                "author": {"id": 6, "name": "Richard Roe"},
                "assignees": [{"name": "Jane Doe"}],
                "milestone": {"id": 30, "title": "v1.0"}
            }
        ],
        "mergerequests": [
            {
                "id": 200,
                "title": "Fix crash",
                "author": {"id": 5},
                "merged_by": {"id": 6},
                "assignees": [{"id": 5}],
                "commits": [{"id": "123abc"}],
                "close_issues": [{"id": 100}]
            }
        ],
        "releases": [
            {
                "tag_name": "v1.0",
                "author": {"id": 5, "name": "Doe, Jane"},
                "commit": {"id": "456def"},
                "milestones": [{"id": 30}]
            }
        ]
    })
}

/// Project with a handful of scalar fields
pub fn sparse_project() -> Value {
    json!({
        "id": 2,
        "name": "tools",
        "visibility": "public",
        "default_branch": "main",
        "languages": {"C": 90.0, "TeX": 10.0}
    })
}

pub fn languages_only_project() -> Value {
    json!({
        "id": 3,
        "languages": {"Python": 50.0, "C": 50.0}
    })
}

pub fn record(value: Value) -> Record {
    Record::try_from(value).expect("fixture must be a JSON object")
}

pub fn sample_corpus() -> Corpus {
    Corpus::with_projects(vec![
        record(full_project()),
        record(sparse_project()),
        record(languages_only_project()),
    ])
}

/// Write `contents` to `name` inside `dir`
pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("failed to write fixture file");
    path
}
