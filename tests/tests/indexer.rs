//! End-to-end scenarios over a temporary registry tree.

use std::fs;

use serde_json::{json, Value};

use kiln_core::{IndexError, Resolver};
use tests::{draft_2020_12, Fixture};

#[test]
fn minimal_collection_is_materialised() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "a.json",
        &draft_2020_12("https://example.com/schemas/a", json!({})),
    );
    fixture.run().unwrap();

    let pack = fixture.read_artifact_with_meta("schemas/example/a.json");
    assert_eq!(
        pack.data.get("$id").and_then(Value::as_str),
        Some("http://localhost:8000/example/a.json")
    );
    assert_eq!(
        pack.data.get("$schema").and_then(Value::as_str),
        Some("https://json-schema.org/draft/2020-12/schema")
    );
    assert_eq!(pack.meta.mime, "application/schema+json");
    assert_eq!(
        pack.meta.extension,
        Some(json!("https://json-schema.org/draft/2020-12/schema"))
    );
}

#[test]
fn absolute_references_are_rewritten_to_relative() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "a.json",
        &draft_2020_12("https://example.com/schemas/a", json!({})),
    );
    fixture.write_schema(
        "b.json",
        &draft_2020_12(
            "https://example.com/schemas/b",
            json!({"$ref": "https://example.com/schemas/a"}),
        ),
    );
    fixture.run().unwrap();

    let materialised = fixture.read_artifact("schemas/example/b.json");
    assert_eq!(
        materialised.get("$ref").and_then(Value::as_str),
        Some("a.json")
    );
}

#[test]
fn lookup_is_case_insensitive() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "a.json",
        &draft_2020_12("https://example.com/schemas/a", json!({})),
    );
    fixture.run().unwrap();

    let configuration =
        kiln_core::configuration::parse(&fixture.path().join("config.json"), fixture.path())
            .unwrap();
    let resolver = Resolver::new(&configuration);
    let key = match configuration.entries["example"] {
        kiln_core::Entry::Collection(key) => key,
        kiln_core::Entry::Page(_) => unreachable!(),
    };
    let collection = &configuration.collections[key];
    resolver
        .add(key, &collection.absolute_path.join("a.json"))
        .unwrap();

    let lower = resolver
        .resolve("http://localhost:8000/example/a.json", None)
        .unwrap();
    let upper = resolver
        .resolve("HTTP://LOCALHOST:8000/EXAMPLE/A.JSON", None)
        .unwrap();
    let mixed = resolver
        .resolve("http://Localhost:8000/Example/A.json", None)
        .unwrap();
    assert!(lower.is_some());
    assert_eq!(lower, upper);
    assert_eq!(lower, mixed);
}

#[test]
fn duplicate_identifiers_abort_the_run() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "x1.json",
        &draft_2020_12("https://example.com/schemas/x", json!({})),
    );
    fixture.write_schema(
        "x2.json",
        &draft_2020_12("https://example.com/schemas/x", json!({})),
    );
    let error = fixture.run().unwrap_err();
    assert!(matches!(error, IndexError::DuplicateIdentifier(_)));
}

#[test]
fn directory_listings_sort_semver_descending() {
    let fixture = Fixture::new();
    for version in ["v1.2.0", "v1.10.0", "v2.0.0"] {
        fixture.write_schema(
            &format!("{version}/a.json"),
            &draft_2020_12(
                &format!("https://example.com/schemas/{version}/a"),
                json!({}),
            ),
        );
    }
    fixture.run().unwrap();

    let nav = fixture.read_artifact("explorer/example/index.nav");
    let names: Vec<&str> = nav["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["v2.0.0", "v1.10.0", "v1.2.0"]);
}

#[test]
fn rerunning_with_identical_inputs_rewrites_nothing() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "a.json",
        &draft_2020_12("https://example.com/schemas/a", json!({})),
    );
    fixture.write_schema(
        "b.json",
        &draft_2020_12(
            "https://example.com/schemas/b",
            json!({"$ref": "https://example.com/schemas/a"}),
        ),
    );
    fixture.run().unwrap();

    let snapshot = |root: &std::path::Path| {
        let mut entries = Vec::new();
        for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
            let entry = entry.unwrap();
            if entry.file_type().is_file() {
                let modified = entry.metadata().unwrap().modified().unwrap();
                entries.push((entry.into_path(), modified));
            }
        }
        entries
    };

    let before = snapshot(&fixture.output);
    assert!(!before.is_empty());
    fixture.run().unwrap();
    let after = snapshot(&fixture.output);
    assert_eq!(before, after);
}

#[test]
fn stale_artifacts_are_garbage_collected() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "a.json",
        &draft_2020_12("https://example.com/schemas/a", json!({})),
    );
    fixture.write_schema(
        "b.json",
        &draft_2020_12("https://example.com/schemas/b", json!({})),
    );
    fixture.run().unwrap();
    assert!(fixture.artifact("schemas/example/b.json").exists());

    fixture.remove_schema("b.json");
    fixture.run().unwrap();
    assert!(fixture.artifact("schemas/example/a.json").exists());
    assert!(!fixture.artifact("schemas/example/b.json").exists());
    assert!(!fixture.artifact("schemas/example/b.bundle").exists());
    assert!(!fixture.artifact("explorer/example/b.html").exists());
}

#[test]
fn bundles_are_self_contained_and_idempotent() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "a.json",
        &draft_2020_12("https://example.com/schemas/a", json!({"type": "string"})),
    );
    fixture.write_schema(
        "b.json",
        &draft_2020_12(
            "https://example.com/schemas/b",
            json!({"$ref": "https://example.com/schemas/a"}),
        ),
    );
    fixture.run().unwrap();

    let bundle = fixture.read_artifact("schemas/example/b.bundle");
    let definitions = bundle.get("$defs").and_then(Value::as_object).unwrap();
    let inlined = definitions
        .get("http://localhost:8000/example/a.json")
        .unwrap();
    assert_eq!(
        inlined.get("$id").and_then(Value::as_str),
        Some("http://localhost:8000/example/a.json")
    );

    let unidentified = fixture.read_artifact("schemas/example/b.unidentified");
    let inlined = unidentified["$defs"]["http://localhost:8000/example/a.json"].clone();
    assert!(inlined.get("$id").is_none());
    assert!(unidentified
        .get("$ref")
        .and_then(Value::as_str)
        .unwrap()
        .starts_with("#/"));
}

#[test]
fn dependency_edges_carry_from_to_and_pointer() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "a.json",
        &draft_2020_12("https://example.com/schemas/a", json!({})),
    );
    fixture.write_schema(
        "b.json",
        &draft_2020_12(
            "https://example.com/schemas/b",
            json!({"$ref": "https://example.com/schemas/a"}),
        ),
    );
    fixture.run().unwrap();

    let edges = fixture.read_artifact("schemas/example/b.deps");
    let edges = edges.as_array().unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0]["from"], "http://localhost:8000/example/b.json");
    assert_eq!(edges[0]["to"], "http://localhost:8000/example/a.json");
    assert_eq!(edges[0]["at"], "/$ref");
}

#[test]
fn yaml_sources_materialise_as_json() {
    let fixture = Fixture::new();
    fixture.write_raw(
        "y.yaml",
        "$schema: https://json-schema.org/draft/2020-12/schema\ntype: string\n",
    );
    fixture.run().unwrap();

    let materialised = fixture.read_artifact("schemas/example/y.json");
    assert_eq!(
        materialised.get("$id").and_then(Value::as_str),
        Some("http://localhost:8000/example/y.json")
    );
    assert!(fixture.artifact("schemas/example/y.positions").exists());
}

#[test]
fn the_full_artifact_set_exists_per_schema() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "a.json",
        &draft_2020_12(
            "https://example.com/schemas/a",
            json!({"description": "A string", "type": "string", "examples": ["x"]}),
        ),
    );
    fixture.run().unwrap();

    for artifact in [
        "schemas/example/a.json",
        "schemas/example/a.bundle",
        "schemas/example/a.unidentified",
        "schemas/example/a.deps",
        "schemas/example/a.health",
        "schemas/example/a.positions",
        "schemas/example/a.locations",
        "schemas/example/a.template",
        "explorer/example/a.nav",
        "explorer/example/a.html",
        "explorer/example/index.nav",
        "explorer/example/index.html",
        "explorer/index.nav",
        "explorer/index.html",
        "explorer/404.html",
        "search.jsonl",
        "configuration.json",
    ] {
        assert!(
            fixture.artifact(artifact).exists(),
            "missing artifact {artifact}"
        );
    }

    let health = fixture.read_artifact("schemas/example/a.health");
    assert_eq!(health["score"], 100);
    assert_eq!(health["errors"], json!([]));

    let positions = fixture.read_artifact("schemas/example/a.positions");
    assert!(positions.as_object().unwrap().contains_key("/type"));

    let template = fixture.read_artifact_with_meta("schemas/example/a.template");
    assert_eq!(
        template.meta.encoding,
        kiln_core::Encoding::Identity
    );
    assert!(template.data.get("instructions").is_some());
}

#[test]
fn navigation_documents_describe_their_schema() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "a.json",
        &draft_2020_12(
            "https://example.com/schemas/a",
            json!({"title": "A", "description": "The letter A"}),
        ),
    );
    fixture.run().unwrap();

    let nav = fixture.read_artifact("explorer/example/a.nav");
    assert_eq!(nav["identifier"], "http://localhost:8000/example/a.json");
    assert_eq!(nav["url"], "/example/a.json");
    assert_eq!(nav["canonical"], "http://localhost:8000/example/a.json");
    assert_eq!(nav["baseDialect"], "2020-12");
    assert_eq!(nav["title"], "A");
    assert_eq!(
        nav["breadcrumb"],
        json!([
            {"name": "example", "path": "/example"},
            {"name": "a", "path": "/example/a"}
        ])
    );

    let root = fixture.read_artifact("explorer/index.nav");
    let entries = root["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["type"], "directory");
    assert_eq!(entries[0]["name"], "example");
}

#[test]
fn the_search_index_lists_schemas_with_metadata_first() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "plain.json",
        &draft_2020_12("https://example.com/schemas/plain", json!({})),
    );
    fixture.write_schema(
        "documented.json",
        &draft_2020_12(
            "https://example.com/schemas/documented",
            json!({"title": "Documented", "description": "Has metadata"}),
        ),
    );
    fixture.run().unwrap();

    let pack = kiln_core::metapack::read_bytes_with_meta(&fixture.artifact("search.jsonl"))
        .unwrap();
    let lines: Vec<Value> = String::from_utf8(pack.data)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0][0], "/example/documented");
    assert_eq!(lines[0][1], "Documented");
    assert_eq!(lines[1][0], "/example/plain");
}

#[test]
fn configuration_validation_failures_name_the_problem() {
    let fixture = Fixture::bare();
    fixture.write_configuration(&json!({
        "url": "http://localhost:8000",
        "schemas": {}
    }));
    let error = fixture.run().unwrap_err();
    let IndexError::Configuration(error) = error else {
        panic!("expected a configuration error, got {error}");
    };
    assert!(error.message.contains("port"), "got: {}", error.message);
}

#[test]
fn schemas_without_declared_identifiers_use_their_path() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "nested/plain.json",
        &json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object"
        }),
    );
    fixture.run().unwrap();

    let materialised = fixture.read_artifact("schemas/example/nested/plain.json");
    assert_eq!(
        materialised.get("$id").and_then(Value::as_str),
        Some("http://localhost:8000/example/nested/plain.json")
    );
}

#[test]
fn materialised_documents_never_point_at_the_server_origin() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "a.json",
        &draft_2020_12("https://example.com/schemas/a", json!({})),
    );
    fixture.write_schema(
        "nested/c.json",
        &draft_2020_12(
            "https://example.com/schemas/nested/c",
            json!({
                "properties": {
                    "up": { "$ref": "https://example.com/schemas/a" }
                }
            }),
        ),
    );
    fixture.run().unwrap();

    let contents =
        serde_json::to_string(&fixture.read_artifact("schemas/example/nested/c.json")).unwrap();
    // Every same-registry reference must be relative.
    let materialised = fixture.read_artifact("schemas/example/nested/c.json");
    assert_eq!(
        materialised["properties"]["up"]["$ref"],
        "../a.json",
        "in {contents}"
    );
}

#[test]
fn exit_is_clean_on_an_empty_collection() {
    let fixture = Fixture::new();
    fixture.run().unwrap();
    assert!(fixture.artifact("explorer/index.html").exists());
    let summary = fixture.read_artifact("configuration.json");
    assert_eq!(summary["port"], 8000);
    assert_eq!(summary["url"], "http://localhost:8000");
}

#[test]
fn removed_collections_disappear_from_the_output() {
    let fixture = Fixture::new();
    fixture.write_schema(
        "a.json",
        &draft_2020_12("https://example.com/schemas/a", json!({})),
    );
    fixture.run().unwrap();
    assert!(fixture.artifact("schemas/example/a.json").exists());

    fixture.write_configuration(&json!({
        "url": "http://localhost:8000",
        "port": 8000,
        "schemas": {}
    }));
    fixture.run().unwrap();
    assert!(!fixture.artifact("schemas/example/a.json").exists());
    // The output root itself survives with the run-level artifacts.
    assert!(fixture.artifact("configuration.json").exists());
    let _ = fs::metadata(fixture.artifact("explorer/index.html")).unwrap();
}
