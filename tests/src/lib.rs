//! Shared scaffolding for the end-to-end suites: a temporary registry tree
//! with a configuration, schema files, and accessors for the artifacts a
//! run produces.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

use kiln_core::{metapack, IndexError, MetaPack};

/// A disposable registry: configuration, collection directory and output
/// tree under one temporary root.
pub struct Fixture {
    root: TempDir,
    /// The output directory runs write into.
    pub output: PathBuf,
}

impl Fixture {
    /// Creates an empty fixture with the standard minimal configuration: one
    /// collection named `example` over `schemas/`, based at
    /// `https://example.com/schemas`.
    #[must_use]
    pub fn new() -> Self {
        let fixture = Self::bare();
        fixture.write_configuration(&json!({
            "url": "http://localhost:8000",
            "port": 8000,
            "schemas": {
                "example": { "path": "schemas", "base": "https://example.com/schemas" }
            }
        }));
        fixture
    }

    /// Creates a fixture without a configuration file.
    #[must_use]
    pub fn bare() -> Self {
        let root = TempDir::new().expect("failed to create a temporary directory");
        let output = root.path().join("output");
        fs::create_dir_all(root.path().join("schemas")).expect("failed to create the collection");
        Self { root, output }
    }

    /// The fixture's root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Writes the configuration file.
    pub fn write_configuration(&self, value: &Value) {
        let path = self.root.path().join("config.json");
        fs::write(&path, serde_json::to_string_pretty(value).unwrap())
            .expect("failed to write the configuration");
    }

    /// Writes a schema file under the collection directory.
    pub fn write_schema(&self, relative: &str, value: &Value) {
        let path = self.root.path().join("schemas").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, serde_json::to_string_pretty(value).unwrap())
            .expect("failed to write the schema");
    }

    /// Writes a raw file under the collection directory.
    pub fn write_raw(&self, relative: &str, contents: &str) {
        let path = self.root.path().join("schemas").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).expect("failed to write the file");
    }

    /// Deletes a schema file.
    pub fn remove_schema(&self, relative: &str) {
        fs::remove_file(self.root.path().join("schemas").join(relative))
            .expect("failed to remove the schema");
    }

    /// The options a run uses.
    #[must_use]
    pub fn options(&self) -> kiln::Options {
        kiln::Options {
            configuration: self.root.path().join("config.json"),
            output: self.output.clone(),
            collections: self.root.path().to_path_buf(),
        }
    }

    /// Runs the indexer over the fixture.
    ///
    /// # Errors
    /// Whatever the run fails with.
    pub fn run(&self) -> Result<(), IndexError> {
        kiln::run(&self.options())
    }

    /// Absolute path of an artifact under the output tree.
    #[must_use]
    pub fn artifact(&self, relative: &str) -> PathBuf {
        self.output.join(relative)
    }

    /// Reads an artifact's JSON payload.
    ///
    /// # Panics
    /// Panics when the artifact is missing or malformed.
    #[must_use]
    pub fn read_artifact(&self, relative: &str) -> Value {
        metapack::read_json(&self.artifact(relative)).expect("failed to read the artifact")
    }

    /// Reads an artifact's payload together with its metadata.
    ///
    /// # Panics
    /// Panics when the artifact is missing or malformed.
    #[must_use]
    pub fn read_artifact_with_meta(&self, relative: &str) -> MetaPack<Value> {
        metapack::read_json_with_meta(&self.artifact(relative))
            .expect("failed to read the artifact")
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A schema document in the 2020-12 dialect with the given extra members.
#[must_use]
pub fn draft_2020_12(identifier: &str, mut extra: Value) -> Value {
    let mut schema = json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": identifier
    });
    if let (Some(schema), Some(extra)) = (schema.as_object_mut(), extra.as_object_mut()) {
        schema.append(extra);
    }
    schema
}
