//! The incremental build engine and tracked output tree.
//!
//! Every artifact is produced through [`Output::build`], which checks the
//! destination's recorded dependency set for freshness before invoking the
//! handler, and records the (possibly grown) dependency set afterwards.
//! Whatever the engine saw at construction but never touched during the run
//! is garbage: [`Output::collect_garbage`] removes it.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::IndexError;

const TRACKER_ERR: &str = "output tracker poisoned; a build handler panicked";

/// A dynamic-dependency collector handed to build handlers.
pub type DependencyCallback<'a> = &'a mut dyn FnMut(PathBuf);

/// The tracked output tree.
#[derive(Debug)]
pub struct Output {
    root: PathBuf,
    tracker: Mutex<HashMap<PathBuf, bool>>,
}

impl Output {
    /// Creates the output root if needed and indexes every file already
    /// under it.
    ///
    /// # Errors
    /// Fails when the tree cannot be created or walked.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, IndexError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| IndexError::io(&root, source))?;
        let root = root
            .canonicalize()
            .map_err(|source| IndexError::io(&root, source))?;

        let mut tracker = HashMap::new();
        for entry in WalkDir::new(&root) {
            let entry = entry.map_err(|error| IndexError::Io {
                path: root.clone(),
                source: error.into(),
            })?;
            if entry.file_type().is_file() {
                tracker.insert(entry.into_path(), false);
            }
        }

        Ok(Self {
            root,
            tracker: Mutex::new(tracker),
        })
    }

    /// The canonical output root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a relative artifact path against the output root.
    #[must_use]
    pub fn resolve(&self, relative: &Path) -> PathBuf {
        debug_assert!(relative.is_relative());
        self.root.join(relative)
    }

    /// Marks a path as produced by this run.
    pub fn track(&self, path: &Path) {
        self.tracker
            .lock()
            .expect(TRACKER_ERR)
            .insert(path.to_path_buf(), true);
    }

    /// Builds `destination` unless it is fresh with respect to its recorded
    /// dependency set. Returns whether the handler ran.
    ///
    /// The handler receives the destination, the declared dependencies and a
    /// callback through which it can register further inputs it discovers;
    /// after it returns, the destination must exist.
    ///
    /// # Errors
    /// Propagates handler failures and I/O errors.
    pub fn build<Context>(
        &self,
        destination: &Path,
        dependencies: &[PathBuf],
        context: &Context,
        handler: impl FnOnce(&Path, &[PathBuf], DependencyCallback, &Context) -> Result<(), IndexError>,
    ) -> Result<bool, IndexError> {
        let deps_path = deps_path(destination);
        if is_fresh(destination, &deps_path)? {
            self.track(destination);
            self.track(&deps_path);
            debug!(destination = %destination.display(), "fresh");
            return Ok(false);
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|source| IndexError::io(parent, source))?;
        }

        let mut dynamic: Vec<PathBuf> = Vec::new();
        handler(
            destination,
            dependencies,
            &mut |discovered| dynamic.push(discovered),
            context,
        )?;
        if !destination.exists() {
            return Err(IndexError::MissingArtifact {
                path: destination.to_path_buf(),
            });
        }
        self.track(destination);

        let mut recorded: Vec<String> = dependencies
            .iter()
            .chain(dynamic.iter())
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        recorded.sort();
        recorded.dedup();
        let serialised = serde_json::to_vec(&recorded).map_err(|error| IndexError::Deserialize {
            path: deps_path.clone(),
            message: error.to_string(),
        })?;
        fs::write(&deps_path, serialised).map_err(|source| IndexError::io(&deps_path, source))?;
        self.track(&deps_path);
        Ok(true)
    }

    /// Deletes every file the engine saw at construction but never touched,
    /// pruning directories that end up empty. Returns the removed paths.
    ///
    /// # Errors
    /// Fails when a stale file cannot be removed.
    pub fn collect_garbage(self) -> Result<Vec<PathBuf>, IndexError> {
        let tracker = self.tracker.into_inner().expect(TRACKER_ERR);
        let mut removed = Vec::new();
        for (path, touched) in tracker {
            if touched {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "collected");
                    removed.push(path);
                }
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(source) => return Err(IndexError::io(&path, source)),
            }
        }

        // Directories emptied by the sweep serve nothing.
        let mut directories: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_dir())
            .map(walkdir::DirEntry::into_path)
            .collect();
        directories.sort_by_key(|directory| std::cmp::Reverse(directory.components().count()));
        for directory in directories {
            if directory != self.root {
                let _ = fs::remove_dir(&directory);
            }
        }

        Ok(removed)
    }
}

/// The sidecar path recording an artifact's dependency set.
#[must_use]
pub fn deps_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".deps");
    PathBuf::from(name)
}

fn is_fresh(destination: &Path, deps_path: &Path) -> Result<bool, IndexError> {
    if !destination.exists() || !deps_path.exists() {
        return Ok(false);
    }
    let raw = fs::read(deps_path).map_err(|source| IndexError::io(deps_path, source))?;
    let Ok(Value::Array(entries)) = serde_json::from_slice::<Value>(&raw) else {
        // A corrupt sidecar just forces a rebuild.
        return Ok(false);
    };
    let destination_modified = modified(destination)?;
    for entry in entries {
        let Some(path) = entry.as_str() else {
            return Ok(false);
        };
        let path = Path::new(path);
        if !path.exists() || modified(path)? > destination_modified {
            return Ok(false);
        }
    }
    Ok(true)
}

fn modified(path: &Path) -> Result<SystemTime, IndexError> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|source| IndexError::io(path, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn builds_once_then_reuses() {
        let directory = tempfile::tempdir().unwrap();
        let input = directory.path().join("input.txt");
        touch(&input, "payload");

        let output = Output::new(directory.path().join("out")).unwrap();
        let destination = output.resolve(Path::new("artifact"));
        let dependencies = vec![input.clone()];

        let built = output
            .build(&destination, &dependencies, &(), |destination, _, _, _| {
                fs::write(destination, "result").map_err(|source| IndexError::io(destination, source))
            })
            .unwrap();
        assert!(built);

        let rebuilt = output
            .build(&destination, &dependencies, &(), |_, _, _, _| {
                panic!("must not rebuild a fresh artifact")
            })
            .unwrap();
        assert!(!rebuilt);
    }

    #[test]
    fn stale_dependencies_force_a_rebuild() {
        let directory = tempfile::tempdir().unwrap();
        let input = directory.path().join("input.txt");
        touch(&input, "payload");

        let output = Output::new(directory.path().join("out")).unwrap();
        let destination = output.resolve(Path::new("artifact"));
        let dependencies = vec![input.clone()];

        output
            .build(&destination, &dependencies, &(), |destination, _, _, _| {
                fs::write(destination, "one").map_err(|source| IndexError::io(destination, source))
            })
            .unwrap();

        // Push the input's mtime past the artifact's.
        let future = SystemTime::now() + std::time::Duration::from_secs(5);
        let file = fs::File::options().write(true).open(&input).unwrap();
        file.set_modified(future).unwrap();

        let rebuilt = output
            .build(&destination, &dependencies, &(), |destination, _, _, _| {
                fs::write(destination, "two").map_err(|source| IndexError::io(destination, source))
            })
            .unwrap();
        assert!(rebuilt);
    }

    #[test]
    fn dynamic_dependencies_are_recorded() {
        let directory = tempfile::tempdir().unwrap();
        let input = directory.path().join("input.txt");
        let discovered = directory.path().join("discovered.txt");
        touch(&input, "payload");
        touch(&discovered, "extra");

        let output = Output::new(directory.path().join("out")).unwrap();
        let destination = output.resolve(Path::new("artifact"));

        output
            .build(
                &destination,
                &[input.clone()],
                &discovered,
                |destination, _, add, discovered| {
                    add(discovered.clone());
                    fs::write(destination, "result")
                        .map_err(|source| IndexError::io(destination, source))
                },
            )
            .unwrap();

        let sidecar = fs::read_to_string(deps_path(&destination)).unwrap();
        assert!(sidecar.contains("discovered.txt"));
        assert!(sidecar.contains("input.txt"));
    }

    #[test]
    fn garbage_is_collected() {
        let directory = tempfile::tempdir().unwrap();
        let stale = directory.path().join("out/old/stale.bin");
        touch(&stale, "junk");

        let output = Output::new(directory.path().join("out")).unwrap();
        let destination = output.resolve(Path::new("kept"));
        output
            .build(&destination, &[], &(), |destination, _, _, _| {
                fs::write(destination, "fresh").map_err(|source| IndexError::io(destination, source))
            })
            .unwrap();

        let removed = output.collect_garbage().unwrap();
        assert_eq!(removed.len(), 1);
        assert!(!stale.exists());
        assert!(!stale.parent().unwrap().exists());
        assert!(destination.exists());
    }

    #[test]
    fn handlers_must_produce_their_destination() {
        let directory = tempfile::tempdir().unwrap();
        let output = Output::new(directory.path().join("out")).unwrap();
        let destination = output.resolve(Path::new("artifact"));
        let outcome = output.build(&destination, &[], &(), |_, _, _, _| Ok(()));
        assert!(matches!(outcome, Err(IndexError::MissingArtifact { .. })));
    }
}
