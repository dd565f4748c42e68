use crate::prelude::{CoreError, CoreResult};
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Named numeric arrays exposed by an opened archive file.
pub trait ArrayReader {
    fn array(&self, key: &str) -> Option<ArrayViewD<'_, f64>>;
}

/// Opens archive files into an [`ArrayReader`].
pub trait SourceOpener: Send + Sync {
    type Reader: ArrayReader;

    /// Failures are reported as [`CoreError::MalformedSource`].
    fn open(&self, path: &Path) -> CoreResult<Self::Reader>;
}

/// In-memory set of named arrays.
#[derive(Debug, Clone, Default)]
pub struct ArrayStore {
    arrays: HashMap<String, ArrayD<f64>>,
}

impl ArrayStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, array: ArrayD<f64>) {
        self.arrays.insert(key.into(), array);
    }

    pub fn with(mut self, key: impl Into<String>, array: ArrayD<f64>) -> Self {
        self.insert(key, array);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<ArrayD<f64>> {
        self.arrays.remove(key)
    }

    /// Parses the JSON archive layout; `path` is only used in error messages.
    pub fn from_json(path: &Path, text: &str) -> CoreResult<Self> {
        let document: ArchiveDocument = serde_json::from_str(text).map_err(|err| {
            CoreError::malformed(path, format!("invalid archive document: {}", err))
        })?;

        let mut store = ArrayStore::new();
        for (key, named) in document.arrays {
            let data = named
                .data
                .into_iter()
                .map(|value| value.unwrap_or(f64::NAN))
                .collect::<Vec<_>>();
            let array = ArrayD::from_shape_vec(IxDyn(&named.shape), data).map_err(|err| {
                CoreError::malformed(
                    path,
                    format!("array `{}` does not fit its shape: {}", key, err),
                )
            })?;
            store.insert(key, array);
        }
        Ok(store)
    }

    /// Serializes to the JSON archive layout. NaN values are written as `null`.
    pub fn to_json(&self) -> CoreResult<String> {
        let arrays = self
            .arrays
            .iter()
            .map(|(key, array)| {
                let named = NamedArray {
                    shape: array.shape().to_vec(),
                    data: array
                        .iter()
                        .map(|&v| if v.is_nan() { None } else { Some(v) })
                        .collect(),
                };
                (key.clone(), named)
            })
            .collect();
        serde_json::to_string(&ArchiveDocument { arrays })
            .map_err(|err| {
                CoreError::InvalidArgument(format!("cannot serialize arrays: {}", err))
            })
    }
}

impl ArrayReader for ArrayStore {
    fn array(&self, key: &str) -> Option<ArrayViewD<'_, f64>> {
        self.arrays.get(key).map(|array| array.view())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveDocument {
    arrays: BTreeMap<String, NamedArray>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NamedArray {
    shape: Vec<usize>,
    data: Vec<Option<f64>>,
}

/// Opener for archives stored as JSON array documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonArchive;

impl SourceOpener for JsonArchive {
    type Reader = ArrayStore;

    fn open(&self, path: &Path) -> CoreResult<ArrayStore> {
        let text = fs::read_to_string(path)
            .map_err(|err| CoreError::malformed(path, format!("cannot read file: {}", err)))?;
        ArrayStore::from_json(path, &text)
    }
}
