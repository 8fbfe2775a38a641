use std::{io, path::Path};

use crate::{Error, Result};

/// Class names in model output order.
///
/// The labels file holds one `<index> <name>` entry per line. Only the name is
/// kept; entries are taken in file order, so the index column is informative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    names: Vec<String>,
}

impl Labels {
    pub fn new(names: Vec<String>) -> Result<Self> {
        if names.is_empty() {
            return Err(Error::labels("labels file has no entries"));
        }
        Ok(Self { names })
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut names = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((_, name)) = line.split_once(' ') else {
                return Err(Error::labels(format!(
                    "line {}: expected `<index> <name>`, got {line:?}",
                    lineno + 1
                )));
            };
            names.push(name.trim().to_owned());
        }
        Self::new(names)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(Error::LabelsNotFound {
                path: path.to_owned(),
            }),
            Err(e) => Err(Error::labels(format!("{}: {e}", path.display()))),
        }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }
}
