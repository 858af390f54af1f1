use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 已加载的 bean 配置路径集合（有序、去重）
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InitPaths {
    paths: BTreeSet<String>,
}

impl InitPaths {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(Into::into)
                .map(|p: String| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// `other` 中的每个路径都已加载
    pub fn covers(&self, other: &InitPaths) -> bool {
        other.paths.is_subset(&self.paths)
    }

    /// `other` 中第一个未加载的路径
    pub fn first_missing<'a>(&self, other: &'a InitPaths) -> Option<&'a str> {
        other
            .paths
            .iter()
            .find(|p| !self.paths.contains(p.as_str()))
            .map(String::as_str)
    }

    pub fn union(&self, other: &InitPaths) -> InitPaths {
        InitPaths {
            paths: self.paths.union(&other.paths).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

impl fmt::Display for InitPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (index, path) in self.paths.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", path)?;
        }
        write!(f, "]")
    }
}
