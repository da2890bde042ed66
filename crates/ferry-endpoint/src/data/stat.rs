use serde::{Deserialize, Serialize};

/// Metadata snapshot of a file or directory.
///
/// Directory sizes are the recursive sum of their children. A `Stat` is never
/// mutated after a resource hands it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stat {
    pub name:     String,
    pub size:     u64,
    pub is_dir:   bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Stat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id:       Option<String>,
}

impl Stat {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            is_dir: false,
            children: Vec::new(),
            id: None,
        }
    }

    /// Directory whose size is the sum of `children`.
    pub fn dir(name: impl Into<String>, children: Vec<Stat>) -> Self {
        let size = children.iter().map(|c| c.size).fold(0u64, u64::saturating_add);
        Self {
            name: name.into(),
            size,
            is_dir: true,
            children,
            id: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Size recomputed from the leaves, independent of the cached `size` fields.
    pub fn total_size(&self) -> u64 {
        if self.is_dir {
            self.children.iter().map(Stat::total_size).fold(0u64, u64::saturating_add)
        } else {
            self.size
        }
    }

    /// Leaf files below this entry, named by their `/`-joined path relative to it.
    ///
    /// A file returns itself unchanged.
    pub fn files(&self) -> Vec<Stat> {
        if !self.is_dir {
            return vec![self.clone()];
        }
        let mut out = Vec::new();
        for child in &self.children {
            collect(child, "", &mut out);
        }
        out
    }
}

fn collect(stat: &Stat, prefix: &str, out: &mut Vec<Stat>) {
    let relative = if prefix.is_empty() {
        stat.name.clone()
    } else {
        format!("{prefix}/{}", stat.name)
    };
    if stat.is_dir {
        for child in &stat.children {
            collect(child, &relative, out);
        }
    } else {
        out.push(Stat {
            name: relative,
            ..stat.clone()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Stat {
        Stat::dir("root", vec![
            Stat::file("a.txt", 10),
            Stat::dir("nested", vec![Stat::file("b.bin", 20), Stat::dir("empty", vec![])]),
            Stat::file("c.txt", 5),
        ])
    }

    #[test]
    fn test_dir_size_is_recursive_sum() {
        let stat = tree();
        assert_eq!(stat.size, 35);
        assert_eq!(stat.total_size(), 35);
    }

    #[test]
    fn test_files_flattens_with_relative_names() {
        let names: Vec<_> = tree().files().into_iter().map(|f| f.name).collect();
        assert_eq!(names, ["a.txt", "nested/b.bin", "c.txt"]);
    }

    #[test]
    fn test_files_of_single_file() {
        let file = Stat::file("only.dat", 3);
        assert_eq!(file.files(), vec![file]);
    }

    #[test]
    fn test_serde_camel_case() {
        let json = serde_json::to_value(Stat::file("x", 1)).unwrap();
        assert_eq!(json["isDir"], false);
        assert!(json.get("children").is_none());
    }
}
