//! The class list shared by the encoder and the target decoder.

use crate::{
    common::*,
    error::{Error, Result},
};

/// PASCAL VOC class names in the order of the one-hot class slots.
pub const VOC_CLASSES: [&str; 20] = [
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "diningtable",
    "dog",
    "horse",
    "motorbike",
    "person",
    "pottedplant",
    "sheep",
    "sofa",
    "train",
    "tvmonitor",
];

/// Ordered, duplicate-free list of class names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassList {
    classes: IndexSet<String>,
}

impl ClassList {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let classes: IndexSet<String> = names.iter().cloned().collect();

        if names.len() != classes.len() {
            let dups = names.iter().duplicates().join(", ");
            return Err(Error::InvalidConfig(format!(
                "duplicated class names: {}",
                dups
            )));
        }
        if classes.is_empty() {
            return Err(Error::InvalidConfig("the class list is empty".into()));
        }

        Ok(Self { classes })
    }

    pub fn voc() -> Self {
        Self {
            classes: VOC_CLASSES.iter().map(|&name| name.to_owned()).collect(),
        }
    }

    /// Load a class list with one class name per line.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(Error::io(path))?;
        Self::new(content.lines().map(str::trim).filter(|line| !line.is_empty()))
    }

    /// Case-sensitive exact lookup.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.classes
            .get_index_of(name)
            .ok_or_else(|| Error::UnknownClass {
                name: name.to_owned(),
            })
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.classes.get_index(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(String::as_str)
    }
}

impl Default for ClassList {
    fn default() -> Self {
        Self::voc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voc_class_order() {
        let classes = ClassList::voc();
        assert_eq!(classes.len(), 20);
        assert_eq!(classes.index_of("aeroplane").unwrap(), 0);
        assert_eq!(classes.index_of("person").unwrap(), 14);
        assert_eq!(classes.name(19), Some("tvmonitor"));
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let classes = ClassList::voc();
        assert!(matches!(
            classes.index_of("Person"),
            Err(Error::UnknownClass { name }) if name == "Person"
        ));
    }

    #[test]
    fn duplicated_classes_rejected() {
        assert!(ClassList::new(["cat", "dog", "cat"]).is_err());
        assert!(ClassList::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn load_classes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.txt");
        fs::write(&path, "cat\ndog\n\nbird\n").unwrap();

        let classes = ClassList::load(&path).unwrap();
        assert_eq!(classes.iter().collect::<Vec<_>>(), ["cat", "dog", "bird"]);
    }
}
