use core::ops::Index;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// The allergen categories, in the order that indexes every score and label vector.
pub const LABELS: [&str; 9] = [
    "peanuts",
    "tree_nuts",
    "milk",
    "eggs",
    "fish",
    "shellfish",
    "wheat_gluten",
    "soy",
    "sesame",
];

/// Number of allergen categories.
pub const N_LABELS: usize = LABELS.len();

/// Returns the position of `label` in [`LABELS`].
pub fn label_index(label: &str) -> Option<usize> {
    LABELS.iter().position(|&l| l == label)
}

/// One value per allergen, serialized as a map in [`LABELS`] order.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelMap<T>([T; N_LABELS]);

impl<T> LabelMap<T> {
    pub const fn new(values: [T; N_LABELS]) -> Self {
        Self(values)
    }

    /// Gets the value of the given allergen.
    pub fn get(&self, label: &str) -> Option<&T> {
        label_index(label).map(|i| &self.0[i])
    }

    /// Iterates over `(label, value)` pairs in [`LABELS`] order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &T)> {
        LABELS.iter().copied().zip(self.0.iter())
    }

    pub fn values(&self) -> &[T] {
        &self.0
    }
}

impl<T> Index<&str> for LabelMap<T> {
    type Output = T;

    fn index(&self, label: &str) -> &T {
        match self.get(label) {
            Some(v) => v,
            None => panic!("unknown allergen label: {label}"),
        }
    }
}

impl<T> Serialize for LabelMap<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(N_LABELS))?;
        for (label, value) in self.iter() {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}
