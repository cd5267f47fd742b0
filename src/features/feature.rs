/// Descriptor family produced by a feature extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DescriptorKind {
    Sift,
    Surf,
}

/// A local image feature.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Feature {
    /// Column coordinate, sub-pixel
    pub x: f32,
    /// Row coordinate, sub-pixel
    pub y: f32,
    pub scale: f32,
    pub orientation: f32,
    pub descriptor: Vec<f32>,
}

impl Feature {
    pub fn new(x: f32, y: f32, descriptor: Vec<f32>) -> Self {
        Self {
            x,
            y,
            scale: 1.0,
            orientation: 0.0,
            descriptor,
        }
    }

    #[inline]
    pub fn location(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    /// Squared Euclidean distance between descriptors.
    ///
    /// Descriptors of different length are compared over their common prefix.
    pub fn distance_sq(&self, other: &Feature) -> f32 {
        self.descriptor
            .iter()
            .zip(&other.descriptor)
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

/// Ordered features extracted from one frame. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FeatureSet {
    features: Vec<Feature>,
}

impl FeatureSet {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Feature> {
        self.features.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn as_slice(&self) -> &[Feature] {
        &self.features
    }
}

impl From<Vec<Feature>> for FeatureSet {
    fn from(features: Vec<Feature>) -> Self {
        Self::new(features)
    }
}

impl<'a> IntoIterator for &'a FeatureSet {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}

/// A pair of features, one per frame, accepted by the ratio test.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Correspondence {
    /// Index into the first (query) set
    pub query: usize,
    /// Index into the second (train) set
    pub train: usize,
    /// Squared descriptor distance of the accepted match
    pub distance_sq: f32,
    /// (x, y) of the query feature
    pub source: (f32, f32),
    /// (x, y) of the train feature
    pub target: (f32, f32),
}
