//! Landmark map and nearest-landmark data association.
//!
//! The landmark set is static and read-only; it is shared by every particle during the weight
//! update. Association is a linear scan by Euclidean distance in the map frame. Ties resolve to
//! the first minimal landmark in iteration order, which keeps the result deterministic.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use crate::error::{FilterError, Result};
use crate::geometry::distance;

/// A single known landmark in the global map frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub id: i32,
    pub x: f64,
    pub y: f64,
}
impl Landmark {
    pub fn new(id: i32, x: f64, y: f64) -> Self {
        Landmark { id, x, y }
    }
}
impl Display for Landmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Landmark {} at ({:.4}, {:.4})", self.id, self.x, self.y)
    }
}
impl From<(i32, f64, f64)> for Landmark {
    fn from(tuple: (i32, f64, f64)) -> Self {
        Landmark::new(tuple.0, tuple.1, tuple.2)
    }
}

/// The read-only set of known landmarks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkMap {
    landmarks: Vec<Landmark>,
}
impl LandmarkMap {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        LandmarkMap { landmarks }
    }
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Landmark> {
        self.landmarks.iter()
    }
    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }
    /// Look up a landmark by id.
    pub fn get(&self, id: i32) -> Option<&Landmark> {
        self.landmarks.iter().find(|landmark| landmark.id == id)
    }
    /// Nearest landmark to a map-frame point. See [`nearest_landmark`].
    pub fn nearest(&self, x: f64, y: f64) -> Result<&Landmark> {
        nearest_landmark(&self.landmarks, x, y)
    }
}
impl From<Vec<Landmark>> for LandmarkMap {
    fn from(landmarks: Vec<Landmark>) -> Self {
        LandmarkMap::new(landmarks)
    }
}
impl FromIterator<Landmark> for LandmarkMap {
    fn from_iter<I: IntoIterator<Item = Landmark>>(iter: I) -> Self {
        LandmarkMap::new(iter.into_iter().collect())
    }
}
impl<'a> IntoIterator for &'a LandmarkMap {
    type Item = &'a Landmark;
    type IntoIter = std::slice::Iter<'a, Landmark>;
    fn into_iter(self) -> Self::IntoIter {
        self.landmarks.iter()
    }
}

/// Find the landmark closest to the map-frame point `(x, y)`.
///
/// Performs an O(L) scan. Only a strictly smaller distance replaces the current best, so the
/// first minimal landmark in slice order wins a tie.
///
/// # Errors
/// [`FilterError::EmptyLandmarkSet`] when `landmarks` is empty; checked before any distance is
/// computed.
///
/// # Example
/// ```rust
/// use landmark_pf::map::{Landmark, nearest_landmark};
/// let landmarks = vec![Landmark::new(1, 0.0, 0.0), Landmark::new(2, 10.0, 10.0)];
/// assert_eq!(nearest_landmark(&landmarks, 1.0, 1.0).unwrap().id, 1);
/// ```
pub fn nearest_landmark(landmarks: &[Landmark], x: f64, y: f64) -> Result<&Landmark> {
    let (first, rest) = landmarks
        .split_first()
        .ok_or(FilterError::EmptyLandmarkSet)?;
    let mut nearest = first;
    let mut nearest_distance = distance(first.x, first.y, x, y);
    for landmark in rest {
        let d = distance(landmark.x, landmark.y, x, y);
        if d < nearest_distance {
            nearest = landmark;
            nearest_distance = d;
        }
    }
    Ok(nearest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_landmarks() -> LandmarkMap {
        LandmarkMap::new(vec![Landmark::new(1, 0.0, 0.0), Landmark::new(2, 10.0, 10.0)])
    }

    #[test]
    fn nearest_picks_closest() {
        let map = two_landmarks();
        assert_eq!(map.nearest(1.0, 1.0).unwrap().id, 1);
        assert_eq!(map.nearest(9.0, 8.0).unwrap().id, 2);
    }

    #[test]
    fn nearest_tie_resolves_to_first_listed() {
        let map = two_landmarks();
        assert_eq!(map.nearest(5.0, 5.0).unwrap().id, 1);

        let reversed: LandmarkMap = vec![Landmark::new(2, 10.0, 10.0), Landmark::new(1, 0.0, 0.0)]
            .into_iter()
            .collect();
        assert_eq!(reversed.nearest(5.0, 5.0).unwrap().id, 2);
    }

    #[test]
    fn nearest_on_empty_map_fails() {
        let map = LandmarkMap::default();
        assert_eq!(map.nearest(0.0, 0.0), Err(FilterError::EmptyLandmarkSet));
        assert_eq!(
            nearest_landmark(&[], 1.0, 2.0),
            Err(FilterError::EmptyLandmarkSet)
        );
    }

    #[test]
    fn lookup_by_id() {
        let map = two_landmarks();
        assert_eq!(map.get(2), Some(&Landmark::new(2, 10.0, 10.0)));
        assert!(map.get(3).is_none());
        assert_eq!(map.len(), 2);
        assert!(!map.is_empty());
        assert_eq!((&map).into_iter().count(), 2);
    }
}
