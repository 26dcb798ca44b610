//! Arena of hyperplanes and polytopes.
//!
//! Every polytope is stored once and referred to by its [`PolytopeId`], which
//! is also its creation order. Element lists, coordinates, and bounding boxes
//! are computed lazily and cached.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, Mul, Neg};
use std::sync::Arc;

use eyre::{OptionExt, Result};
use hypercsg_math::prelude::*;
use itertools::Itertools;
use parking_lot::Mutex;
use smallvec::SmallVec;

mod elements;
mod hyperplane;
mod polytope;
mod signed;

pub use elements::{ElementLists, Incidences};
pub use hyperplane::HyperplaneData;
pub use polytope::{BoundingBox, PolytopeData};
pub use signed::SignedPolytope;

use crate::CsgParams;

hypercsg_math::idx_struct! {
    /// ID for a hyperplane in a [`Space`].
    pub struct HyperplaneId(pub u32);
    /// ID for a polytope in a [`Space`].
    pub struct PolytopeId(pub u32);
}

/// Sorted list of hyperplanes.
pub type HyperplaneSet = SmallVec<[HyperplaneId; 4]>;

/// Arena containing polytopes and the hyperplanes that bound them.
pub struct Space {
    params: CsgParams,

    hyperplanes: GenericVec<HyperplaneId, HyperplaneData>,
    polytopes: GenericVec<PolytopeId, PolytopeData>,

    cached_coords: Mutex<HashMap<PolytopeId, Option<Vector>>>,
    cached_bboxes: Mutex<HashMap<PolytopeId, Option<BoundingBox>>>,
    cached_elements: Mutex<HashMap<PolytopeId, Arc<ElementLists>>>,
    cached_incidences: Mutex<HashMap<PolytopeId, Arc<Incidences>>>,
}

impl fmt::Debug for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Space")
            .field("params", &self.params)
            .field("hyperplane_count", &self.hyperplanes.len())
            .field("polytope_count", &self.polytopes.len())
            .finish()
    }
}

impl Default for Space {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<PolytopeId> for Space {
    type Output = PolytopeData;

    fn index(&self, index: PolytopeId) -> &Self::Output {
        &self.polytopes[index]
    }
}
impl Index<HyperplaneId> for Space {
    type Output = HyperplaneData;

    fn index(&self, index: HyperplaneId) -> &Self::Output {
        &self.hyperplanes[index]
    }
}

impl Space {
    /// Constructs a new empty space with default parameters.
    pub fn new() -> Self {
        Self::with_params(CsgParams::default())
    }

    /// Constructs a new empty space.
    pub fn with_params(params: CsgParams) -> Self {
        Self {
            params,

            hyperplanes: GenericVec::new(),
            polytopes: GenericVec::new(),

            cached_coords: Mutex::new(HashMap::new()),
            cached_bboxes: Mutex::new(HashMap::new()),
            cached_elements: Mutex::new(HashMap::new()),
            cached_incidences: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the parameters of the space.
    pub fn params(&self) -> &CsgParams {
        &self.params
    }

    /// Returns the number of polytopes in the space.
    pub fn polytope_count(&self) -> usize {
        self.polytopes.len()
    }
    /// Returns the number of hyperplanes in the space.
    pub fn hyperplane_count(&self) -> usize {
        self.hyperplanes.len()
    }
    /// Returns the ID that the next polytope will receive. Every polytope with
    /// an ID greater than or equal to this one was created afterwards.
    pub fn next_polytope_id(&self) -> PolytopeId {
        PolytopeId(self.polytopes.len() as u32)
    }

    /// Returns an iterator over all hyperplane IDs.
    pub fn hyperplane_ids(&self) -> impl Iterator<Item = HyperplaneId> {
        self.hyperplanes.iter_keys()
    }

    /// Adds a hyperplane to the space.
    pub fn add_hyperplane(&mut self, data: HyperplaneData) -> Result<HyperplaneId, IndexOverflow> {
        self.hyperplanes.push(data)
    }
    /// Adds the hyperplane `normal · p = offset` to the space.
    pub fn add_hyperplane_from_equation(
        &mut self,
        normal: impl VectorRef,
        offset: Float,
    ) -> Result<HyperplaneId> {
        let data = HyperplaneData::from_equation(normal, offset)
            .ok_or_eyre("hyperplane normal vector is zero")?;
        Ok(self.add_hyperplane(data)?)
    }
    /// Adds the hyperplane through `points` to the space.
    pub fn add_hyperplane_from_spanning_points(
        &mut self,
        points: Vec<Vector>,
        ndim: u8,
    ) -> Result<HyperplaneId> {
        let data = HyperplaneData::from_spanning_points(points, ndim)
            .ok_or_eyre("hyperplane spanning points are degenerate")?;
        Ok(self.add_hyperplane(data)?)
    }

    /// Adds a polytope to the space.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if a facet has the wrong rank or lives in a
    /// different space.
    pub fn add_polytope(&mut self, mut data: PolytopeData) -> Result<PolytopeId, IndexOverflow> {
        data.hyperplanes.sort_unstable();
        data.hyperplanes.dedup();
        if cfg!(debug_assertions) {
            for f in &data.facets {
                let facet = &self[f.id];
                assert_eq!(facet.ndim, data.ndim, "facet {f} has wrong ndim");
                assert_eq!(facet.rank + 1, data.rank, "facet {f} has wrong rank");
            }
        }
        self.polytopes.push(data)
    }

    /// Adds a vertex to the space. If `coords` is `None`, then the coordinates
    /// are computed from the hyperplanes when needed.
    pub fn add_vertex(
        &mut self,
        ndim: u8,
        coords: Option<Vector>,
        hyperplanes: HyperplaneSet,
    ) -> Result<PolytopeId, IndexOverflow> {
        self.add_polytope(PolytopeData::vertex(ndim, coords, hyperplanes))
    }

    /// Returns a new empty polytope of the given rank. It has no facets and an
    /// initial density of zero.
    pub fn empty(&mut self, rank: u8, ndim: u8) -> Result<SignedPolytope, IndexOverflow> {
        let id = self.add_polytope(PolytopeData::new(rank, ndim, vec![], SmallVec::new()))?;
        Ok(SignedPolytope::new(id, Sign::Pos, 0))
    }
    /// Returns all of space: a polytope with no facets and an initial density
    /// of one.
    pub fn whole(&mut self, rank: u8, ndim: u8) -> Result<SignedPolytope, IndexOverflow> {
        Ok(self.empty(rank, ndim)?.complement())
    }

    /// Returns the oriented facets of a signed polytope. Facets always have an
    /// initial density of zero.
    pub fn facets_of(&self, p: SignedPolytope) -> Vec<SignedPolytope> {
        self[p.id]
            .facets
            .iter()
            .map(|&f| SignedPolytope::new(f.id, f.sign * p.sign, 0))
            .collect()
    }

    /// Returns the normal vectors of the hyperplanes containing a polytope,
    /// sorted by hyperplane ID.
    pub fn normals_of(&self, id: PolytopeId) -> Vec<Vector> {
        self[id]
            .hyperplanes
            .iter()
            .map(|&h| self[h].normal.clone())
            .collect()
    }

    /// Flips the orientation of facets of a polytope in place.
    ///
    /// This must only be used on polytopes that nothing else has seen yet.
    pub(crate) fn flip_facets(&mut self, id: PolytopeId, which: impl Fn(usize) -> bool) {
        for (i, f) in self.polytopes[id].facets.iter_mut().enumerate() {
            if which(i) {
                f.sign = -f.sign;
            }
        }
    }

    /// Sets the auxiliary data of a polytope that nothing else has seen yet.
    pub(crate) fn set_aux(&mut self, id: PolytopeId, aux: Option<u64>) {
        self.polytopes[id].aux = aux;
    }

    /// Replaces the facet list of a polytope in place, keeping the same set of
    /// facets.
    pub(crate) fn reorder_facets(&mut self, id: PolytopeId, facets: Vec<SignedPolytope>) {
        debug_assert_eq!(
            facets.iter().map(|f| f.id).sorted().collect_vec(),
            self[id].facets.iter().map(|f| f.id).sorted().collect_vec(),
        );
        self.polytopes[id].facets = facets;
    }

    /// Returns a human-readable tree of a polytope and all its elements.
    pub fn dump_to_string(&self, p: SignedPolytope) -> String {
        let mut out = format!("{p}\n");
        self.dump_to_string_recursive(&mut out, p, 1);
        out
    }
    fn dump_to_string_recursive(&self, out: &mut String, p: SignedPolytope, depth: usize) {
        let indent = "  ".repeat(depth);
        let data = &self[p.id];
        if data.rank == 0 {
            match self.coords(p.id) {
                Some(coords) => *out += &format!("{indent}at {coords}\n"),
                None => *out += &format!("{indent}at <unknown>\n"),
            }
        }
        for f in self.facets_of(p) {
            let hyperplanes = self[f.id].hyperplanes.iter().join(", ");
            *out += &format!("{indent}{f} [{hyperplanes}]\n");
            self.dump_to_string_recursive(out, f, depth + 1);
        }
    }
}
