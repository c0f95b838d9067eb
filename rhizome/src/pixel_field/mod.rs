//! Sparse pixel arena shared by every pipeline stage.
//!
//! Pixels live in a `Vec<Option<Pixel>>` addressed by [`PixelId`]. Removal
//! leaves a tombstone so ids are never reused, and a coordinate index maps
//! lattice positions back to ids. Ids are allocated in row-major coordinate
//! order, so iterating live ids is iterating in canonical order.


use common::Buffer2;
use hashbrown::HashMap;

use crate::error::{InvariantViolation, Result};
use crate::lattice::{Coord, Direction, SlotMask};

/// Foreground intensity used for pixels created from bare coordinates.
pub const FULL_INTENSITY: f32 = 255.0;

/// Stable handle into a [`PixelField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelId(pub(crate) u32);

impl PixelId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// How [`PixelField::remove`] treats the tree links of a removed pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relink {
    /// Drop the links. Used before tree links exist.
    Discard,
    /// Connect every parent of the removed pixel to every child of it.
    Preserve,
}

#[derive(Debug, Clone)]
pub struct Pixel {
    coord: Coord,
    intensity: f32,
    radius: Option<u32>,
    neighbors: [Option<PixelId>; 8],
    parents: Vec<PixelId>,
    children: Vec<PixelId>,
    visited: bool,
}

impl Pixel {
    fn new(coord: Coord, intensity: f32) -> Self {
        Self {
            coord,
            intensity,
            radius: None,
            neighbors: [None; 8],
            parents: Vec::new(),
            children: Vec::new(),
            visited: false,
        }
    }

    #[inline]
    pub fn coord(&self) -> Coord {
        self.coord
    }

    #[inline]
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    #[inline]
    pub fn radius(&self) -> Option<u32> {
        self.radius
    }

    #[inline]
    pub fn neighbor(&self, direction: Direction) -> Option<PixelId> {
        self.neighbors[direction.slot()]
    }

    /// Copy of the neighbor slot array, indexed by slot.
    #[inline]
    pub fn neighbor_slots(&self) -> [Option<PixelId>; 8] {
        self.neighbors
    }

    /// Occupied slots with their neighbor ids, in slot order.
    pub fn neighbors(&self) -> impl Iterator<Item = (Direction, PixelId)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(|d| self.neighbors[d.slot()].map(|id| (d, id)))
    }

    pub fn occupied(&self) -> SlotMask {
        let mut mask = SlotMask::EMPTY;
        for (direction, _) in self.neighbors() {
            mask.insert(direction);
        }
        mask
    }

    #[inline]
    pub fn has_empty_slot(&self) -> bool {
        self.neighbors.iter().any(Option::is_none)
    }

    #[inline]
    pub fn parents(&self) -> &[PixelId] {
        &self.parents
    }

    #[inline]
    pub fn children(&self) -> &[PixelId] {
        &self.children
    }

    #[inline]
    pub fn is_visited(&self) -> bool {
        self.visited
    }
}

/// Which optional checks [`PixelField::verify`] runs on top of link symmetry
/// and dangling-reference detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldChecks {
    /// Every pixel must carry a radius.
    pub radius_present: bool,
    /// Adjacent radii differ by at most one.
    pub radius_continuity: bool,
    /// Parent/child sets are reciprocal and every pixel has at most one parent.
    pub tree_links: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PixelField {
    slots: Vec<Option<Pixel>>,
    index: HashMap<Coord, PixelId>,
    width: usize,
    height: usize,
}

impl PixelField {
    /// Creates one pixel per grid cell with a value above zero. NaN cells are
    /// background.
    pub fn from_grid(grid: &Buffer2<f32>) -> Self {
        let mut field = Self::with_capacity(grid.width(), grid.height(), 0);
        for (x, y, &value) in grid.enumerate() {
            if value > 0.0 {
                field.insert(Coord::new(y as i32, x as i32), value);
            }
        }
        field
    }

    /// Creates a field from bare coordinates. Duplicates are ignored and
    /// coordinates outside `width x height` are dropped.
    pub fn from_coords(width: usize, height: usize, coords: impl IntoIterator<Item = Coord>) -> Self {
        let mut coords: Vec<Coord> = coords
            .into_iter()
            .filter(|c| c.y >= 0 && c.x >= 0 && (c.y as usize) < height && (c.x as usize) < width)
            .collect();
        coords.sort_unstable();
        coords.dedup();

        let mut field = Self::with_capacity(width, height, coords.len());
        for coord in coords {
            field.insert(coord, FULL_INTENSITY);
        }
        field
    }

    fn with_capacity(width: usize, height: usize, capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
            width,
            height,
        }
    }

    // Callers insert in ascending coordinate order.
    fn insert(&mut self, coord: Coord, intensity: f32) -> PixelId {
        debug_assert!(self.slots.len() < u32::MAX as usize);
        let id = PixelId(self.slots.len() as u32);
        self.slots.push(Some(Pixel::new(coord, intensity)));
        self.index.insert(coord, id);
        id
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of live pixels.
    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Upper bound (exclusive) of every id ever handed out.
    #[inline]
    pub fn id_bound(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn get(&self, id: PixelId) -> Option<&Pixel> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    #[inline]
    pub fn contains(&self, id: PixelId) -> bool {
        self.get(id).is_some()
    }

    #[inline]
    pub fn id_at(&self, coord: Coord) -> Option<PixelId> {
        self.index.get(&coord).copied()
    }

    #[inline]
    pub fn pixel_at(&self, coord: Coord) -> Option<&Pixel> {
        self.id_at(coord).and_then(|id| self.get(id))
    }

    /// Live ids in canonical (row-major) order.
    pub fn ids(&self) -> impl Iterator<Item = PixelId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| PixelId(i as u32))
    }

    /// Live pixels in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (PixelId, &Pixel)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|p| (PixelId(i as u32), p)))
    }

    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        self.iter().map(|(_, p)| p.coord)
    }

    /// Occupied neighbor slots of `id`. Empty for removed ids.
    pub fn occupied(&self, id: PixelId) -> SlotMask {
        self.get(id).map(Pixel::occupied).unwrap_or_default()
    }

    /// Foreground mask of the live pixels, for rendering and comparison.
    pub fn to_mask(&self) -> Buffer2<bool> {
        let mut mask = Buffer2::new_default(self.width, self.height);
        for coord in self.coords() {
            if coord.x >= 0 && coord.y >= 0 {
                let (x, y) = (coord.x as usize, coord.y as usize);
                if x < self.width && y < self.height {
                    mask[(x, y)] = true;
                }
            }
        }
        mask
    }

    #[inline]
    fn pixel_mut(&mut self, id: PixelId) -> &mut Pixel {
        self.slots[id.index()]
            .as_mut()
            .unwrap_or_else(|| panic!("pixel #{} was removed", id.0))
    }

    /// Links `a` and `b` symmetrically. `direction` is where `b` sits
    /// relative to `a`.
    pub(crate) fn link(&mut self, a: PixelId, b: PixelId, direction: Direction) {
        debug_assert_eq!(
            Direction::between(self[a].coord, self[b].coord),
            Some(direction)
        );
        self.pixel_mut(a).neighbors[direction.slot()] = Some(b);
        self.pixel_mut(b).neighbors[direction.opposite().slot()] = Some(a);
    }

    pub(crate) fn set_radius(&mut self, id: PixelId, radius: u32) {
        self.pixel_mut(id).radius = Some(radius);
    }

    /// Records `parent -> child`, ignoring duplicates and self links.
    pub(crate) fn add_tree_link(&mut self, parent: PixelId, child: PixelId) {
        if parent == child {
            return;
        }
        let p = self.pixel_mut(parent);
        if !p.children.contains(&child) {
            p.children.push(child);
        }
        let c = self.pixel_mut(child);
        if !c.parents.contains(&parent) {
            c.parents.push(parent);
        }
    }

    pub(crate) fn set_visited(&mut self, id: PixelId, visited: bool) {
        self.pixel_mut(id).visited = visited;
    }

    pub(crate) fn clear_visited(&mut self) {
        for pixel in self.slots.iter_mut().flatten() {
            pixel.visited = false;
        }
    }

    /// Removes a pixel and every reference to it. Returns `false` if the id
    /// was already removed.
    pub fn remove(&mut self, id: PixelId, relink: Relink) -> bool {
        let Some(pixel) = self.slots.get_mut(id.index()).and_then(Option::take) else {
            return false;
        };
        self.index.remove(&pixel.coord);

        for (direction, neighbor) in pixel.neighbors() {
            if let Some(n) = self.slots[neighbor.index()].as_mut() {
                n.neighbors[direction.opposite().slot()] = None;
            }
        }

        for &parent in &pixel.parents {
            if let Some(p) = self.slots[parent.index()].as_mut() {
                p.children.retain(|&c| c != id);
            }
        }
        for &child in &pixel.children {
            if let Some(c) = self.slots[child.index()].as_mut() {
                c.parents.retain(|&p| p != id);
            }
        }

        if relink == Relink::Preserve {
            for &parent in &pixel.parents {
                for &child in &pixel.children {
                    if self.contains(parent) && self.contains(child) {
                        self.add_tree_link(parent, child);
                    }
                }
            }
        }
        true
    }

    /// Removes a batch of pixels in the given order. Returns how many were live.
    pub fn remove_all(&mut self, ids: &[PixelId], relink: Relink) -> usize {
        ids.iter().filter(|&&id| self.remove(id, relink)).count()
    }

    /// Checks link symmetry and dangling references, plus the optional checks
    /// in `checks`.
    pub fn verify(&self, checks: FieldChecks) -> Result<()> {
        for (id, pixel) in self.iter() {
            for (direction, neighbor_id) in pixel.neighbors() {
                let neighbor = self.get(neighbor_id).ok_or(InvariantViolation::DanglingReference {
                    at: pixel.coord,
                    id: neighbor_id.raw(),
                })?;
                if Direction::between(pixel.coord, neighbor.coord) != Some(direction) {
                    return Err(InvariantViolation::NonAdjacentNeighbor {
                        at: pixel.coord,
                        neighbor: neighbor.coord,
                        slot: direction.slot(),
                    }
                    .into());
                }
                if neighbor.neighbor(direction.opposite()) != Some(id) {
                    return Err(InvariantViolation::MissingReciprocal {
                        at: pixel.coord,
                        neighbor: neighbor.coord,
                        slot: direction.slot(),
                    }
                    .into());
                }
                if checks.radius_continuity
                    && let (Some(a), Some(b)) = (pixel.radius, neighbor.radius)
                    && a.abs_diff(b) > 1
                {
                    return Err(InvariantViolation::RadiusDiscontinuity {
                        a: pixel.coord,
                        b: neighbor.coord,
                        from: a,
                        to: b,
                    }
                    .into());
                }
            }

            if checks.radius_present && pixel.radius.is_none() {
                return Err(InvariantViolation::MissingRadius { at: pixel.coord }.into());
            }

            for &child_id in &pixel.children {
                let child = self.get(child_id).ok_or(InvariantViolation::DanglingReference {
                    at: pixel.coord,
                    id: child_id.raw(),
                })?;
                if checks.tree_links && !child.parents.contains(&id) {
                    return Err(InvariantViolation::OneSidedTreeLink {
                        parent: pixel.coord,
                        child: child.coord,
                    }
                    .into());
                }
            }
            for &parent_id in &pixel.parents {
                let parent = self.get(parent_id).ok_or(InvariantViolation::DanglingReference {
                    at: pixel.coord,
                    id: parent_id.raw(),
                })?;
                if checks.tree_links && !parent.children.contains(&id) {
                    return Err(InvariantViolation::OneSidedTreeLink {
                        parent: parent.coord,
                        child: pixel.coord,
                    }
                    .into());
                }
            }
            if checks.tree_links && pixel.parents.len() > 1 {
                return Err(InvariantViolation::MultipleParents {
                    at: pixel.coord,
                    count: pixel.parents.len(),
                }
                .into());
            }
        }
        Ok(())
    }
}

impl std::ops::Index<PixelId> for PixelField {
    type Output = Pixel;

    fn index(&self, id: PixelId) -> &Pixel {
        self.get(id)
            .unwrap_or_else(|| panic!("pixel #{} was removed", id.0))
    }
}
