//! Symmetric 8-connectivity links and per-pixel radius.
//!
//! The radius of a pixel is its Chebyshev distance to the nearest unoccupied
//! cell, counted from zero: pixels with at least one empty neighbor slot sit
//! in layer 0, their unassigned neighbors in layer 1, and so on.


use crate::lattice::Direction;
use crate::pixel_field::{PixelField, PixelId};

/// Counts from building the neighbor graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighborStats {
    /// Undirected links created.
    pub links: usize,
    /// Largest radius assigned. Zero for an empty field.
    pub max_radius: u32,
}

/// Links neighbors and assigns radii.
pub fn build(field: &mut PixelField) -> NeighborStats {
    let links = link_neighbors(field);
    let max_radius = assign_radii(field);
    NeighborStats { links, max_radius }
}

/// Probes the forward half of the neighborhood from every pixel and links
/// both ends of each hit. Returns the number of links created.
pub fn link_neighbors(field: &mut PixelField) -> usize {
    let mut links = 0;
    let pixels: Vec<(PixelId, _)> = field.iter().map(|(id, p)| (id, p.coord())).collect();
    for (id, coord) in pixels {
        for direction in Direction::FORWARD {
            if let Some(other) = field.id_at(coord.step(direction)) {
                field.link(id, other, direction);
                links += 1;
            }
        }
    }
    links
}

/// Layered multi-source BFS from the boundary pixels. Returns the largest
/// radius assigned.
pub fn assign_radii(field: &mut PixelField) -> u32 {
    let mut frontier: Vec<PixelId> = field
        .iter()
        .filter(|(_, p)| p.has_empty_slot())
        .map(|(id, _)| id)
        .collect();
    for &id in &frontier {
        field.set_radius(id, 0);
    }

    let mut radius = 0;
    loop {
        let mut next = Vec::new();
        for &id in &frontier {
            for neighbor in field[id].neighbor_slots().into_iter().flatten() {
                if field[neighbor].radius().is_none() {
                    field.set_radius(neighbor, radius + 1);
                    next.push(neighbor);
                }
            }
        }
        if next.is_empty() {
            break;
        }
        radius += 1;
        frontier = next;
    }
    radius
}
