use crate::core::models::topology::{Bond, BondGraph};
use crate::engine::context::EmbedContext;
use crate::engine::pairing::Pairing;
use nalgebra::Point3;
use std::collections::HashSet;

/// Detects connectivity that neither the inputs nor the forming bonds explain.
///
/// Works on refined coordinates in concatenated registry order.
#[derive(Debug, Clone)]
pub struct NewBondCounter {
    reference: BondGraph,
}

impl NewBondCounter {
    /// Merges every molecule's topology into one graph over the concatenated atom numbering.
    pub fn new(ctx: &EmbedContext) -> Self {
        let mut reference = BondGraph::new(ctx.total_atoms());
        for (position, molecule) in ctx.registry.iter().enumerate() {
            let offset = ctx.atom_offset(position);
            for bond in molecule.topology().bonds() {
                let shifted = bond.offset(offset);
                reference.add_bond(shifted.a, shifted.b);
            }
        }
        Self { reference }
    }

    pub fn reference(&self) -> &BondGraph {
        &self.reference
    }

    /// Bonds inferred from `coordinates` that are absent from the inputs and not being formed.
    pub fn new_bonds(
        &self,
        ctx: &EmbedContext,
        coordinates: &[Point3<f64>],
        pairing: Option<&Pairing>,
    ) -> Vec<Bond> {
        let inferred = BondGraph::infer(ctx.elements(), coordinates);
        let forming: HashSet<Bond> = pairing
            .map(|p| {
                p.pairs
                    .iter()
                    .map(|pair| Bond::new(ctx.global_index(pair.donor), ctx.global_index(pair.acceptor)))
                    .collect()
            })
            .unwrap_or_default();
        self.reference
            .bonds_missing_from(&inferred)
            .filter(|bond| !forming.contains(*bond))
            .copied()
            .collect()
    }

    pub fn count(
        &self,
        ctx: &EmbedContext,
        coordinates: &[Point3<f64>],
        pairing: Option<&Pairing>,
    ) -> usize {
        self.new_bonds(ctx, coordinates, pairing).len()
    }
}
