use super::context::EmbedContext;
use super::scanner::RotationalScanner;

/// One unit of pose construction: a conformer per molecule and a pairing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmbedTask {
    pub index: usize,
    pub conformers: Vec<usize>,
    pub pairing: usize,
}

/// Lazy sequence of [`EmbedTask`]s over conformer combinations and pairings.
///
/// Tasks are numbered in mixed radix: conformer indices in registry order
/// form the outer digits, the pairing index the innermost one. A stream can
/// be resumed from any task index without replaying earlier tasks.
#[derive(Debug, Clone)]
pub struct TaskStream {
    radices: Vec<usize>,
    pairings: usize,
    next: usize,
    total: usize,
}

impl TaskStream {
    pub fn new(conformer_counts: &[usize], pairings: usize) -> Self {
        let total = if conformer_counts.is_empty() {
            0
        } else {
            conformer_counts
                .iter()
                .fold(pairings, |acc, &count| acc.saturating_mul(count))
        };
        Self {
            radices: conformer_counts.to_vec(),
            pairings,
            next: 0,
            total,
        }
    }

    pub fn for_context(ctx: &EmbedContext) -> Self {
        Self::new(&ctx.registry.conformer_counts(), ctx.pairings().len())
    }

    /// The same stream positioned at task `index`.
    pub fn starting_at(mut self, index: usize) -> Self {
        self.next = index.min(self.total);
        self
    }

    pub fn position(&self) -> usize {
        self.next
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Decodes a task index into its conformer digits and pairing.
    pub fn task(&self, index: usize) -> Option<EmbedTask> {
        if index >= self.total {
            return None;
        }
        let pairing = index % self.pairings;
        let mut rest = index / self.pairings;
        let mut conformers = vec![0; self.radices.len()];
        for (slot, &radix) in conformers.iter_mut().zip(&self.radices).rev() {
            *slot = rest % radix;
            rest /= radix;
        }
        Some(EmbedTask {
            index,
            conformers,
            pairing,
        })
    }
}

impl Iterator for TaskStream {
    type Item = EmbedTask;

    fn next(&mut self) -> Option<Self::Item> {
        let task = self.task(self.next)?;
        self.next += 1;
        Some(task)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TaskStream {}

/// Upper bound on the raw poses a run will generate before any filtering.
///
/// Counts every lobe combination of every pairing for every conformer
/// combination, times the rotation grid of each seed.
pub fn estimate_pose_count(ctx: &EmbedContext) -> u128 {
    let conformer_product: u128 = ctx
        .registry
        .conformer_counts()
        .iter()
        .fold(1u128, |acc, &c| acc.saturating_mul(c as u128));

    let per_combination: u128 = ctx
        .pairings()
        .iter()
        .map(|pairing| {
            let atoms: Vec<_> = if pairing.ring.is_empty() {
                pairing
                    .pairs
                    .iter()
                    .flat_map(|p| [p.donor, p.acceptor])
                    .collect()
            } else {
                pairing.ring.clone()
            };
            let seeds = atoms.iter().fold(1u128, |acc, &atom| {
                let lobes = ctx.frame(atom, 0).map_or(1, |f| f.lobes.len()) as u128;
                acc.saturating_mul(lobes)
            });
            let scanner = RotationalScanner::for_kind(ctx.config, pairing.kind);
            seeds.saturating_mul(scanner.poses_per_seed(ctx.molecule_count().saturating_sub(1)))
        })
        .fold(0u128, |acc, n| acc.saturating_add(n));

    conformer_product.saturating_mul(per_combination)
}
