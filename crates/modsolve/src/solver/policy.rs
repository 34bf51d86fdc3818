use std::cmp::Ordering;

use crate::context::Graph;
use crate::option::OptionId;

/// Policy for choosing which option the solver tries next.
///
/// Identity groups are visited in discovery order. Within a group the
/// preferred option comes first: the highest version, then the one
/// discovered earliest. The solver always tries loading the first
/// undecided option in this order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Policy;

impl Policy {
    /// Every option of the graph, most preferred first within each group.
    pub fn decision_order(&self, graph: &Graph) -> Vec<OptionId> {
        let mut order = Vec::with_capacity(graph.option_count());
        for (_, members) in graph.groups() {
            let mut sorted = members.to_vec();
            sorted.sort_by(|&a, &b| self.compare(graph, a, b));
            order.extend(sorted);
        }
        order
    }

    /// Compare two options of the same group; `Less` means "try first".
    fn compare(&self, graph: &Graph, a: OptionId, b: OptionId) -> Ordering {
        let (Some(option_a), Some(option_b)) = (graph.option(a), graph.option(b)) else {
            return a.cmp(&b);
        };

        graph
            .matcher()
            .compare(option_a.version(), option_b.version())
            .reverse()
            .then_with(|| option_a.discovery_index().cmp(&option_b.discovery_index()))
    }
}
