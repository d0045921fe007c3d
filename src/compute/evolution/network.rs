//! Sparse neuron graph derived from a genome's enabled genes.

use std::collections::BTreeMap;

use super::gene::{Gene, NodeId};
use crate::schema::NeatConfig;

/// Node id ranges shared by every network in a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    /// Inputs are `[0, input_size)`.
    pub input_size: usize,
    /// Outputs are `[max_nodes, max_nodes + outputs)`.
    pub outputs: usize,
    pub max_nodes: NodeId,
}

impl NodeLayout {
    pub fn from_config(config: &NeatConfig) -> Self {
        Self {
            input_size: config.input_size,
            outputs: config.outputs,
            max_nodes: config.max_nodes,
        }
    }

    /// Id of the bias source node.
    #[inline]
    pub fn bias(&self) -> NodeId {
        self.input_size as NodeId
    }

    /// Id of output channel `o`.
    #[inline]
    pub fn output(&self, o: usize) -> NodeId {
        self.max_nodes + o as NodeId
    }

    /// Whether `id` is treated as an input-side node by link mutation.
    /// This includes the bias node.
    #[inline]
    pub fn is_input_side(&self, id: NodeId) -> bool {
        id <= self.bias()
    }
}

/// Activation: `2 / (1 + e^(-4.9x)) - 1`, range (-1, 1), `sigmoid(0) == 0`.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    2.0 / (1.0 + (-4.9 * x).exp()) - 1.0
}

/// A node and the enabled genes feeding it.
#[derive(Debug, Clone, Default)]
pub struct Neuron {
    pub value: f32,
    pub incoming: Vec<Gene>,
}

/// Neurons keyed by node id.
///
/// Non-input neurons are evaluated once per call in ascending id order, not
/// in topological order: a neuron whose source has not been recomputed yet
/// this pass reads that source's value from the previous pass.
#[derive(Debug, Clone, Default)]
pub struct Network {
    neurons: BTreeMap<NodeId, Neuron>,
    layout: Option<NodeLayout>,
    /// Non-input ids in evaluation order.
    order: Vec<NodeId>,
}

impl Network {
    /// Build a network from genes that are already grouped by target node.
    pub fn build(genes: &[Gene], layout: NodeLayout) -> Self {
        let mut neurons = BTreeMap::new();

        for i in 0..layout.input_size {
            neurons.insert(i as NodeId, Neuron::default());
        }
        for o in 0..layout.outputs {
            neurons.insert(layout.output(o), Neuron::default());
        }

        for gene in genes.iter().filter(|g| g.enabled) {
            neurons
                .entry(gene.out)
                .or_insert_with(Neuron::default)
                .incoming
                .push(*gene);
            neurons.entry(gene.into).or_insert_with(Neuron::default);
        }

        let order = neurons
            .range(layout.input_size as NodeId..)
            .map(|(&id, _)| id)
            .collect();

        Self {
            neurons,
            layout: Some(layout),
            order,
        }
    }

    /// Feed one observation through the network.
    ///
    /// Returns the output values, or an empty vector (logged) if the
    /// observation length does not match the input layer.
    pub fn evaluate(&mut self, inputs: &[f32]) -> Vec<f32> {
        let Some(layout) = self.layout else {
            log::warn!("evaluating a network that was never generated");
            return Vec::new();
        };
        if inputs.len() != layout.input_size {
            log::warn!(
                "incorrect number of neural network inputs: expected {}, got {}",
                layout.input_size,
                inputs.len()
            );
            return Vec::new();
        }

        for (i, &x) in inputs.iter().enumerate() {
            self.neurons
                .get_mut(&(i as NodeId))
                .expect("input neuron missing from generated network")
                .value = x;
        }

        for &id in &self.order {
            let neuron = &self.neurons[&id];
            let value = if neuron.incoming.is_empty() {
                0.0
            } else {
                let sum: f32 = neuron
                    .incoming
                    .iter()
                    .map(|gene| {
                        let source = self
                            .neurons
                            .get(&gene.into)
                            .expect("source neuron missing from generated network");
                        gene.weight * source.value
                    })
                    .sum();
                sigmoid(sum)
            };
            if let Some(neuron) = self.neurons.get_mut(&id) {
                neuron.value = value;
            }
        }

        (0..layout.outputs)
            .map(|o| {
                self.neurons
                    .get(&layout.output(o))
                    .expect("output neuron missing from generated network")
                    .value
            })
            .collect()
    }

    /// Whether a neuron with this id exists.
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        self.neurons.contains_key(&id)
    }

    /// Current activation of a neuron.
    pub fn value(&self, id: NodeId) -> Option<f32> {
        self.neurons.get(&id).map(|n| n.value)
    }

    /// Number of output channels, 0 if never generated.
    pub fn output_count(&self) -> usize {
        self.layout.map_or(0, |l| l.outputs)
    }

    /// Number of neurons.
    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    /// Whether the network holds no neurons (never generated).
    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn layout() -> NodeLayout {
        NodeLayout {
            input_size: 3,
            outputs: 2,
            max_nodes: 100,
        }
    }

    fn gene(into: NodeId, out: NodeId, weight: f32, innovation: i32) -> Gene {
        Gene {
            into,
            out,
            weight,
            enabled: true,
            innovation,
        }
    }

    #[test]
    fn test_sigmoid_zero() {
        assert_eq!(sigmoid(0.0), 0.0);
    }

    #[test]
    fn test_build_inserts_inputs_and_outputs() {
        let net = Network::build(&[], layout());
        assert_eq!(net.len(), 5);
        assert!(net.contains(0) && net.contains(2));
        assert!(net.contains(100) && net.contains(101));
    }

    #[test]
    fn test_disabled_genes_add_no_edges() {
        let mut g = gene(0, 50, 1.0, 1);
        g.enabled = false;
        let net = Network::build(&[g], layout());
        assert!(!net.contains(50));
    }

    #[test]
    fn test_direct_link_evaluation() {
        let mut net = Network::build(&[gene(0, 100, 1.0, 1)], layout());
        let out = net.evaluate(&[1.0, 0.0, 0.0]);
        assert_eq!(out.len(), 2);
        assert!((out[0] - sigmoid(1.0)).abs() < 1e-6);
        assert_eq!(out[1], 0.0);
    }

    #[test]
    fn test_wrong_input_length_returns_empty() {
        let mut net = Network::build(&[gene(0, 100, 1.0, 1)], layout());
        assert!(net.evaluate(&[1.0]).is_empty());
    }

    #[test]
    fn test_backward_edge_reads_previous_pass() {
        // hidden 60 feeds hidden 50, but 50 is evaluated first
        let genes = [
            gene(0, 60, 1.0, 1),
            gene(60, 50, 1.0, 2),
            gene(50, 100, 1.0, 3),
        ];
        let mut net = Network::build(&genes, layout());

        net.evaluate(&[1.0, 0.0, 0.0]);
        assert_eq!(net.value(50), Some(0.0));
        let h60 = sigmoid(1.0);
        assert!((net.value(60).unwrap() - h60).abs() < 1e-6);

        net.evaluate(&[1.0, 0.0, 0.0]);
        assert!((net.value(50).unwrap() - sigmoid(h60)).abs() < 1e-6);
    }

    #[test]
    fn test_bias_node_without_incoming_is_zero() {
        let l = layout();
        let mut net = Network::build(&[gene(l.bias(), 100, 2.0, 1)], l);
        let out = net.evaluate(&[0.5, 0.5, 0.5]);
        assert_eq!(net.value(l.bias()), Some(0.0));
        assert_eq!(out[0], 0.0);
    }

    proptest! {
        #[test]
        fn test_sigmoid_strictly_increasing(a in -2.0f32..2.0, d in 0.01f32..1.0) {
            prop_assert!(sigmoid(a + d) > sigmoid(a));
        }

        #[test]
        fn test_sigmoid_bounded(x in -2.0f32..2.0) {
            let y = sigmoid(x);
            prop_assert!(y > -1.0 && y < 1.0);
        }
    }
}
