//! Backpropagation-through-time with surrogate spike derivatives
//!
//! There is no reverse-mode autodiff to lean on, so the unroll is replayed
//! backwards by hand. The hard threshold of the forward pass is replaced by
//! the configured surrogate derivative wherever a gradient crosses a spike
//! decision; the subtractive reset is treated as a constant when
//! `detach_reset` is set, and differentiated through the surrogate
//! otherwise.

use crate::{
    error::*,
    network::{NetGrads, SpikeNet},
    simulation::Unroll,
};
use ndarray::Array2;

/// Accumulate parameter gradients for one unroll into `grads`
///
/// `logit_grads` are the per-step loss gradients with respect to the output
/// potentials (from [`crate::loss::temporal_cross_entropy`]); `input` is
/// the static batch the unroll was driven with. Existing contents of
/// `grads` are added to, so clear them first when starting a new iteration.
pub fn accumulate(
    net: &SpikeNet,
    unroll: &Unroll,
    input: &Array2<f32>,
    logit_grads: &[Array2<f32>],
    grads: &mut NetGrads,
) -> Result<()> {
    let num_steps = unroll.output.num_steps();
    if logit_grads.len() != num_steps {
        return Err(SnnError::shape_mismatch(
            "backprop logit grads",
            format!("{} steps", num_steps),
            format!("{} steps", logit_grads.len()),
        ));
    }

    let hidden_params = &net.lif1.params;
    let output_params = &net.lif2.params;

    let batch = input.nrows();
    let num_hidden = net.config().num_hidden;
    let num_outputs = net.config().num_outputs;

    // dL/dV carried backwards across the step boundary, per population
    let mut d_hidden: Array2<f32> = Array2::zeros((batch, num_hidden));
    let mut d_output: Array2<f32> = Array2::zeros((batch, num_outputs));

    for t in (0..num_steps).rev() {
        let v_hidden = &unroll.hidden.potentials[t];
        let v_output = &unroll.output.potentials[t];
        let s_hidden = &unroll.hidden.spikes[t];

        // Output potential: the step's own loss term plus the decay path
        // from t+1. Without detachment the reset path S_t -> V_{t+1} adds
        // -threshold * surrogate'(V_t).
        let mut d2 = &logit_grads[t] + &(&d_output * output_params.beta);
        if !output_params.detach_reset {
            let sg2 = net.lif2.spike_grad(v_output);
            d2 = d2 - &d_output * output_params.threshold * &sg2;
        }

        grads.fc2.accumulate(&d2, s_hidden);

        // Into the hidden spikes: spatially through fc2, and (when the
        // reset is kept in the graph) through the hidden reset at t+1
        let mut d_spikes = d2.dot(&net.fc2.weight);
        if !hidden_params.detach_reset {
            d_spikes = d_spikes - &d_hidden * hidden_params.threshold;
        }

        // Through the spike decision via the surrogate, plus the hidden
        // decay path from t+1
        let sg1 = net.lif1.spike_grad(v_hidden);
        let d1 = &d_spikes * &sg1 + &d_hidden * hidden_params.beta;

        grads.fc1.accumulate(&d1, input);

        d_hidden = d1;
        d_output = d2;
    }

    if !grads.is_finite() {
        return Err(SnnError::non_finite("parameter gradients"));
    }
    Ok(())
}

/// Convenience wrapper returning freshly accumulated gradients
pub fn backward(
    net: &SpikeNet,
    unroll: &Unroll,
    input: &Array2<f32>,
    logit_grads: &[Array2<f32>],
) -> Result<NetGrads> {
    let mut grads = NetGrads::zeros_like(net);
    accumulate(net, unroll, input, logit_grads, &mut grads)?;
    Ok(grads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        loss::temporal_cross_entropy,
        network::{SpikeNet, SpikeNetConfig},
        simulation::{SimParams, TemporalSimulator},
    };
    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Network in a spike-stable regime: the hidden population fires every
    /// step (huge input drive) while the output potentials stay far below
    /// threshold (tiny second-layer weights), so the loss is an exactly
    /// smooth function of the second layer's parameters.
    fn stable_net() -> SpikeNet {
        let mut rng = StdRng::seed_from_u64(5);
        let config = SpikeNetConfig::new(4, 3, 2).unwrap();
        let mut net = SpikeNet::new(config, &mut rng).unwrap();

        net.fc1.weight.fill(2.0);
        net.fc1.bias.fill(0.0);
        net.fc2.weight = Array2::from_shape_fn((2, 3), |(i, j)| 0.01 * (i as f32 - j as f32));
        net.fc2.bias = Array1::from_vec(vec![0.005, -0.005]);
        net
    }

    fn run_loss(net: &SpikeNet, x: &Array2<f32>, targets: &[usize], steps: usize) -> f32 {
        let sim = TemporalSimulator::new(SimParams::new(steps).unwrap()).unwrap();
        let unroll = sim.run(net, x).unwrap();
        temporal_cross_entropy(&unroll.output.potentials, targets)
            .unwrap()
            .value
    }

    #[test]
    fn test_finite_difference_matches_output_layer() {
        let net = stable_net();
        let x = Array2::<f32>::ones((2, 4));
        let targets = [0usize, 1];
        let steps = 5;

        let sim = TemporalSimulator::new(SimParams::new(steps).unwrap()).unwrap();
        let unroll = sim.run(&net, &x).unwrap();
        let loss = temporal_cross_entropy(&unroll.output.potentials, &targets).unwrap();
        let grads = backward(&net, &unroll, &x, &loss.logit_grads).unwrap();

        let h = 1e-2f32;
        for i in 0..2 {
            for j in 0..3 {
                let mut plus = net.clone();
                plus.fc2.weight[[i, j]] += h;
                let mut minus = net.clone();
                minus.fc2.weight[[i, j]] -= h;

                let fd = (run_loss(&plus, &x, &targets, steps)
                    - run_loss(&minus, &x, &targets, steps))
                    / (2.0 * h);
                let analytic = grads.fc2.weight[[i, j]];
                assert!(
                    (fd - analytic).abs() < 1e-2 * analytic.abs().max(1.0),
                    "fc2.weight[{},{}]: fd={} analytic={}",
                    i,
                    j,
                    fd,
                    analytic
                );
            }
        }

        for i in 0..2 {
            let mut plus = net.clone();
            plus.fc2.bias[i] += h;
            let mut minus = net.clone();
            minus.fc2.bias[i] -= h;
            let fd = (run_loss(&plus, &x, &targets, steps)
                - run_loss(&minus, &x, &targets, steps))
                / (2.0 * h);
            let analytic = grads.fc2.bias[i];
            assert!(
                (fd - analytic).abs() < 1e-2 * analytic.abs().max(1.0),
                "fc2.bias[{}]: fd={} analytic={}",
                i,
                fd,
                analytic
            );
        }
    }

    #[test]
    fn test_zero_downstream_weights_silence_hidden_grads() {
        // With fc2 all zero, no loss signal reaches the hidden layer
        let mut net = stable_net();
        net.fc2.weight.fill(0.0);
        net.fc2.bias.fill(0.0);

        let x = Array2::<f32>::ones((2, 4));
        let sim = TemporalSimulator::new(SimParams::new(5).unwrap()).unwrap();
        let unroll = sim.run(&net, &x).unwrap();
        let loss = temporal_cross_entropy(&unroll.output.potentials, &[0, 1]).unwrap();
        let grads = backward(&net, &unroll, &x, &loss.logit_grads).unwrap();

        assert!(grads.fc1.weight.iter().all(|&g| g == 0.0));
        assert!(grads.fc1.bias.iter().all(|&g| g == 0.0));
        // The output layer still learns from its bias path
        assert!(grads.fc2.bias.iter().any(|&g| g != 0.0));
    }

    #[test]
    fn test_detach_reset_agrees_when_no_spike_crosses() {
        // Far from threshold on the output layer and saturated on the
        // hidden layer, both reset conventions see the same (tiny)
        // surrogate corrections only; the gradients must stay close.
        let net_detached = stable_net();
        let mut net_attached = net_detached.clone();
        net_attached.lif1.params.detach_reset = false;
        net_attached.lif2.params.detach_reset = false;

        let x = Array2::<f32>::ones((2, 4));
        let sim = TemporalSimulator::new(SimParams::new(5).unwrap()).unwrap();

        let run = |net: &SpikeNet| {
            let unroll = sim.run(net, &x).unwrap();
            let loss = temporal_cross_entropy(&unroll.output.potentials, &[0, 1]).unwrap();
            backward(net, &unroll, &x, &loss.logit_grads).unwrap()
        };

        let g_detached = run(&net_detached);
        let g_attached = run(&net_attached);

        // Same trajectories forward, near-identical output-layer gradients
        for (a, b) in g_detached
            .fc2
            .weight
            .iter()
            .zip(g_attached.fc2.weight.iter())
        {
            assert!((a - b).abs() < 1e-2, "detached={} attached={}", a, b);
        }
    }

    #[test]
    fn test_accumulate_adds_onto_existing() {
        let net = stable_net();
        let x = Array2::<f32>::ones((2, 4));
        let sim = TemporalSimulator::new(SimParams::new(3).unwrap()).unwrap();
        let unroll = sim.run(&net, &x).unwrap();
        let loss = temporal_cross_entropy(&unroll.output.potentials, &[0, 1]).unwrap();

        let once = backward(&net, &unroll, &x, &loss.logit_grads).unwrap();
        let mut twice = NetGrads::zeros_like(&net);
        accumulate(&net, &unroll, &x, &loss.logit_grads, &mut twice).unwrap();
        accumulate(&net, &unroll, &x, &loss.logit_grads, &mut twice).unwrap();

        for (a, b) in once.fc2.weight.iter().zip(twice.fc2.weight.iter()) {
            assert!((2.0 * a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_step_count_mismatch_rejected() {
        let net = stable_net();
        let x = Array2::<f32>::ones((2, 4));
        let sim = TemporalSimulator::new(SimParams::new(3).unwrap()).unwrap();
        let unroll = sim.run(&net, &x).unwrap();

        let short: Vec<Array2<f32>> = vec![Array2::zeros((2, 2))];
        let mut grads = NetGrads::zeros_like(&net);
        assert!(accumulate(&net, &unroll, &x, &short, &mut grads).is_err());
    }

    #[test]
    fn test_single_step_hand_computed() {
        // One step, one sample: d1 = (d2 . W2) * sg(v1), gW1 = d1^T x
        let mut net = stable_net();
        net.fc1.weight = Array2::from_elem((3, 4), 0.1); // subthreshold hidden
        net.fc2.weight = Array2::from_elem((2, 3), 0.2);
        net.fc2.bias.fill(0.0);

        let x = Array2::<f32>::ones((1, 4));
        let sim = TemporalSimulator::new(SimParams::new(1).unwrap()).unwrap();
        let unroll = sim.run(&net, &x).unwrap();

        // No hidden spikes: v1 = 0.4 < 1.0, so fc2 sees zeros and fc2
        // gradients vanish against the zero spike input
        assert!(unroll.hidden.spikes[0].iter().all(|&s| s == 0.0));

        let loss = temporal_cross_entropy(&unroll.output.potentials, &[0]).unwrap();
        let grads = backward(&net, &unroll, &x, &loss.logit_grads).unwrap();
        assert!(grads.fc2.weight.iter().all(|&g| g == 0.0));

        let sg = net.lif1.spike_grad(&unroll.hidden.potentials[0]);
        let d2 = &loss.logit_grads[0];
        let d1 = d2.dot(&net.fc2.weight) * &sg;
        let expected_gw1 = d1.t().dot(&x);
        for (a, b) in grads.fc1.weight.iter().zip(expected_gw1.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
