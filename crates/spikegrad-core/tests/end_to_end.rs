//! End-to-end scenarios: whole-stack unrolls and a full training run

use ndarray::Array2;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use spikegrad_core::{
    eval, temporal_cross_entropy, AdamParams, Dataset, SimParams, SpikeNet, SpikeNetConfig,
    TemporalSimulator, Trainer, TrainerConfig,
};

fn tiny_net(seed: u64) -> SpikeNet {
    let mut rng = StdRng::seed_from_u64(seed);
    let config = SpikeNetConfig::new(4, 3, 2).unwrap();
    SpikeNet::new(config, &mut rng).unwrap()
}

#[test]
fn zero_input_drives_zero_spikes_everywhere() {
    // With zero input and zero biases, no current ever forms, so no
    // potential can cross threshold at either layer at any step
    let mut rng = StdRng::seed_from_u64(1);
    let config = SpikeNetConfig::new(4, 3, 2)
        .unwrap()
        .with_lif(spikegrad_core::LifParams::new(0.9, 1.0).unwrap());
    let mut net = SpikeNet::new(config, &mut rng).unwrap();
    net.fc1.bias.fill(0.0);
    net.fc2.bias.fill(0.0);

    let sim = TemporalSimulator::new(SimParams::new(5).unwrap()).unwrap();
    let x = Array2::<f32>::zeros((4, 4));
    let unroll = sim.run(&net, &x).unwrap();

    for t in 0..5 {
        assert!(unroll.hidden.spikes[t].iter().all(|&s| s == 0.0));
        assert!(unroll.output.spikes[t].iter().all(|&s| s == 0.0));
        assert!(unroll.hidden.potentials[t].iter().all(|&v| v == 0.0));
        assert!(unroll.output.potentials[t].iter().all(|&v| v == 0.0));
    }

    // All spike counts tie at zero, so arg-max resolves every sample to
    // class 0: accuracy equals the fraction of zero labels
    let acc = eval::score(&unroll.output.spikes, &[0, 1, 0, 1]).unwrap();
    assert_eq!(acc.correct, 2);
    assert_eq!(acc.total, 4);
}

#[test]
fn training_reduces_loss_on_synthetic_blobs() {
    let mut rng = StdRng::seed_from_u64(1234);

    let config = SpikeNetConfig::new(8, 16, 2).unwrap();
    let mut net = SpikeNet::new(config, &mut rng).unwrap();

    let train = Dataset::synthetic_blobs(20, 8, 2, 2.0, &mut rng).unwrap();
    let test = Dataset::synthetic_blobs(8, 8, 2, 2.0, &mut rng).unwrap();

    let mut trainer = Trainer::new(
        &net,
        TrainerConfig::new(10, 8, 50).unwrap(),
        SimParams::new(10).unwrap(),
        AdamParams::new(5e-3).unwrap(),
    )
    .unwrap();

    let report = trainer.run(&mut net, &train, &test, &mut rng).unwrap();
    // 40 train samples, batch 8, 10 epochs: 50 iterations
    assert_eq!(report.iterations(), 50);

    let first = report.train_loss[0];
    let last = *report.train_loss.last().unwrap();
    assert!(
        last < first,
        "loss did not decrease: first={} last={}",
        first,
        last
    );

    // The trained network separates the blobs better than chance on the
    // full held-out split, final partial batch included
    let acc = eval::score_dataset(&net, trainer.simulator(), &test, 3).unwrap();
    assert_eq!(acc.total, 16);
    assert!(acc.ratio() >= 0.5);
}

#[test]
fn loss_decrease_survives_optimizer_restarts() {
    // Two independent single-epoch trainers over the same data keep
    // improving because the weights live in the network, not the trainer
    let mut rng = StdRng::seed_from_u64(77);
    let config = SpikeNetConfig::new(8, 16, 2).unwrap();
    let mut net = SpikeNet::new(config, &mut rng).unwrap();

    let train = Dataset::synthetic_blobs(20, 8, 2, 2.0, &mut rng).unwrap();
    let test = Dataset::synthetic_blobs(8, 8, 2, 2.0, &mut rng).unwrap();

    let mut first_losses = Vec::new();
    for _ in 0..2 {
        let mut trainer = Trainer::new(
            &net,
            TrainerConfig::new(5, 8, 50).unwrap(),
            SimParams::new(10).unwrap(),
            AdamParams::new(5e-3).unwrap(),
        )
        .unwrap();
        let report = trainer.run(&mut net, &train, &test, &mut rng).unwrap();
        first_losses.push(report.train_loss[0]);
    }
    assert!(first_losses[1] < first_losses[0]);
}

proptest! {
    #[test]
    fn unroll_always_yields_binary_spikes_and_exact_shapes(
        seed in 0u64..1000,
        batch in 1usize..6,
        steps in 1usize..12,
        scale in -2.0f32..2.0,
    ) {
        let net = tiny_net(seed);
        let sim = TemporalSimulator::new(SimParams::new(steps).unwrap()).unwrap();
        let x = Array2::<f32>::from_elem((batch, 4), scale);

        let unroll = sim.run(&net, &x).unwrap();
        prop_assert_eq!(unroll.output.num_steps(), steps);
        prop_assert_eq!(unroll.hidden.num_steps(), steps);
        for t in 0..steps {
            prop_assert_eq!(unroll.output.spikes[t].dim(), (batch, 2));
            prop_assert_eq!(unroll.output.potentials[t].dim(), (batch, 2));
            prop_assert!(unroll.output.spikes[t].iter().all(|&s| s == 0.0 || s == 1.0));
            prop_assert!(unroll.hidden.spikes[t].iter().all(|&s| s == 0.0 || s == 1.0));
        }
    }
}

#[test]
fn loss_scales_linearly_with_simulation_length() {
    let net = tiny_net(9);
    let x = Array2::<f32>::ones((2, 4));
    let targets = [0usize, 1];

    // A single-step simulation repeated k times in one trajectory sums to
    // k times the per-step loss only when the potentials repeat; compare
    // instead the first-step loss against a trajectory that tiles it
    let sim = TemporalSimulator::new(SimParams::new(1).unwrap()).unwrap();
    let unroll = sim.run(&net, &x).unwrap();
    let step = unroll.output.potentials[0].clone();

    let single = temporal_cross_entropy(&[step.clone()], &targets).unwrap();
    let tiled: Vec<_> = (0..8).map(|_| step.clone()).collect();
    let repeated = temporal_cross_entropy(&tiled, &targets).unwrap();

    assert!((repeated.value - 8.0 * single.value).abs() < 1e-4);
}
