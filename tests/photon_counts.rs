// Integration tests for photon count statistics

use cherenkov_mc::{
    BindingRegistry, Config, ModelDispatcher, OpticalMaterial, ParticleState, PhotonYieldSampler,
    RefractiveIndexSpectrum, TableRegistry, TrackRng,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::thread;

#[test]
fn test_poisson_mean_and_variance() {
    let sampler = PhotonYieldSampler::default();
    let mut rng = StdRng::seed_from_u64(12345);
    let draws = 1_000_000;
    let mu = 5.0;
    let counts: Vec<f64> = (0..draws).map(|_| sampler.sample_count(mu, &mut rng) as f64).collect();
    let mean = counts.iter().sum::<f64>() / draws as f64;
    let variance = counts.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (draws - 1) as f64;
    assert!((mean - mu).abs() / mu < 0.01, "mean {}", mean);
    assert!((variance - mu).abs() / mu < 0.05, "variance {}", variance);
}

#[test]
fn test_batch_counts_follow_mean_yield() {
    let material = OpticalMaterial::with_spectrum(
        30,
        "Water",
        RefractiveIndexSpectrum::new(vec![1.8, 3.0, 4.2], vec![1.332, 1.338, 1.349]),
    );
    let d = ModelDispatcher::new(
        Arc::new(TableRegistry::new(20).unwrap()),
        Arc::new(BindingRegistry::new()),
        &Config::new(),
    );
    let particle = ParticleState::new(1.0, 0.99, [0.0; 3], [1.0, 0.0, 0.0]).with_step(0.1, 0.99);
    let mut rng = StdRng::seed_from_u64(6);
    let steps = 20_000;
    let mut total = 0usize;
    let mut mean = 0.0;
    for _ in 0..steps {
        let batch = d.sample_step(&particle, &material, 0.1, &mut rng);
        total += batch.count();
        mean = batch.mean_count;
    }
    let observed = total as f64 / steps as f64;
    // standard error of the average is sqrt(mean/steps)
    assert!((observed - mean).abs() < 5.0 * (mean / steps as f64).sqrt(), "{} vs {}", observed, mean);
}

#[test]
fn test_threaded_sampling_is_reproducible_per_track() {
    let material = OpticalMaterial::with_spectrum(
        31,
        "Glass",
        RefractiveIndexSpectrum::new(vec![1.5, 2.5, 3.5, 4.5], vec![1.45, 1.47, 1.50, 1.56]),
    );
    let d = Arc::new(ModelDispatcher::new(
        Arc::new(TableRegistry::new(20).unwrap()),
        Arc::new(BindingRegistry::new()),
        &Config::new(),
    ));
    let run_seed = 77;
    let sample_track = |d: &ModelDispatcher, track: u64| -> Vec<f64> {
        let mut rng = TrackRng::for_track(run_seed, track);
        let particle = ParticleState::new(1.0, 0.95, [0.0; 3], [0.0, 0.0, 1.0])
            .with_step(2.0, 0.94)
            .with_track_id(track);
        d.sample_step(&particle, &material, 2.0, &mut rng)
            .photons
            .iter()
            .map(|p| p.energy)
            .collect()
    };

    let sequential: Vec<Vec<f64>> = (0..32).map(|t| sample_track(&d, t)).collect();

    let handles: Vec<_> = (0..4u64)
        .map(|worker| {
            let d = Arc::clone(&d);
            let material = material.clone();
            thread::spawn(move || {
                (0..32u64)
                    .filter(|t| t % 4 == worker)
                    .map(|track| {
                        let mut rng = TrackRng::for_track(run_seed, track);
                        let particle = ParticleState::new(1.0, 0.95, [0.0; 3], [0.0, 0.0, 1.0])
                            .with_step(2.0, 0.94)
                            .with_track_id(track);
                        let energies: Vec<f64> = d
                            .sample_step(&particle, &material, 2.0, &mut rng)
                            .photons
                            .iter()
                            .map(|p| p.energy)
                            .collect();
                        (track, energies)
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for (track, energies) in handle.join().unwrap() {
            assert_eq!(energies, sequential[track as usize]);
        }
    }
    assert!(sequential.iter().any(|e| !e.is_empty()));
}
