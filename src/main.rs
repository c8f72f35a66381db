//! MeRF Probe
//!
//! Builds the radiance field on the CPU backend and evaluates it on a
//! deterministic probe batch, logging density and color statistics.

use burn::backend::NdArray;
use clap::Parser;
use glam::Vec3;
use merf_field::batch::{directions_to_tensor, points_to_tensor, tensor_to_vec3};
use merf_field::{NerfNetwork, NetworkConfig, Shading};
use std::error::Error;
use std::f32::consts::PI;
use std::path::PathBuf;
use tracing::{info, warn};

type Backend = NdArray;

/// MeRF - probe a hybrid grid / tri-plane radiance field
#[derive(Parser, Debug)]
#[command(name = "merf")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Network configuration (JSON); defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of probe points; zero probes an empty batch
    #[arg(short = 'n', long, default_value_t = 4096)]
    points: usize,

    /// Shading mode (full, diffuse, specular)
    #[arg(short, long, default_value = "full")]
    shading: Shading,

    /// Also query this proposal stage
    #[arg(short, long)]
    proposal: Option<usize>,

    /// Write the effective configuration here
    #[arg(long)]
    write_config: Option<PathBuf>,
}

/// Low-discrepancy points filling `[-bound, bound]^3`.
fn probe_points(count: usize, bound: f32) -> Vec<Vec3> {
    const A1: f32 = 0.819_172_5;
    const A2: f32 = 0.671_043_5;
    const A3: f32 = 0.549_700_5;

    (0..count)
        .map(|i| {
            let i = i as f32 + 0.5;
            let unit = Vec3::new((i * A1).fract(), (i * A2).fract(), (i * A3).fract());
            (unit * 2.0 - Vec3::ONE) * bound
        })
        .collect()
}

/// Directions spread over the unit sphere (Fibonacci lattice).
fn probe_directions(count: usize) -> Vec<Vec3> {
    let golden = PI * (3.0 - 5.0f32.sqrt());
    (0..count)
        .map(|i| {
            let z = 1.0 - 2.0 * (i as f32 + 0.5) / count as f32;
            let r = (1.0 - z * z).sqrt();
            let theta = golden * i as f32;
            Vec3::new(r * theta.cos(), r * theta.sin(), z)
        })
        .collect()
}

fn summarize(label: &str, sigma: &[f32]) {
    if sigma.is_empty() {
        warn!("{}: no samples", label);
        return;
    }
    let min = sigma.iter().copied().fold(f32::INFINITY, f32::min);
    let max = sigma.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mean = sigma.iter().sum::<f32>() / sigma.len() as f32;
    info!("{}: sigma min {:.5}, mean {:.5}, max {:.5}", label, min, mean, max);
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => NetworkConfig::from_file(path)?,
        None => NetworkConfig::new(),
    };
    if let Some(path) = &args.write_config {
        config.to_file(path)?;
        info!("Wrote configuration to {:?}", path);
    }

    let device = Default::default();
    let network = NerfNetwork::<Backend>::new(&config, &device)?;

    let points = probe_points(args.points, config.bound);
    let directions = probe_directions(args.points);
    info!(
        "Probing {} points in [-{b}, {b}]^3 with {} shading",
        points.len(),
        args.shading,
        b = config.bound
    );

    let x = points_to_tensor::<Backend>(&points, &device);
    let d = directions_to_tensor::<Backend>(&directions, &device);
    let output = network.forward(x.clone(), d, args.shading);

    let sigma: Vec<f32> = output.sigma.into_data().iter::<f32>().collect();
    summarize("field", &sigma);

    let colors = tensor_to_vec3(output.color);
    if !colors.is_empty() {
        let mean = colors.iter().copied().sum::<Vec3>() / colors.len() as f32;
        info!("field: mean color ({:.4}, {:.4}, {:.4})", mean.x, mean.y, mean.z);
    }
    if let Some(specular) = output.specular {
        let specular = tensor_to_vec3(specular);
        let peak = specular.iter().copied().fold(Vec3::ZERO, Vec3::max);
        info!("field: peak specular ({:.4}, {:.4}, {:.4})", peak.x, peak.y, peak.z);
    }

    if let Some(stage) = args.proposal {
        let density = network.density(x, Some(stage))?;
        let sigma: Vec<f32> = density.sigma.into_data().iter::<f32>().collect();
        summarize(&format!("proposal {}", stage), &sigma);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_sets_fill_the_bound() {
        let points = probe_points(256, 2.0);
        assert_eq!(points.len(), 256);
        assert!(points.iter().all(|p| p.abs().max_element() <= 2.0));

        let directions = probe_directions(256);
        assert!(directions.iter().all(|d| (d.length() - 1.0).abs() < 1e-5));
    }

    #[test]
    fn test_zero_points_runs_an_empty_batch() {
        let args = Args::try_parse_from(["merf", "--points", "0"]).unwrap();
        assert_eq!(args.points, 0);
        assert!(probe_points(args.points, 1.0).is_empty());
        assert!(probe_directions(args.points).is_empty());

        let device = Default::default();
        let network = NerfNetwork::<Backend>::new(&NetworkConfig::new(), &device).unwrap();
        let x = points_to_tensor::<Backend>(&[], &device);
        let d = directions_to_tensor::<Backend>(&[], &device);
        let output = network.forward(x, d, Shading::Full);
        assert!(tensor_to_vec3(output.color).is_empty());
    }
}
