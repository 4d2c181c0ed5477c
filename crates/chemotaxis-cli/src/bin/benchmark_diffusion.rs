use chemotaxis_core::config::SimConfig;
use chemotaxis_core::map::TileMap;
use chemotaxis_core::world::World;
use chemotaxis_core::Tile;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use std::time::{Duration, Instant};

fn create_map(size: usize, seed: u64) -> TileMap {
    let mut rng = ChaCha12Rng::seed_from_u64(seed);
    let tiles = (0..size * size)
        .map(|_| {
            let r = rng.random::<f32>();
            Some(if r < 0.10 {
                Tile::Wall
            } else if r < 0.11 {
                Tile::Source
            } else if r < 0.12 {
                Tile::Sink
            } else if r < 0.50 {
                Tile::Full
            } else {
                Tile::Empty
            })
        })
        .collect();
    TileMap::new(size, size, tiles).expect("benchmark map dimensions are valid")
}

fn time_steps(world: &mut World, steps: usize) -> (Duration, u64, u64) {
    let mut diffusion_us = 0;
    let mut agent_us = 0;
    let start = Instant::now();
    for _ in 0..steps {
        let timings = world.step();
        diffusion_us += timings.diffusion_us;
        agent_us += timings.agent_us;
    }
    (start.elapsed(), diffusion_us, agent_us)
}

fn main() {
    let size = 512;
    let num_agents = 10_000;
    let steps = 20;
    println!(
        "Benchmarking {}x{} grid, {} agents, {} ticks",
        size, size, num_agents, steps
    );

    let map = create_map(size, 42);
    let config = SimConfig {
        num_agents,
        diffusion_rate: 0.25,
        num_diffusion_steps: 4,
        noise_scale: 0.1,
        depletion_rate: 0.01,
        seed: 42,
        ..SimConfig::default()
    };

    let mut sequential = World::new(&map, config.clone());
    let mut parallel = World::new(
        &map,
        SimConfig {
            parallel_diffusion: true,
            ..config
        },
    );

    let (elapsed, diffusion_us, agent_us) = time_steps(&mut sequential, steps);
    println!("Sequential diffusion: total {:?}", elapsed);
    println!(
        "  diffusion {} us/tick, agents {} us/tick",
        diffusion_us / steps as u64,
        agent_us / steps as u64
    );

    let (elapsed_par, diffusion_us_par, agent_us_par) = time_steps(&mut parallel, steps);
    println!("Parallel diffusion: total {:?}", elapsed_par);
    println!(
        "  diffusion {} us/tick, agents {} us/tick",
        diffusion_us_par / steps as u64,
        agent_us_par / steps as u64
    );

    let max_diff = sequential
        .grid()
        .concentrations()
        .iter()
        .zip(parallel.grid().concentrations())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    println!("Max field difference after {} ticks: {:e}", steps, max_diff);
}
