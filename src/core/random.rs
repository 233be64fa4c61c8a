//! Random helpers shared by the simulation systems
//!
//! Every system receives the simulation's generator explicitly; nothing
//! here touches a thread-local or global source.

use rand::Rng;

/// Standard normal sample scaled to `mean`/`std_dev` (Box-Muller)
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f32, std_dev: f32) -> f32 {
    let u1: f32 = rng.gen::<f32>().clamp(f32::MIN_POSITIVE, 1.0);
    let u2: f32 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (std::f32::consts::TAU * u2).cos();
    mean + z * std_dev
}

/// Uniform in `[-range, range]`
pub fn symmetric<R: Rng + ?Sized>(rng: &mut R, range: f32) -> f32 {
    if range <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-range..=range)
}

/// Growth increment: rounded gaussian, floored at 1
pub fn growth_increment<R: Rng + ?Sized>(rng: &mut R, mean: f32, std_dev: f32) -> u32 {
    gaussian(rng, mean, std_dev).round().max(1.0) as u32
}
