use crate::config::ParticleConfig;
use glam::Vec3;
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
struct Particle {
    position: Vec3,
    /// Displacement per tick.
    velocity: Vec3,
    color: [f32; 3],
    lifetime: f32,
}

/// Uniform in a cube of edge `edge` centered on the origin.
fn random_vec(rng: &mut impl Rng, edge: f32) -> Vec3 {
    Vec3::new(
        rng.random_range(-0.5..0.5),
        rng.random_range(-0.5..0.5),
        rng.random_range(-0.5..0.5),
    ) * edge
}

/// A drawable particle: world position and RGB color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleInstance {
    pub position: Vec3,
    pub color: [f32; 3],
}

/// Celebration burst around the house. Particles drift and fade together;
/// each one disappears when its own lifetime runs out.
#[derive(Debug, Clone)]
pub struct ParticleBurst {
    particles: Vec<Particle>,
    elapsed: f32,
    duration: f32,
    size: f32,
}

impl ParticleBurst {
    pub fn spawn(origin: Vec3, config: &ParticleConfig, rng: &mut impl Rng) -> Self {
        let particles = (0..config.count)
            .map(|_| Particle {
                position: origin + random_vec(rng, config.spread),
                velocity: random_vec(rng, config.max_speed),
                color: rng.random(),
                lifetime: if config.max_lifetime > config.min_lifetime {
                    rng.random_range(config.min_lifetime..config.max_lifetime)
                } else {
                    config.min_lifetime
                },
            })
            .collect();
        tracing::debug!(count = config.count, "particle burst spawned");
        Self {
            particles,
            elapsed: 0.0,
            duration: config.duration,
            size: config.size,
        }
    }

    /// Advance one tick. Returns false once the burst has run its course and
    /// should be dropped.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        let elapsed = self.elapsed;
        for particle in self.particles.iter_mut().filter(|p| elapsed < p.lifetime) {
            particle.position += particle.velocity;
        }
        !self.is_finished()
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Shared opacity of every particle.
    pub fn opacity(&self) -> f32 {
        (1.0 - self.elapsed / self.duration).max(0.0)
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Edge length of a drawn particle.
    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Particles still within their lifetime.
    pub fn live(&self) -> impl Iterator<Item = ParticleInstance> + '_ {
        self.particles
            .iter()
            .filter(|p| self.elapsed < p.lifetime)
            .map(|p| ParticleInstance {
                position: p.position,
                color: p.color,
            })
    }
}
