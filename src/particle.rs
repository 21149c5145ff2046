// Charged-particle state handed over by the transport loop for one step
use nalgebra::{Isometry3, Point3, Vector3};

/// Pre- or post-step point of a charged track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepPoint {
    /// Global position (mm)
    pub position: Point3<f64>,
    /// Velocity over c at this point
    pub beta: f64,
    /// Global time (ns)
    pub time: f64,
}

impl StepPoint {
    pub fn new(position: Point3<f64>, beta: f64, time: f64) -> Self {
        StepPoint {
            position,
            beta,
            time,
        }
    }
}

/// Everything this core reads about the charged particle for one step.
///
/// The transport loop owns this value; sampling never mutates it. Any
/// kinetic-energy change is reported back through the photon batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleState {
    pub track_id: u64,
    /// Charge in units of the elementary charge
    pub charge: f64,
    /// Kinetic energy (eV) at the pre-step point
    pub kinetic_energy: f64,
    /// Unit momentum direction over the step (global frame)
    pub direction: Vector3<f64>,
    pub pre: StepPoint,
    pub post: StepPoint,
    /// Global-to-local transform of the volume the step lies in
    pub to_local: Isometry3<f64>,
    /// Name of the logical volume, used for per-volume model bindings
    pub volume: Option<String>,
}

impl ParticleState {
    /// A particle at `position` moving along `direction` at constant beta,
    /// with a zero-length step. Use [`ParticleState::with_step`] to move the
    /// post-step point.
    pub fn new(charge: f64, beta: f64, position: [f64; 3], direction: [f64; 3]) -> Self {
        let dir = Vector3::new(direction[0], direction[1], direction[2]);
        let norm = dir.norm();
        let direction = if norm > 0.0 { dir / norm } else { Vector3::z() };
        let point = StepPoint::new(Point3::new(position[0], position[1], position[2]), beta, 0.0);
        ParticleState {
            track_id: 0,
            charge,
            kinetic_energy: 0.0,
            direction,
            pre: point,
            post: point,
            to_local: Isometry3::identity(),
            volume: None,
        }
    }

    /// Place the post-step point `length` mm along the direction, with
    /// `post_beta` there. The flight time uses the mean velocity.
    pub fn with_step(mut self, length: f64, post_beta: f64) -> Self {
        let mean_beta = 0.5 * (self.pre.beta + post_beta);
        let dt = if mean_beta > 0.0 {
            length / (mean_beta * crate::constants::C_LIGHT_MM_PER_NS)
        } else {
            0.0
        };
        self.post = StepPoint::new(
            self.pre.position + self.direction * length,
            post_beta,
            self.pre.time + dt,
        );
        self
    }

    pub fn with_kinetic_energy(mut self, kinetic_energy: f64) -> Self {
        self.kinetic_energy = kinetic_energy;
        self
    }

    pub fn with_volume(mut self, volume: impl Into<String>) -> Self {
        self.volume = Some(volume.into());
        self
    }

    pub fn with_transform(mut self, to_local: Isometry3<f64>) -> Self {
        self.to_local = to_local;
        self
    }

    pub fn with_track_id(mut self, track_id: u64) -> Self {
        self.track_id = track_id;
        self
    }

    /// Straight-line distance between the step points.
    pub fn segment_length(&self) -> f64 {
        (self.post.position - self.pre.position).norm()
    }

    /// Average of the pre- and post-step beta.
    pub fn mean_beta(&self) -> f64 {
        0.5 * (self.pre.beta + self.post.beta)
    }

    /// Beta at fraction `f` of the step, assuming a linear change.
    pub fn beta_at(&self, f: f64) -> f64 {
        self.pre.beta + f * (self.post.beta - self.pre.beta)
    }

    /// Position at fraction `f` of the step.
    pub fn position_at(&self, f: f64) -> Point3<f64> {
        self.pre.position + (self.post.position - self.pre.position) * f
    }

    /// Time at fraction `f` of the step.
    pub fn time_at(&self, f: f64) -> f64 {
        self.pre.time + f * (self.post.time - self.pre.time)
    }
}
