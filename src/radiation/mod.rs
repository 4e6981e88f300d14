//! Gray-diffuse (Lambertian) surface radiation network.
//!
//! Radiative exchange between an enclosure's surfaces is linear in radiosity
//! for gray-diffuse surfaces: every cycle accumulates per-surface area,
//! emissive power and temperature over mesh-face visits, reduces them across
//! workers, and solves one dense linear system from which heat-flux density,
//! irradiation and adiabatic surface temperatures are derived.

pub mod config;
pub mod network;
pub mod solve;
pub mod view_factors;

pub use config::{BoundaryTemperature, RadiationConfig, STEFAN_BOLTZMANN};
pub use network::{ParallelReduce, SerialReduce, SurfaceRadiationNetwork, SurfaceSample};
pub use view_factors::{ConstantViewFactors, ViewFactorMatrix, ViewFactorSource};
