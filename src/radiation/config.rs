use std::collections::HashSet;

use anyhow::Result;

use crate::point::Point;

/// Stefan–Boltzmann constant [W/(m² K⁴)], the default for
/// [`RadiationConfig::stefan_boltzmann`].
pub const STEFAN_BOLTZMANN: f64 = 5.670367e-8;

/// Imposed boundary temperature as a function of time and position.
///
/// Implemented for any matching closure, so fixed-temperature boundaries can
/// be configured inline: `|t, p| 300.0 + 10.0 * t + p.x`.
pub trait BoundaryTemperature: Send + Sync {
    fn at(&self, time: f64, point: Point) -> f64;
}

impl<F> BoundaryTemperature for F
where
    F: Fn(f64, Point) -> f64 + Send + Sync,
{
    fn at(&self, time: f64, point: Point) -> f64 {
        self(time, point)
    }
}

/// Configuration for a surface radiation network.
///
/// `boundary_names` order defines the surface → index mapping used by the
/// view-factor matrix and the linear system. Surfaces default to
/// variable-temperature (coupled field) boundaries; individual surfaces can
/// be reassigned as fixed-temperature or adiabatic.
pub struct RadiationConfig {
    /// Participating boundary surfaces; order defines the index mapping.
    pub boundary_names: Vec<String>,
    /// Per-surface emissivity, one entry per boundary, each in (0, 1].
    pub emissivities: Vec<f64>,
    /// Stefan–Boltzmann constant; configurable for unit systems other than SI.
    pub stefan_boltzmann: f64,
    /// Surfaces with an imposed temperature, paired entry-wise with
    /// `fixed_boundary_temperatures`.
    pub fixed_temperature_boundaries: Vec<String>,
    /// Temperature functions for the fixed boundaries, same order and length.
    pub fixed_boundary_temperatures: Vec<Box<dyn BoundaryTemperature>>,
    /// Surfaces with zero net heat flux; their temperature is back-solved.
    pub adiabatic_boundaries: Vec<String>,
}

impl RadiationConfig {
    pub fn new<S: Into<String>>(boundary_names: Vec<S>, emissivities: Vec<f64>) -> Self {
        Self {
            boundary_names: boundary_names.into_iter().map(Into::into).collect(),
            emissivities,
            stefan_boltzmann: STEFAN_BOLTZMANN,
            fixed_temperature_boundaries: vec![],
            fixed_boundary_temperatures: vec![],
            adiabatic_boundaries: vec![],
        }
    }

    /// Marks a declared boundary as fixed-temperature.
    pub fn with_fixed_temperature<F>(mut self, name: &str, temperature: F) -> Self
    where
        F: BoundaryTemperature + 'static,
    {
        self.fixed_temperature_boundaries.push(name.to_string());
        self.fixed_boundary_temperatures.push(Box::new(temperature));
        self
    }

    /// Marks a declared boundary as adiabatic.
    pub fn with_adiabatic(mut self, name: &str) -> Self {
        self.adiabatic_boundaries.push(name.to_string());
        self
    }

    /// Cross-field validation; every violation is a configuration error.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.boundary_names.is_empty(),
            "At least one boundary surface is required"
        );

        let mut seen = HashSet::new();
        for name in &self.boundary_names {
            anyhow::ensure!(
                seen.insert(name.as_str()),
                "Boundary '{name}' is declared twice"
            );
        }

        anyhow::ensure!(
            self.emissivities.len() == self.boundary_names.len(),
            "Expected {} emissivity entries (one per boundary), got {}",
            self.boundary_names.len(),
            self.emissivities.len()
        );
        for (name, &eps) in self.boundary_names.iter().zip(&self.emissivities) {
            anyhow::ensure!(
                eps > 0.0 && eps <= 1.0,
                "Emissivity of boundary '{name}' must be in (0, 1], got {eps}"
            );
        }

        anyhow::ensure!(
            self.stefan_boltzmann > 0.0,
            "Stefan–Boltzmann constant must be positive, got {}",
            self.stefan_boltzmann
        );

        anyhow::ensure!(
            self.fixed_temperature_boundaries.len() == self.fixed_boundary_temperatures.len(),
            "{} fixed-temperature boundaries but {} temperature functions",
            self.fixed_temperature_boundaries.len(),
            self.fixed_boundary_temperatures.len()
        );

        for name in &self.fixed_temperature_boundaries {
            anyhow::ensure!(
                seen.contains(name.as_str()),
                "Fixed-temperature boundary '{name}' is not a declared boundary"
            );
        }
        for name in &self.adiabatic_boundaries {
            anyhow::ensure!(
                seen.contains(name.as_str()),
                "Adiabatic boundary '{name}' is not a declared boundary"
            );
            anyhow::ensure!(
                !self.fixed_temperature_boundaries.contains(name),
                "Boundary '{name}' is declared both fixed-temperature and adiabatic"
            );
        }

        Ok(())
    }
}
