use std::collections::HashMap;
use std::collections::HashSet;

use anyhow::{Context, Result};

use crate::point::Point;

use super::config::{BoundaryTemperature, RadiationConfig};
use super::solve::solve_dense;
use super::view_factors::{ViewFactorMatrix, ViewFactorSource};

/// Collective reduction across data-parallel workers.
///
/// Each worker accumulates over the mesh entities it owns; `sum` must leave
/// the element-wise global sum in place on every worker. This is the single
/// synchronization point of a radiation cycle.
pub trait ParallelReduce {
    fn sum(&self, values: &mut [f64]);
}

/// Single-process reduction: local sums already are the global sums.
pub struct SerialReduce;

impl ParallelReduce for SerialReduce {
    fn sum(&self, _values: &mut [f64]) {}
}

/// One quadrature point of a mesh-face visit.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceSample {
    /// Position of the quadrature point.
    pub position: Point,
    /// Quadrature weight times the Jacobian of the face mapping.
    pub weight: f64,
    /// Coordinate-system factor (1 for Cartesian, 2*pi*r for RZ).
    pub coord_factor: f64,
    /// Coupled temperature field value at the point. Ignored for
    /// fixed-temperature surfaces (the boundary function is evaluated
    /// instead) and for adiabatic surfaces.
    pub temperature: f64,
}

enum SurfaceKind {
    /// Temperature comes from the coupled field via [`SurfaceSample`].
    Variable,
    /// Temperature is imposed as a function of time and position.
    Fixed(Box<dyn BoundaryTemperature>),
    /// Zero net heat flux; temperature is back-solved from radiosity.
    Adiabatic,
}

struct Surface {
    name: String,
    emissivity: f64,
    kind: SurfaceKind,
}

/// Per-cycle accumulator state, reset at `initialize` and reduced once at
/// `finalize`. Entries are surface-indexed.
#[derive(Debug, Clone, Default)]
struct CycleAccumulators {
    /// Accumulated `weight * coord_factor`.
    area: Vec<f64>,
    /// Accumulated area-weighted emissive power `sigma * eps * T^4`.
    emissive_power: Vec<f64>,
    /// Accumulated area-weighted temperature.
    temperature: Vec<f64>,
}

impl CycleAccumulators {
    fn reset(&mut self, n: usize) {
        self.area = vec![0.0; n];
        self.emissive_power = vec![0.0; n];
        self.temperature = vec![0.0; n];
    }
}

/// Quantities derived from the last radiosity solve; read-only between
/// cycles. Entries are surface-indexed.
#[derive(Debug, Clone, Default)]
struct SolvedFields {
    radiosity: Vec<f64>,
    irradiation: Vec<f64>,
    heat_flux_density: Vec<f64>,
    temperature: Vec<f64>,
}

impl SolvedFields {
    fn reset(&mut self, n: usize) {
        self.radiosity = vec![0.0; n];
        self.irradiation = vec![0.0; n];
        self.heat_flux_density = vec![0.0; n];
        self.temperature = vec![0.0; n];
    }
}

/// Radiative exchange network between gray-diffuse surfaces.
///
/// Lifecycle per evaluation cycle:
/// 1. [`initialize`](Self::initialize) — zero the accumulators;
/// 2. [`accumulate`](Self::accumulate) — once per owned mesh face;
/// 3. [`finalize`](Self::finalize) — reduce across workers, assemble and
///    solve the radiosity system, derive per-surface quantities;
/// 4. queries — any number, until the next `initialize`.
///
/// Queries take the external surface identifier and return a documented
/// default (`0`, emissivity `1`) for identifiers unknown to this network
/// instead of erroring, so thin reporting adapters can probe freely.
pub struct SurfaceRadiationNetwork {
    sigma: f64,
    surfaces: Vec<Surface>,
    index: HashMap<String, usize>,
    view_factors: ViewFactorMatrix,
    accum: CycleAccumulators,
    solved: SolvedFields,
}

impl SurfaceRadiationNetwork {
    /// Validates the configuration, obtains the view-factor matrix from the
    /// source, and sets up zeroed state.
    pub fn new(config: RadiationConfig, view_factors: &dyn ViewFactorSource) -> Result<Self> {
        config.validate()?;

        let n = config.boundary_names.len();
        let view_factors = view_factors.view_factors(n)?;

        let mut fixed: HashMap<String, Box<dyn BoundaryTemperature>> = config
            .fixed_temperature_boundaries
            .into_iter()
            .zip(config.fixed_boundary_temperatures)
            .collect();
        let adiabatic: HashSet<String> = config.adiabatic_boundaries.into_iter().collect();

        let mut surfaces = Vec::with_capacity(n);
        let mut index = HashMap::with_capacity(n);
        for (i, (name, emissivity)) in config
            .boundary_names
            .into_iter()
            .zip(config.emissivities)
            .enumerate()
        {
            let kind = if adiabatic.contains(&name) {
                SurfaceKind::Adiabatic
            } else if let Some(f) = fixed.remove(&name) {
                SurfaceKind::Fixed(f)
            } else {
                SurfaceKind::Variable
            };
            index.insert(name.clone(), i);
            surfaces.push(Surface {
                name,
                emissivity,
                kind,
            });
        }

        let mut accum = CycleAccumulators::default();
        accum.reset(n);
        let mut solved = SolvedFields::default();
        solved.reset(n);

        Ok(Self {
            sigma: config.stefan_boltzmann,
            surfaces,
            index,
            view_factors,
            accum,
            solved,
        })
    }

    pub fn n_surfaces(&self) -> usize {
        self.surfaces.len()
    }

    /// Starts a new evaluation cycle.
    pub fn initialize(&mut self) {
        self.accum.reset(self.surfaces.len());
    }

    /// Accumulates one mesh-face visit belonging to `surface`.
    ///
    /// Area accumulates for every surface; emissive power and temperature
    /// only for non-adiabatic ones, using the imposed boundary function for
    /// fixed-temperature surfaces and the sample's coupled value otherwise.
    pub fn accumulate(
        &mut self,
        surface: &str,
        samples: &[SurfaceSample],
        time: f64,
    ) -> Result<()> {
        let i = *self
            .index
            .get(surface)
            .with_context(|| format!("Unknown radiation surface '{surface}'"))?;
        let surf = &self.surfaces[i];

        for sample in samples {
            let w = sample.weight * sample.coord_factor;
            self.accum.area[i] += w;

            let temperature = match &surf.kind {
                SurfaceKind::Adiabatic => continue,
                SurfaceKind::Fixed(f) => f.at(time, sample.position),
                SurfaceKind::Variable => sample.temperature,
            };
            self.accum.emissive_power[i] +=
                w * self.sigma * surf.emissivity * temperature.powi(4);
            self.accum.temperature[i] += w * temperature;
        }
        Ok(())
    }

    /// Reduces the accumulators across workers, solves the radiosity system,
    /// and derives the per-surface quantities.
    ///
    /// After the blocking reduction every worker solves the identical system
    /// on identical data, so no further communication is needed.
    pub fn finalize(&mut self, reduce: &dyn ParallelReduce) -> Result<()> {
        reduce.sum(&mut self.accum.area);
        reduce.sum(&mut self.accum.emissive_power);
        reduce.sum(&mut self.accum.temperature);

        let n = self.surfaces.len();
        let mut beta = vec![0.0; n];
        self.solved.reset(n);

        for (i, surf) in self.surfaces.iter().enumerate() {
            let area = self.accum.area[i];
            anyhow::ensure!(
                area > 0.0,
                "Radiation surface '{}' accumulated no area this cycle",
                surf.name
            );
            beta[i] = self.accum.emissive_power[i] / area;
            self.solved.temperature[i] = self.accum.temperature[i] / area;
        }

        // Radiosity balance: J_i - rho_i * sum_j F_ij J_j = beta_i, where the
        // reflectance rho is 1 for adiabatic surfaces (all incident radiation
        // re-leaves) and 1 - eps otherwise.
        let mut matrix = vec![0.0; n * n];
        let mut rhs = beta;
        for (i, surf) in self.surfaces.iter().enumerate() {
            matrix[i * n + i] = 1.0;
            let reflectance = match surf.kind {
                SurfaceKind::Adiabatic => 1.0,
                _ => 1.0 - surf.emissivity,
            };
            for j in 0..n {
                matrix[i * n + j] -= reflectance * self.view_factors.get(i, j);
            }
        }

        let radiosity =
            solve_dense(&mut matrix, &mut rhs).context("Radiosity system solve failed")?;

        for (i, surf) in self.surfaces.iter().enumerate() {
            let irradiation: f64 = (0..n)
                .map(|j| self.view_factors.get(i, j) * radiosity[j])
                .sum();
            self.solved.irradiation[i] = irradiation;
            self.solved.heat_flux_density[i] = radiosity[i] - irradiation;

            if matches!(surf.kind, SurfaceKind::Adiabatic) {
                let eps = surf.emissivity;
                let q = self.solved.heat_flux_density[i];
                let emissive = radiosity[i] + (1.0 - eps) / eps * q;
                self.solved.temperature[i] = (emissive / self.sigma).powf(0.25);
            }
        }
        self.solved.radiosity = radiosity;

        Ok(())
    }

    fn lookup(&self, surface: &str) -> Option<usize> {
        self.index.get(surface).copied()
    }

    /// Radiosity of a surface; 0 for unknown identifiers.
    pub fn surface_radiosity(&self, surface: &str) -> f64 {
        self.lookup(surface)
            .map_or(0.0, |i| self.solved.radiosity[i])
    }

    /// Incident radiative flux on a surface; 0 for unknown identifiers.
    pub fn surface_irradiation(&self, surface: &str) -> f64 {
        self.lookup(surface)
            .map_or(0.0, |i| self.solved.irradiation[i])
    }

    /// Net outgoing heat-flux density of a surface; 0 for unknown
    /// identifiers.
    pub fn surface_heat_flux_density(&self, surface: &str) -> f64 {
        self.lookup(surface)
            .map_or(0.0, |i| self.solved.heat_flux_density[i])
    }

    /// Area-averaged surface temperature (back-solved for adiabatic
    /// surfaces); 0 for unknown identifiers.
    pub fn surface_temperature(&self, surface: &str) -> f64 {
        self.lookup(surface)
            .map_or(0.0, |i| self.solved.temperature[i])
    }

    /// Emissivity of a surface; 1 for unknown identifiers.
    pub fn surface_emissivity(&self, surface: &str) -> f64 {
        self.lookup(surface)
            .map_or(1.0, |i| self.surfaces[i].emissivity)
    }

    /// View factor between two surfaces; 0 if either is unknown.
    pub fn view_factor(&self, from: &str, to: &str) -> f64 {
        match (self.lookup(from), self.lookup(to)) {
            (Some(i), Some(j)) => self.view_factors.get(i, j),
            _ => 0.0,
        }
    }

    /// Identifiers of all surfaces known to this network.
    pub fn surface_ids(&self) -> HashSet<&str> {
        self.surfaces.iter().map(|s| s.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::radiation::config::STEFAN_BOLTZMANN;
    use crate::radiation::view_factors::ConstantViewFactors;

    fn facing_pair() -> ConstantViewFactors {
        ConstantViewFactors::new(vec![vec![0.0, 1.0], vec![1.0, 0.0]])
    }

    fn unit_sample(temperature: f64) -> SurfaceSample {
        SurfaceSample {
            position: Point::default(),
            weight: 1.0,
            coord_factor: 1.0,
            temperature,
        }
    }

    fn run_cycle(network: &mut SurfaceRadiationNetwork, temps: &[(&str, f64)]) {
        network.initialize();
        for &(name, t) in temps {
            network.accumulate(name, &[unit_sample(t)], 0.0).unwrap();
        }
        network.finalize(&SerialReduce).unwrap();
    }

    #[test]
    fn test_equal_temperatures_give_no_net_exchange() {
        let config = RadiationConfig::new(vec!["a", "b"], vec![0.7, 0.7]);
        let mut network = SurfaceRadiationNetwork::new(config, &facing_pair()).unwrap();
        run_cycle(&mut network, &[("a", 500.0), ("b", 500.0)]);

        let expected = STEFAN_BOLTZMANN * 500.0_f64.powi(4);
        for name in ["a", "b"] {
            assert!(
                (network.surface_radiosity(name) - expected).abs() < 1e-9 * expected,
                "radiosity of '{name}' should equal sigma*T^4"
            );
            assert!(
                network.surface_heat_flux_density(name).abs() < 1e-9 * expected,
                "no net flux between identical-temperature surfaces"
            );
        }
    }

    #[test]
    fn test_black_body_radiosity_equals_emissive_power() {
        let config = RadiationConfig::new(vec!["a", "b"], vec![1.0, 1.0]);
        let mut network = SurfaceRadiationNetwork::new(config, &facing_pair()).unwrap();
        run_cycle(&mut network, &[("a", 400.0), ("b", 300.0)]);

        // With eps = 1 the system is diagonal: J_i = beta_i directly.
        let beta_a = STEFAN_BOLTZMANN * 400.0_f64.powi(4);
        let beta_b = STEFAN_BOLTZMANN * 300.0_f64.powi(4);
        assert!((network.surface_radiosity("a") - beta_a).abs() < 1e-9 * beta_a);
        assert!((network.surface_radiosity("b") - beta_b).abs() < 1e-9 * beta_b);
    }

    #[test]
    fn test_gray_pair_matches_closed_form() {
        // Two infinite parallel gray plates:
        // q = sigma (T0^4 - T1^4) / (1/eps0 + 1/eps1 - 1).
        let (eps_a, eps_b) = (0.5, 0.8);
        let (t_a, t_b) = (400.0_f64, 300.0_f64);
        let config = RadiationConfig::new(vec!["a", "b"], vec![eps_a, eps_b]);
        let mut network = SurfaceRadiationNetwork::new(config, &facing_pair()).unwrap();
        run_cycle(&mut network, &[("a", t_a), ("b", t_b)]);

        let expected = STEFAN_BOLTZMANN * (t_a.powi(4) - t_b.powi(4))
            / (1.0 / eps_a + 1.0 / eps_b - 1.0);
        let q_a = network.surface_heat_flux_density("a");
        let q_b = network.surface_heat_flux_density("b");
        assert!(
            (q_a - expected).abs() < 1e-9 * expected.abs(),
            "q_a = {q_a}, closed form = {expected}"
        );
        assert!((q_a + q_b).abs() < 1e-9 * expected.abs(), "fluxes balance");
    }

    #[test]
    fn test_adiabatic_surface_temperature_back_solve() {
        // An adiabatic surface facing a black plate at 400 K floats to the
        // plate temperature.
        let config = RadiationConfig::new(vec!["hot", "floating"], vec![1.0, 0.6])
            .with_fixed_temperature("hot", |_: f64, _: Point| 400.0)
            .with_adiabatic("floating");
        let mut network = SurfaceRadiationNetwork::new(config, &facing_pair()).unwrap();

        network.initialize();
        network.accumulate("hot", &[unit_sample(0.0)], 0.0).unwrap();
        network
            .accumulate("floating", &[unit_sample(0.0)], 0.0)
            .unwrap();
        network.finalize(&SerialReduce).unwrap();

        let t = network.surface_temperature("floating");
        assert!((t - 400.0).abs() < 1e-6, "floating temperature = {t}");
        assert!(
            network.surface_heat_flux_density("floating").abs() < 1e-6,
            "adiabatic surface carries no net flux"
        );
    }

    #[test]
    fn test_fixed_temperature_function_sees_time_and_position() {
        let config = RadiationConfig::new(vec!["a", "b"], vec![1.0, 1.0])
            .with_fixed_temperature("a", |time, p: Point| 300.0 + 10.0 * time + p.z);
        let mut network = SurfaceRadiationNetwork::new(config, &facing_pair()).unwrap();

        network.initialize();
        let sample = SurfaceSample {
            position: Point::new(0.0, 0.0, 50.0),
            weight: 1.0,
            coord_factor: 1.0,
            temperature: 999.0, // must be ignored for a fixed surface
        };
        network.accumulate("a", &[sample], 5.0).unwrap();
        network.accumulate("b", &[unit_sample(400.0)], 5.0).unwrap();
        network.finalize(&SerialReduce).unwrap();

        assert!((network.surface_temperature("a") - 400.0).abs() < 1e-12);
    }

    #[test]
    fn test_area_weighted_temperature_average() {
        let config = RadiationConfig::new(vec!["a", "b"], vec![0.9, 0.9]);
        let mut network = SurfaceRadiationNetwork::new(config, &facing_pair()).unwrap();

        network.initialize();
        let samples = [
            SurfaceSample {
                position: Point::default(),
                weight: 1.0,
                coord_factor: 1.0,
                temperature: 300.0,
            },
            SurfaceSample {
                position: Point::default(),
                weight: 3.0,
                coord_factor: 1.0,
                temperature: 500.0,
            },
        ];
        network.accumulate("a", &samples, 0.0).unwrap();
        network.accumulate("b", &[unit_sample(400.0)], 0.0).unwrap();
        network.finalize(&SerialReduce).unwrap();

        // (1*300 + 3*500) / 4 = 450
        assert!((network.surface_temperature("a") - 450.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_surface_accumulate_errors() {
        let config = RadiationConfig::new(vec!["a", "b"], vec![0.9, 0.9]);
        let mut network = SurfaceRadiationNetwork::new(config, &facing_pair()).unwrap();
        network.initialize();
        let err = network
            .accumulate("nope", &[unit_sample(300.0)], 0.0)
            .unwrap_err();
        assert!(format!("{err:#}").contains("Unknown radiation surface"));
    }

    #[test]
    fn test_unvisited_surface_is_a_finalize_error() {
        let config = RadiationConfig::new(vec!["a", "b"], vec![0.9, 0.9]);
        let mut network = SurfaceRadiationNetwork::new(config, &facing_pair()).unwrap();
        network.initialize();
        network.accumulate("a", &[unit_sample(300.0)], 0.0).unwrap();
        let err = network.finalize(&SerialReduce).unwrap_err();
        assert!(format!("{err:#}").contains("accumulated no area"));
    }

    #[test]
    fn test_query_defaults_for_unknown_surface() {
        let config = RadiationConfig::new(vec!["a", "b"], vec![0.9, 0.9]);
        let network = SurfaceRadiationNetwork::new(config, &facing_pair()).unwrap();

        assert_eq!(network.surface_radiosity("nope"), 0.0);
        assert_eq!(network.surface_irradiation("nope"), 0.0);
        assert_eq!(network.surface_heat_flux_density("nope"), 0.0);
        assert_eq!(network.surface_temperature("nope"), 0.0);
        assert_eq!(network.surface_emissivity("nope"), 1.0);
        assert_eq!(network.view_factor("a", "nope"), 0.0);
    }

    #[test]
    fn test_surface_ids_and_view_factor_lookup() {
        let config = RadiationConfig::new(vec!["a", "b"], vec![0.9, 0.9]);
        let network = SurfaceRadiationNetwork::new(config, &facing_pair()).unwrap();

        let ids = network.surface_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("a") && ids.contains("b"));
        assert_eq!(network.view_factor("a", "b"), 1.0);
        assert_eq!(network.view_factor("a", "a"), 0.0);
        assert_eq!(network.surface_emissivity("b"), 0.9);
    }

    #[test]
    fn test_initialize_resets_accumulators() {
        let config = RadiationConfig::new(vec!["a", "b"], vec![0.9, 0.9]);
        let mut network = SurfaceRadiationNetwork::new(config, &facing_pair()).unwrap();
        run_cycle(&mut network, &[("a", 500.0), ("b", 300.0)]);
        let first = network.surface_radiosity("a");

        // A second, identical cycle must give identical results, not doubled
        // accumulators.
        run_cycle(&mut network, &[("a", 500.0), ("b", 300.0)]);
        let second = network.surface_radiosity("a");
        assert!((first - second).abs() < 1e-12);
    }
}
