//! Air properties as a function of temperature, humidity, pressure and CO2
//! fraction, plus the complex lossy wave number derived from them.
//!
//! Two calculators are provided, selected by [`crate::instrument::CalculatorKind`]:
//! [`FullAirModel`] (general purpose, all four physical inputs) and
//! [`SimpleAirModel`] (temperature-only linearization, used for the NAF
//! calculator).

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::error::{CoreError, CoreResult};

/// Gas constant, J/(mol*K).
const GAS_CONSTANT: f64 = 8.314462618;
/// Molar mass of dry air, kg/mol.
const MOLAR_MASS_DRY_AIR: f64 = 28.9647e-3;
/// Molar mass of water vapor, kg/mol.
const MOLAR_MASS_WATER: f64 = 18.01528e-3;
/// Molar mass of CO2, kg/mol.
const MOLAR_MASS_CO2: f64 = 44.01e-3;

/// Specific heat of dry air at constant pressure, J/(kg*K).
const CP_DRY_AIR: f64 = 1006.0;
/// Specific heat of water vapor at constant pressure, J/(kg*K).
const CP_WATER_VAPOR: f64 = 1870.0;

/// Sutherland's law reference viscosity, Pa*s, at `SUTHERLAND_T_REF`.
const SUTHERLAND_MU_REF: f64 = 1.716e-5;
const SUTHERLAND_T_REF: f64 = 273.15;
const SUTHERLAND_S: f64 = 110.4;

/// Fixed relative humidity (%) used by the NAF-specific [`SimpleAirModel`].
const SIMPLE_MODEL_HUMIDITY_PERCENT: f64 = 45.0;

/// Physical conditions the instrument is played under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalParameters {
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
    pub pressure_kpa: f64,
    pub co2_fraction: f64,
}

impl Default for PhysicalParameters {
    fn default() -> Self {
        Self {
            temperature_celsius: 20.0,
            humidity_percent: 45.0,
            pressure_kpa: 101.325,
            co2_fraction: 0.00039,
        }
    }
}

impl PhysicalParameters {
    pub fn validate(&self) -> CoreResult<()> {
        if !self.temperature_celsius.is_finite() || self.temperature_celsius <= -273.15 {
            return Err(CoreError::InvalidPhysicalInput {
                field: "temperature_celsius",
                value: self.temperature_celsius,
            });
        }
        if !self.pressure_kpa.is_finite() || self.pressure_kpa <= 0.0 {
            return Err(CoreError::InvalidPhysicalInput {
                field: "pressure_kpa",
                value: self.pressure_kpa,
            });
        }
        if !self.humidity_percent.is_finite()
            || !(0.0..=100.0).contains(&self.humidity_percent)
        {
            return Err(CoreError::InvalidPhysicalInput {
                field: "humidity_percent",
                value: self.humidity_percent,
            });
        }
        if !self.co2_fraction.is_finite() || !(0.0..1.0).contains(&self.co2_fraction) {
            return Err(CoreError::InvalidPhysicalInput {
                field: "co2_fraction",
                value: self.co2_fraction,
            });
        }
        Ok(())
    }

    fn kelvin(&self) -> f64 {
        self.temperature_celsius + 273.15
    }
}

/// Derived air properties consumed by the geometry calculators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirProperties {
    /// Speed of sound, m/s.
    pub speed_of_sound: f64,
    /// Density, kg/m^3.
    pub density: f64,
    /// Dynamic viscosity, Pa*s.
    pub dynamic_viscosity: f64,
    /// Thermal conductivity, W/(m*K).
    pub thermal_conductivity: f64,
    /// Ratio of specific heats.
    pub gamma: f64,
    /// Prandtl number.
    pub prandtl: f64,
    /// Boundary-layer loss constant alpha0 = sqrt(mu/(2*rho*c)) * (1 + (gamma-1)/sqrt(Pr)).
    pub alpha0: f64,
}

fn alpha0_from(mu: f64, rho: f64, c: f64, gamma: f64, prandtl: f64) -> f64 {
    (mu / (2.0 * rho * c)).sqrt() * (1.0 + (gamma - 1.0) / prandtl.sqrt())
}

fn dynamic_viscosity(t_kelvin: f64) -> f64 {
    SUTHERLAND_MU_REF * (t_kelvin / SUTHERLAND_T_REF).powf(1.5)
        * (SUTHERLAND_T_REF + SUTHERLAND_S)
        / (t_kelvin + SUTHERLAND_S)
}

fn thermal_conductivity(t_kelvin: f64) -> f64 {
    0.02624 * (t_kelvin / 300.0).powf(0.8646)
}

/// Saturation vapor pressure (kPa) via the Buck equation.
fn saturation_vapor_pressure_kpa(t_celsius: f64) -> f64 {
    0.61121 * (((18.678 - t_celsius / 234.5) * t_celsius) / (257.14 + t_celsius)).exp()
}

/// Mole fraction of water vapor in the mixture.
fn water_vapor_mole_fraction(t_celsius: f64, humidity_percent: f64, pressure_kpa: f64) -> f64 {
    let p_sat = saturation_vapor_pressure_kpa(t_celsius);
    let p_vapor = (humidity_percent / 100.0) * p_sat;
    (p_vapor / pressure_kpa).clamp(0.0, 0.07)
}

/// Full air-property model: pressure, humidity, CO2 fraction, temperature.
///
/// Uses a CIPM-2007-style mixture density (ideal-gas equation of state
/// with a humid, CO2-enriched molar mass) and Tsilingiris-style
/// temperature correlations for the transport properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullAirModel;

impl FullAirModel {
    pub fn compute(&self, params: &PhysicalParameters) -> CoreResult<AirProperties> {
        params.validate()?;
        let t_kelvin = params.kelvin();
        let pressure_pa = params.pressure_kpa * 1000.0;

        let x_water = water_vapor_mole_fraction(
            params.temperature_celsius,
            params.humidity_percent,
            params.pressure_kpa,
        );
        let x_co2 = (1.0 - x_water) * params.co2_fraction;
        let x_dry = 1.0 - x_water - x_co2;

        let molar_mass = x_dry * MOLAR_MASS_DRY_AIR + x_water * MOLAR_MASS_WATER
            + x_co2 * MOLAR_MASS_CO2;
        let density = pressure_pa * molar_mass / (GAS_CONSTANT * t_kelvin);

        let gamma_dry = 1.4;
        let gamma_water_vapor = 1.33;
        let gamma_co2 = 1.289;
        let gamma = x_dry * gamma_dry + x_water * gamma_water_vapor + x_co2 * gamma_co2;

        let speed_of_sound = (gamma * GAS_CONSTANT * t_kelvin / molar_mass).sqrt();

        let mu = dynamic_viscosity(t_kelvin);
        let kappa = thermal_conductivity(t_kelvin);
        let cp = (1.0 - x_water) * CP_DRY_AIR + x_water * CP_WATER_VAPOR;
        let prandtl = mu * cp / kappa;

        let alpha0 = alpha0_from(mu, density, speed_of_sound, gamma, prandtl);

        Ok(AirProperties {
            speed_of_sound,
            density,
            dynamic_viscosity: mu,
            thermal_conductivity: kappa,
            gamma,
            prandtl,
            alpha0,
        })
    }
}

/// NAF-specific simplified air-property model: temperature-only, fixed
/// 45% humidity, standard atmospheric pressure. Uses the Yang-Yili linear
/// speed-of-sound approximation rather than the full mixture formula.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleAirModel;

impl SimpleAirModel {
    pub fn compute(&self, params: &PhysicalParameters) -> CoreResult<AirProperties> {
        if !params.temperature_celsius.is_finite() || params.temperature_celsius <= -273.15 {
            return Err(CoreError::InvalidPhysicalInput {
                field: "temperature_celsius",
                value: params.temperature_celsius,
            });
        }
        let t_kelvin = params.temperature_celsius + 273.15;

        // Yang-Yili linear speed-of-sound approximation.
        let speed_of_sound = 331.45 + 0.607 * params.temperature_celsius;

        // Fixed-humidity dry-air density scaling; humidity/pressure fields
        // on `params` are ignored by design (matches `SIMPLE_MODEL_HUMIDITY_PERCENT`).
        let _ = SIMPLE_MODEL_HUMIDITY_PERCENT;
        let density = 1.2929 * (273.15 / t_kelvin);

        let gamma = 1.4;
        let prandtl = 0.71;
        let mu = dynamic_viscosity(t_kelvin);

        let alpha0 = alpha0_from(mu, density, speed_of_sound, gamma, prandtl);

        Ok(AirProperties {
            speed_of_sound,
            density,
            dynamic_viscosity: mu,
            thermal_conductivity: thermal_conductivity(t_kelvin),
            gamma,
            prandtl,
            alpha0,
        })
    }
}

/// Real wave number k(f) = 2*pi*f/c.
pub fn wave_number(frequency: f64, speed_of_sound: f64) -> f64 {
    2.0 * PI * frequency / speed_of_sound
}

/// Characteristic impedance Z0 = rho*c/(pi*r^2) of a cylindrical bore of
/// radius `radius` (metres).
pub fn characteristic_impedance(air: &AirProperties, radius: f64) -> f64 {
    air.density * air.speed_of_sound / (PI * radius * radius)
}

/// Complex (lossy) wave number at radius `radius`:
/// `k* = j*k + (1+j)*alpha`, with `alpha = alpha0 * sqrt(k) / r`.
pub fn complex_wave_number(frequency: f64, radius: f64, air: &AirProperties) -> Complex64 {
    let k = wave_number(frequency, air.speed_of_sound);
    let alpha = air.alpha0 * k.sqrt() / radius;
    Complex64::new(0.0, 1.0) * k + Complex64::new(1.0, 1.0) * alpha
}
