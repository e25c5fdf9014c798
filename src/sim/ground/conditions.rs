use serde::{Deserialize, Serialize};

use crate::sim::ground::error::{GroundError, GroundResult};

/// Environmental conditions at one instant. Temperatures in K.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConditions {
    pub indoor_temperature: f64,
    pub outdoor_temperature: f64,
    /// Wind speed at the foundation [m/s].
    #[serde(default)]
    pub local_wind_speed: f64,
    /// Effective sky temperature; the outdoor air temperature when absent.
    #[serde(default)]
    pub sky_temperature: Option<f64>,
    /// Mean radiant temperature of the room; the indoor air temperature when absent.
    #[serde(default)]
    pub indoor_radiant_temperature: Option<f64>,
    /// Global irradiance on a horizontal plane [W/m²].
    #[serde(default)]
    pub horizontal_irradiance: f64,
    /// Global irradiance on the exterior wall plane [W/m²].
    #[serde(default)]
    pub vertical_irradiance: f64,
}

impl BoundaryConditions {
    /// Calm, dark conditions with the given air temperatures.
    pub fn new(indoor_temperature: f64, outdoor_temperature: f64) -> Self {
        Self {
            indoor_temperature,
            outdoor_temperature,
            local_wind_speed: 0.0,
            sky_temperature: None,
            indoor_radiant_temperature: None,
            horizontal_irradiance: 0.0,
            vertical_irradiance: 0.0,
        }
    }

    pub fn with_wind_speed(mut self, wind_speed: f64) -> Self {
        self.local_wind_speed = wind_speed;
        self
    }

    pub fn sky_temperature(&self) -> f64 {
        self.sky_temperature.unwrap_or(self.outdoor_temperature)
    }

    pub fn indoor_radiant_temperature(&self) -> f64 {
        self.indoor_radiant_temperature
            .unwrap_or(self.indoor_temperature)
    }

    pub fn validate(&self) -> GroundResult<()> {
        check_temperature("indoor air", self.indoor_temperature)?;
        check_temperature("outdoor air", self.outdoor_temperature)?;
        if let Some(t) = self.sky_temperature {
            check_temperature("sky", t)?;
        }
        if let Some(t) = self.indoor_radiant_temperature {
            check_temperature("indoor radiant", t)?;
        }
        if !self.local_wind_speed.is_finite() || self.local_wind_speed < 0.0 {
            return Err(GroundError::boundary(
                "wind",
                format!(
                    "wind speed must be non-negative (got {})",
                    self.local_wind_speed
                ),
            ));
        }
        for (region, value) in [
            ("horizontal irradiance", self.horizontal_irradiance),
            ("vertical irradiance", self.vertical_irradiance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(GroundError::boundary(
                    region,
                    format!("irradiance must be non-negative (got {value})"),
                ));
            }
        }
        Ok(())
    }
}

/// Absolute temperatures must be finite and strictly positive.
pub(crate) fn check_temperature(region: &'static str, value: f64) -> GroundResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GroundError::boundary(
            region,
            format!("temperature must be a positive absolute value in K (got {value})"),
        ))
    }
}

/// Equally spaced sequence of [`BoundaryConditions`].
///
/// Snapshot `i` holds the conditions at the end of step `i`, i.e. at time
/// `(i + 1) * time_step` after the start of the series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries")]
pub struct BoundaryConditionSeries {
    time_step: f64,
    snapshots: Vec<BoundaryConditions>,
}

/// Unchecked wire form; deserialized series go through [`BoundaryConditionSeries::new`].
#[derive(Deserialize)]
struct RawSeries {
    time_step: f64,
    snapshots: Vec<BoundaryConditions>,
}

impl TryFrom<RawSeries> for BoundaryConditionSeries {
    type Error = GroundError;

    fn try_from(raw: RawSeries) -> GroundResult<Self> {
        Self::new(raw.time_step, raw.snapshots)
    }
}

impl BoundaryConditionSeries {
    pub fn new(time_step: f64, snapshots: Vec<BoundaryConditions>) -> GroundResult<Self> {
        if !time_step.is_finite() || time_step <= 0.0 {
            return Err(GroundError::boundary(
                "time series",
                format!("time step must be positive (got {time_step})"),
            ));
        }
        if snapshots.is_empty() {
            return Err(GroundError::boundary(
                "time series",
                "at least one snapshot is required",
            ));
        }
        for snapshot in &snapshots {
            snapshot.validate()?;
        }
        Ok(Self {
            time_step,
            snapshots,
        })
    }

    /// `steps` copies of the same conditions.
    pub fn constant(
        conditions: BoundaryConditions,
        time_step: f64,
        steps: usize,
    ) -> GroundResult<Self> {
        Self::new(time_step, vec![conditions; steps])
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&BoundaryConditions> {
        self.snapshots.get(index)
    }

    pub fn first(&self) -> &BoundaryConditions {
        &self.snapshots[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundaryConditions> {
        self.snapshots.iter()
    }

    /// Mean outdoor air temperature over the series.
    pub fn average_outdoor_temperature(&self) -> f64 {
        self.snapshots
            .iter()
            .map(|s| s.outdoor_temperature)
            .sum::<f64>()
            / self.snapshots.len() as f64
    }

    /// Total simulated duration [s].
    pub fn duration(&self) -> f64 {
        self.time_step * self.snapshots.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve_to_air() {
        let bc = BoundaryConditions::new(293.15, 273.15);
        assert_eq!(bc.sky_temperature(), 273.15);
        assert_eq!(bc.indoor_radiant_temperature(), 293.15);
        assert!(bc.validate().is_ok());
    }

    #[test]
    fn test_rejects_celsius_like_input() {
        let bc = BoundaryConditions::new(20.0, -5.0);
        let err = bc.validate().unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(
            err,
            GroundError::Boundary {
                region: "outdoor air",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_negative_wind() {
        let bc = BoundaryConditions::new(293.15, 273.15).with_wind_speed(-1.0);
        assert!(bc.validate().is_err());
    }

    #[test]
    fn test_series() {
        let snapshots = vec![
            BoundaryConditions::new(293.15, 270.0),
            BoundaryConditions::new(293.15, 280.0),
        ];
        let series = BoundaryConditionSeries::new(3600.0, snapshots).unwrap();
        assert_eq!(series.len(), 2);
        assert!((series.average_outdoor_temperature() - 275.0).abs() < 1e-12);
        assert!((series.duration() - 7200.0).abs() < 1e-12);
        assert!(BoundaryConditionSeries::new(0.0, vec![]).is_err());
        assert!(BoundaryConditionSeries::new(60.0, vec![]).is_err());
    }

    #[test]
    fn test_series_json_is_validated() {
        let good = r#"{"time_step": 3600.0, "snapshots": [{"indoor_temperature": 293.15, "outdoor_temperature": 273.15}]}"#;
        let series: BoundaryConditionSeries = serde_json::from_str(good).unwrap();
        assert_eq!(series.first().outdoor_temperature, 273.15);
        let back: BoundaryConditionSeries =
            serde_json::from_str(&serde_json::to_string(&series).unwrap()).unwrap();
        assert_eq!(back, series);

        for bad in [
            r#"{"time_step": 3600.0, "snapshots": []}"#,
            r#"{"time_step": -60.0, "snapshots": [{"indoor_temperature": 293.15, "outdoor_temperature": 273.15}]}"#,
            r#"{"time_step": 3600.0, "snapshots": [{"indoor_temperature": -5.0, "outdoor_temperature": 273.15}]}"#,
        ] {
            assert!(serde_json::from_str::<BoundaryConditionSeries>(bad).is_err(), "{bad}");
            let raw: RawSeries = serde_json::from_str(bad).unwrap();
            let err = BoundaryConditionSeries::try_from(raw).unwrap_err();
            assert!(matches!(err, GroundError::Boundary { .. }), "{err}");
        }
    }

    #[test]
    fn test_json_defaults() {
        let bc: BoundaryConditions =
            serde_json::from_str(r#"{"indoor_temperature": 295.0, "outdoor_temperature": 260.0}"#)
                .unwrap();
        assert_eq!(bc.local_wind_speed, 0.0);
        assert!(bc.sky_temperature.is_none());
    }
}
