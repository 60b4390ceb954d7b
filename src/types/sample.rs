//! Sample submission, measured water parameters and spectra

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::config::defaults::{MIN_SPECTRUM_POINTS, SPECTRUM_LENGTH};
use crate::config::DerivedParameterConfig;

/// Errors raised while building a submission. A submission that fails
/// validation never reaches the pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmissionError {
    #[error("{name} must be a finite number (got {value})")]
    NonFinite { name: &'static str, value: f64 },

    #[error("{name} = {value} outside accepted range [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("confidence threshold {0} must be within [0, 1]")]
    InvalidThreshold(f64),

    #[error("spectrum needs at least {needed} points, got {available}")]
    SpectrumTooShort { needed: usize, available: usize },

    #[error("spectrum line {line}: {reason}")]
    SpectrumParse { line: usize, reason: String },
}

// ============================================================================
// Measurements
// ============================================================================

/// Field measurements taken with the sample.
///
/// Defaults are the reference values pre-filled on the sample form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterMeasurements {
    /// Water temperature (deg C)
    pub temperature: f64,
    pub ph: f64,
    /// Turbidity (NTU)
    pub turbidity: f64,
    /// Dissolved oxygen (mg/L)
    pub dissolved_oxygen: f64,
    /// Conductivity (uS/cm)
    pub conductivity: f64,
    /// Biochemical oxygen demand (mg/L)
    pub bod: f64,
    /// Chemical oxygen demand (mg/L)
    pub cod: f64,
    /// Total dissolved solids (mg/L)
    pub tds: f64,
    pub nitrate: f64,
    pub phosphate: f64,
    pub chloride: f64,
    /// Fecal coliform (MPN/100 ml)
    pub fecal_coliform: f64,
}

impl Default for WaterMeasurements {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            ph: 7.0,
            turbidity: 25.0,
            dissolved_oxygen: 7.5,
            conductivity: 450.0,
            bod: 10.0,
            cod: 35.0,
            tds: 300.0,
            nitrate: 8.5,
            phosphate: 2.1,
            chloride: 85.0,
            fecal_coliform: 150.0,
        }
    }
}

/// Accepted instrument range per measurement: (name, min, max).
const MEASUREMENT_RANGES: [(&str, f64, f64); 12] = [
    ("temperature", 10.0, 40.0),
    ("ph", 0.0, 14.0),
    ("turbidity", 0.0, 100.0),
    ("dissolved_oxygen", 0.0, 15.0),
    ("conductivity", 0.0, 2000.0),
    ("bod", 0.0, 50.0),
    ("cod", 0.0, 200.0),
    ("tds", 0.0, 2000.0),
    ("nitrate", 0.0, 50.0),
    ("phosphate", 0.0, 20.0),
    ("chloride", 0.0, 500.0),
    ("fecal_coliform", 0.0, 10000.0),
];

impl WaterMeasurements {
    /// Values in the same order as `MEASUREMENT_RANGES`.
    fn values(&self) -> [f64; 12] {
        [
            self.temperature,
            self.ph,
            self.turbidity,
            self.dissolved_oxygen,
            self.conductivity,
            self.bod,
            self.cod,
            self.tds,
            self.nitrate,
            self.phosphate,
            self.chloride,
            self.fecal_coliform,
        ]
    }

    /// Check every value is finite and inside its instrument range.
    pub fn validate(&self) -> Result<(), SubmissionError> {
        for (&(name, min, max), value) in MEASUREMENT_RANGES.iter().zip(self.values()) {
            if !value.is_finite() {
                return Err(SubmissionError::NonFinite { name, value });
            }
            if value < min || value > max {
                return Err(SubmissionError::OutOfRange { name, value, min, max });
            }
        }
        Ok(())
    }
}

// ============================================================================
// Parameter Vector
// ============================================================================

/// Fixed, case-sensitive vocabulary of the water parameter map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterParameter {
    Temperature,
    Ph,
    DissolvedOxygen,
    Conductivity,
    Turbidity,
    Tds,
    Bod,
    Cod,
    Nitrate,
    Phosphate,
    FecalColiform,
    TotalColiform,
    Chloride,
    Fluoride,
    Hardness,
    Alkalinity,
}

impl WaterParameter {
    pub const ALL: [WaterParameter; 16] = [
        WaterParameter::Temperature,
        WaterParameter::Ph,
        WaterParameter::DissolvedOxygen,
        WaterParameter::Conductivity,
        WaterParameter::Turbidity,
        WaterParameter::Tds,
        WaterParameter::Bod,
        WaterParameter::Cod,
        WaterParameter::Nitrate,
        WaterParameter::Phosphate,
        WaterParameter::FecalColiform,
        WaterParameter::TotalColiform,
        WaterParameter::Chloride,
        WaterParameter::Fluoride,
        WaterParameter::Hardness,
        WaterParameter::Alkalinity,
    ];

    pub fn key(self) -> &'static str {
        match self {
            WaterParameter::Temperature => "temperature",
            WaterParameter::Ph => "ph",
            WaterParameter::DissolvedOxygen => "dissolved_oxygen",
            WaterParameter::Conductivity => "conductivity",
            WaterParameter::Turbidity => "turbidity",
            WaterParameter::Tds => "tds",
            WaterParameter::Bod => "bod",
            WaterParameter::Cod => "cod",
            WaterParameter::Nitrate => "nitrate",
            WaterParameter::Phosphate => "phosphate",
            WaterParameter::FecalColiform => "fecal_coliform",
            WaterParameter::TotalColiform => "total_coliform",
            WaterParameter::Chloride => "chloride",
            WaterParameter::Fluoride => "fluoride",
            WaterParameter::Hardness => "hardness",
            WaterParameter::Alkalinity => "alkalinity",
        }
    }
}

impl fmt::Display for WaterParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for WaterParameter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.key() == s)
            .ok_or_else(|| format!("unknown water parameter '{s}'"))
    }
}

/// Complete parameter vector handed to the index scorer and the physics
/// predictor. Always carries all sixteen keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterVector(BTreeMap<WaterParameter, f64>);

impl ParameterVector {
    /// Build the vector from field measurements, filling the four unmeasured
    /// keys from `derived`.
    pub fn from_measurements(m: &WaterMeasurements, derived: &DerivedParameterConfig) -> Self {
        use WaterParameter as P;

        let values = BTreeMap::from([
            (P::Temperature, m.temperature),
            (P::Ph, m.ph),
            (P::DissolvedOxygen, m.dissolved_oxygen),
            (P::Conductivity, m.conductivity),
            (P::Turbidity, m.turbidity),
            (P::Tds, m.tds),
            (P::Bod, m.bod),
            (P::Cod, m.cod),
            (P::Nitrate, m.nitrate),
            (P::Phosphate, m.phosphate),
            (P::FecalColiform, m.fecal_coliform),
            (P::TotalColiform, m.fecal_coliform * derived.total_coliform_factor),
            (P::Chloride, m.chloride),
            (P::Fluoride, derived.fluoride),
            (P::Hardness, derived.hardness),
            (P::Alkalinity, derived.alkalinity),
        ]);
        Self(values)
    }

    pub fn get(&self, parameter: WaterParameter) -> Option<f64> {
        self.0.get(&parameter).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (WaterParameter, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Image & Spectrum
// ============================================================================

/// Raw sample image as uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleImage {
    pub bytes: Vec<u8>,
    pub name: Option<String>,
}

impl SampleImage {
    pub fn new(bytes: Vec<u8>, name: Option<String>) -> Self {
        Self { bytes, name }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumPoint {
    /// Raman shift (cm^-1)
    pub wavenumber: f64,
    /// Intensity (a.u.)
    pub intensity: f64,
}

/// Spectrometer reading supplied alongside (not derived from) the image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    points: Vec<SpectrumPoint>,
}

impl Spectrum {
    pub fn new(points: Vec<SpectrumPoint>) -> Result<Self, SubmissionError> {
        if points.len() < MIN_SPECTRUM_POINTS {
            return Err(SubmissionError::SpectrumTooShort {
                needed: MIN_SPECTRUM_POINTS,
                available: points.len(),
            });
        }
        for p in &points {
            if !p.wavenumber.is_finite() {
                return Err(SubmissionError::NonFinite { name: "wavenumber", value: p.wavenumber });
            }
            if !p.intensity.is_finite() {
                return Err(SubmissionError::NonFinite { name: "intensity", value: p.intensity });
            }
        }
        Ok(Self { points })
    }

    /// Parse a CSV export with `wavenumber` and `intensity` columns.
    ///
    /// Extra columns are ignored; column order is taken from the header.
    pub fn from_csv_str(text: &str) -> Result<Self, SubmissionError> {
        let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

        let (_, header) = lines.next().ok_or(SubmissionError::SpectrumTooShort {
            needed: MIN_SPECTRUM_POINTS,
            available: 0,
        })?;
        let columns: Vec<String> = header
            .split(',')
            .map(|c| c.trim().trim_matches('"').to_ascii_lowercase())
            .collect();
        let position = |name: &str| {
            columns.iter().position(|c| c == name).ok_or_else(|| SubmissionError::SpectrumParse {
                line: 1,
                reason: format!("missing '{name}' column"),
            })
        };
        let wn_idx = position("wavenumber")?;
        let int_idx = position("intensity")?;

        let mut points = Vec::new();
        for (idx, line) in lines {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let parse = |i: usize, name: &str| -> Result<f64, SubmissionError> {
                fields
                    .get(i)
                    .ok_or_else(|| SubmissionError::SpectrumParse {
                        line: idx + 1,
                        reason: format!("missing {name} field"),
                    })?
                    .parse::<f64>()
                    .map_err(|e| SubmissionError::SpectrumParse {
                        line: idx + 1,
                        reason: format!("{name}: {e}"),
                    })
            };
            points.push(SpectrumPoint {
                wavenumber: parse(wn_idx, "wavenumber")?,
                intensity: parse(int_idx, "intensity")?,
            });
        }

        Self::new(points)
    }

    pub fn points(&self) -> &[SpectrumPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Linearly interpolate the intensities onto `len` evenly spaced sample
    /// indices, the fixed input width of the material classifier.
    pub fn resample(&self, len: usize) -> Vec<f64> {
        let src: Vec<f64> = self.points.iter().map(|p| p.intensity).collect();
        if len == 0 {
            return Vec::new();
        }
        if src.len() == len {
            return src;
        }
        let last = (src.len() - 1) as f64;
        (0..len)
            .map(|i| {
                let x = if len == 1 { 0.0 } else { i as f64 * last / (len - 1) as f64 };
                let lo = x.floor() as usize;
                let hi = (lo + 1).min(src.len() - 1);
                let frac = x - lo as f64;
                src[lo] + (src[hi] - src[lo]) * frac
            })
            .collect()
    }

    /// Resample to the classifier width.
    pub fn classifier_input(&self) -> Vec<f64> {
        self.resample(SPECTRUM_LENGTH)
    }
}

// ============================================================================
// Submission
// ============================================================================

/// A validated sample submission. Immutable once built: the pipeline takes it
/// by value and only reads from it.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSubmission {
    image: Option<SampleImage>,
    spectrum: Option<Spectrum>,
    measurements: WaterMeasurements,
    confidence_threshold: f64,
}

impl SampleSubmission {
    pub fn new(
        measurements: WaterMeasurements,
        confidence_threshold: f64,
    ) -> Result<Self, SubmissionError> {
        if !confidence_threshold.is_finite() || !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(SubmissionError::InvalidThreshold(confidence_threshold));
        }
        measurements.validate()?;
        Ok(Self {
            image: None,
            spectrum: None,
            measurements,
            confidence_threshold,
        })
    }

    pub fn with_image(mut self, image: SampleImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_spectrum(mut self, spectrum: Spectrum) -> Self {
        self.spectrum = Some(spectrum);
        self
    }

    pub fn image(&self) -> Option<&SampleImage> {
        self.image.as_ref()
    }

    pub fn spectrum(&self) -> Option<&Spectrum> {
        self.spectrum.as_ref()
    }

    pub fn measurements(&self) -> &WaterMeasurements {
        &self.measurements
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }
}

/// Wire/file form of a submission (TOML for the CLI, JSON for the API).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionInput {
    #[serde(default)]
    pub measurements: WaterMeasurements,

    /// Falls back to the role threshold when absent
    #[serde(default)]
    pub confidence_threshold: Option<f64>,

    /// Inline image bytes (API)
    #[serde(default)]
    pub image: Option<Vec<u8>>,

    #[serde(default)]
    pub image_name: Option<String>,

    /// Image file, resolved relative to the submission file (CLI)
    #[serde(default)]
    pub image_path: Option<PathBuf>,

    #[serde(default)]
    pub spectrum: Option<Vec<SpectrumPoint>>,

    /// Spectrum CSV file, resolved relative to the submission file (CLI)
    #[serde(default)]
    pub spectrum_path: Option<PathBuf>,
}

impl SubmissionInput {
    /// Validate into a submission using inline image/spectrum data only.
    pub fn into_submission(self, default_threshold: f64) -> Result<SampleSubmission, SubmissionError> {
        let threshold = self.confidence_threshold.unwrap_or(default_threshold);
        let mut submission = SampleSubmission::new(self.measurements, threshold)?;
        if let Some(bytes) = self.image {
            submission = submission.with_image(SampleImage::new(bytes, self.image_name));
        }
        if let Some(points) = self.spectrum {
            submission = submission.with_spectrum(Spectrum::new(points)?);
        }
        Ok(submission)
    }

    /// Read `image_path` / `spectrum_path` (relative to `base`) into the
    /// inline fields.
    pub fn resolve_files(mut self, base: &Path) -> std::io::Result<Self> {
        if let Some(rel) = self.image_path.take() {
            let path = base.join(rel);
            self.image = Some(std::fs::read(&path)?);
            if self.image_name.is_none() {
                self.image_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
            }
        }
        if let Some(rel) = self.spectrum_path.take() {
            let text = std::fs::read_to_string(base.join(rel))?;
            let spectrum = Spectrum::from_csv_str(&text)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            self.spectrum = Some(spectrum.points().to_vec());
        }
        Ok(self)
    }
}
