//! Converter configuration.
//!
//! Parsed and owned by the host integration; the core only reads it. Every
//! field has a default so partial JSON documents load fine.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::util::{Chrono, Error, Result};

/// Name that makes velocity/acceleration lookups skip user attributes.
pub const BUILTIN_NAME: &str = "<builtin>";

/// Where the reference pose comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    /// Pref/Nref attributes on the shape itself
    #[default]
    Attributes,
    /// Attributes first, then the reference archive
    AttributesThenFile,
    /// Reference archive only
    File,
    /// Same archive, at `reference_frame`
    Frame,
}

impl ReferenceSource {
    pub fn uses_attributes(self) -> bool {
        matches!(self, Self::Attributes | Self::AttributesThenFile)
    }

    pub fn uses_file(self) -> bool {
        matches!(self, Self::AttributesThenFile | Self::File)
    }
}

/// Time at which non-position attributes are sampled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributesFrame {
    #[default]
    Render,
    /// Centre of the shutter interval
    Shutter,
    ShutterOpen,
    ShutterClose,
}

/// Settings that gate the attribute and motion engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProceduralConfig {
    // Time
    pub render_time: Chrono,
    /// Absolute motion sample times, ascending. Empty means `[render_time]`.
    pub motion_sample_times: Vec<Chrono>,
    pub fps: f64,
    pub attributes_frame: AttributesFrame,

    // Attribute collection
    pub read_object_attribs: bool,
    pub read_primitive_attribs: bool,
    pub read_point_attribs: bool,
    pub read_vertex_attribs: bool,
    pub force_constant_attributes: BTreeSet<String>,
    pub ignore_attributes: BTreeSet<String>,
    /// Longest matching prefix is stripped from attribute names
    pub remove_attribute_prefixes: BTreeSet<String>,

    // Motion
    /// User attribute holding velocities; `<builtin>` uses the archive's own
    pub velocity_name: Option<String>,
    pub acceleration_name: Option<String>,
    pub velocity_scale: f64,
    /// Extrapolate from velocities even when the topology is fixed
    pub force_velocity_blur: bool,

    // Reference pose
    pub output_reference: bool,
    pub reference_source: ReferenceSource,
    pub reference_frame: Option<f64>,
    pub reference_file: Option<PathBuf>,
    pub pref_name: String,
    pub nref_name: String,
    pub compute_reference_normals: bool,

    // Geometry
    pub reverse_winding: bool,
    /// Emit polygon mesh normals, smooth ones when the archive has none
    pub smoothing: bool,
    pub radius_min: f32,
    pub radius_max: f32,
    pub radius_scale: f32,
    pub width_min: f32,
    pub width_max: f32,
    pub width_scale: f32,
    /// Points per span when resampling b-spline curves
    pub nurbs_sample_rate: u32,

    pub verbose: bool,
}

impl Default for ProceduralConfig {
    fn default() -> Self {
        Self {
            render_time: 0.0,
            motion_sample_times: Vec::new(),
            fps: 24.0,
            attributes_frame: AttributesFrame::Render,
            read_object_attribs: true,
            read_primitive_attribs: true,
            read_point_attribs: true,
            read_vertex_attribs: true,
            force_constant_attributes: BTreeSet::new(),
            ignore_attributes: BTreeSet::new(),
            remove_attribute_prefixes: BTreeSet::new(),
            velocity_name: None,
            acceleration_name: None,
            velocity_scale: 1.0,
            force_velocity_blur: false,
            output_reference: false,
            reference_source: ReferenceSource::Attributes,
            reference_frame: None,
            reference_file: None,
            pref_name: "Pref".into(),
            nref_name: "Nref".into(),
            compute_reference_normals: false,
            reverse_winding: true,
            smoothing: true,
            radius_min: 0.0,
            radius_max: 1_000_000.0,
            radius_scale: 1.0,
            width_min: 0.0,
            width_max: 1_000_000.0,
            width_scale: 1.0,
            nurbs_sample_rate: 5,
            verbose: false,
        }
    }
}

impl ProceduralConfig {
    /// Parse from a JSON document and validate.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Write as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.fps <= 0.0 {
            return Err(Error::InvalidConfig(format!("fps must be positive, got {}", self.fps)));
        }
        if self.motion_sample_times.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::InvalidConfig("motion sample times must be ascending".into()));
        }
        let bounds = [
            ("radius_min", self.radius_min),
            ("radius_max", self.radius_max),
            ("radius_scale", self.radius_scale),
            ("width_min", self.width_min),
            ("width_max", self.width_max),
            ("width_scale", self.width_scale),
        ];
        if let Some((name, value)) = bounds.iter().find(|(_, v)| !v.is_finite()) {
            return Err(Error::InvalidConfig(format!("{name} must be finite, got {value}")));
        }
        if self.nurbs_sample_rate == 0 {
            return Err(Error::InvalidConfig("nurbs_sample_rate must be at least 1".into()));
        }
        if self.radius_min > self.radius_max {
            return Err(Error::InvalidConfig("radius_min exceeds radius_max".into()));
        }
        if self.width_min > self.width_max {
            return Err(Error::InvalidConfig("width_min exceeds width_max".into()));
        }
        if self.reference_source.uses_file() && self.reference_file.is_none() && self.output_reference {
            tracing::warn!("Reference source needs a file but none is set");
        }
        Ok(())
    }

    /// Motion sample times, falling back to the render time.
    pub fn sample_times(&self) -> Vec<Chrono> {
        if self.motion_sample_times.is_empty() {
            vec![self.render_time]
        } else {
            self.motion_sample_times.clone()
        }
    }

    pub fn num_motion_samples(&self) -> usize {
        self.motion_sample_times.len().max(1)
    }

    pub fn shutter_open(&self) -> Chrono {
        self.motion_sample_times.first().copied().unwrap_or(self.render_time)
    }

    pub fn shutter_close(&self) -> Chrono {
        self.motion_sample_times.last().copied().unwrap_or(self.render_time)
    }

    /// Time at which non-position attributes are read.
    pub fn attribute_sample_time(&self) -> Chrono {
        match self.attributes_frame {
            AttributesFrame::Render => self.render_time,
            AttributesFrame::Shutter => 0.5 * (self.shutter_open() + self.shutter_close()),
            AttributesFrame::ShutterOpen => self.shutter_open(),
            AttributesFrame::ShutterClose => self.shutter_close(),
        }
    }

    /// Reference frame converted to seconds.
    pub fn reference_time(&self) -> Option<Chrono> {
        self.reference_frame.map(|f| f / self.fps)
    }

    /// Pref/Nref attributes are read from the shape itself.
    pub fn reads_reference_attributes(&self) -> bool {
        self.output_reference && self.reference_source.uses_attributes()
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore_attributes.contains(name)
    }

    pub fn is_forced_constant(&self, name: &str) -> bool {
        self.force_constant_attributes.contains(name)
    }

    /// Strip the longest configured prefix, keeping at least one character.
    pub fn clean_name(&self, name: &str) -> String {
        let longest = self
            .remove_attribute_prefixes
            .iter()
            .filter(|p| name.len() > p.len() && name.starts_with(p.as_str()))
            .map(String::len)
            .max()
            .unwrap_or(0);
        name[longest..].to_owned()
    }

    /// Scale then clamp. Unlike `f32::clamp` this never panics on bad bounds.
    pub fn adjust_radius(&self, radius: f32) -> f32 {
        (radius * self.radius_scale).max(self.radius_min).min(self.radius_max)
    }

    pub fn adjust_width(&self, width: f32) -> f32 {
        (width * self.width_scale).max(self.width_min).min(self.width_max)
    }
}
