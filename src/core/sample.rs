//! Scope and topology variance tags carried by geometry samples.

/// Density of a geometry parameter relative to its primitive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum GeometryScope {
    /// One value for the whole primitive.
    #[default]
    Constant,
    /// One value per face or curve.
    Uniform,
    /// One value per point.
    Varying,
    /// One value per point (interpolated like varying).
    Vertex,
    /// One value per face corner, usually indexed.
    FaceVarying,
}

impl GeometryScope {
    /// Parse from the metadata string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "uni" | "uniform" => Self::Uniform,
            "var" | "varying" => Self::Varying,
            "vtx" | "vertex" => Self::Vertex,
            "fvr" | "facevarying" => Self::FaceVarying,
            _ => Self::Constant,
        }
    }

    /// Short metadata string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Constant => "con",
            Self::Uniform => "uni",
            Self::Varying => "var",
            Self::Vertex => "vtx",
            Self::FaceVarying => "fvr",
        }
    }
}

/// Whether connectivity changes between samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TopologyVariance {
    /// Topology changes every sample.
    #[default]
    Heterogeneous,
    /// Topology is fixed, only positions move.
    Homogeneous,
    /// Single sample.
    Static,
}

impl TopologyVariance {
    /// True when samples cannot be blended point-by-point.
    #[inline]
    pub fn is_varying(self) -> bool {
        matches!(self, Self::Heterogeneous)
    }
}
