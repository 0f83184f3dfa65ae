use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const DEFAULT_VSPACE: i64 = 80;
const DEFAULT_HSPACE: i64 = 640;
const DEFAULT_LANES: i64 = 2;
const DEFAULT_BITS: i64 = 32;
const DEFAULT_FONT_SIZE: i64 = 14;
const DEFAULT_FONT_FAMILY: &str = "sans-serif";
const DEFAULT_FONT_WEIGHT: &str = "normal";
const MAX_DIMENSION: i64 = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionName {
    Vspace,
    Hspace,
    Lanes,
    Bits,
    FontSize,
}

impl OptionName {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Vspace => "vspace",
            Self::Hspace => "hspace",
            Self::Lanes => "lanes",
            Self::Bits => "bits",
            Self::FontSize => "fontsize",
        }
    }

    /// Inclusive upper bound. Keeps every coordinate and image dimension
    /// well inside `i64`.
    pub fn max(self) -> i64 {
        MAX_DIMENSION
    }

    /// Exclusive lower bound.
    pub fn min(self) -> i64 {
        match self {
            Self::Vspace => 19,
            Self::Hspace => 39,
            Self::Lanes => 0,
            Self::Bits => 4,
            Self::FontSize => 5,
        }
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionError {
    #[error("{option} must be greater than {min}, got {value}.")]
    InvalidOption {
        option: OptionName,
        min: i64,
        value: i64,
    },
    #[error("{option} must be at most {max}, got {value}.")]
    TooLarge {
        option: OptionName,
        max: i64,
        value: i64,
    },
    #[error("lanes must not exceed bits, got {lanes} lanes for {bits} bits.")]
    LanesExceedBits { lanes: i64, bits: i64 },
}

/// Unvalidated options as they appear in a config file or on the command line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsSpec {
    pub vspace: Option<i64>,
    pub hspace: Option<i64>,
    pub lanes: Option<i64>,
    pub bits: Option<i64>,
    pub fontsize: Option<i64>,
    pub bigendian: Option<bool>,
    pub fontfamily: Option<String>,
    pub fontweight: Option<String>,
}

impl OptionsSpec {
    /// Fields set in `other` win.
    pub fn merge(mut self, other: OptionsSpec) -> Self {
        self.vspace = other.vspace.or(self.vspace);
        self.hspace = other.hspace.or(self.hspace);
        self.lanes = other.lanes.or(self.lanes);
        self.bits = other.bits.or(self.bits);
        self.fontsize = other.fontsize.or(self.fontsize);
        self.bigendian = other.bigendian.or(self.bigendian);
        self.fontfamily = other.fontfamily.or(self.fontfamily);
        self.fontweight = other.fontweight.or(self.fontweight);
        self
    }

    pub fn build(self) -> Result<RenderOptions, OptionError> {
        let vspace = bounded(OptionName::Vspace, self.vspace, DEFAULT_VSPACE)?;
        let hspace = bounded(OptionName::Hspace, self.hspace, DEFAULT_HSPACE)?;
        let lanes = bounded(OptionName::Lanes, self.lanes, DEFAULT_LANES)?;
        let bits = bounded(OptionName::Bits, self.bits, DEFAULT_BITS)?;
        let fontsize = bounded(OptionName::FontSize, self.fontsize, DEFAULT_FONT_SIZE)?;
        // Each lane needs at least one bit column.
        if lanes > bits {
            return Err(OptionError::LanesExceedBits { lanes, bits });
        }
        let options = RenderOptions {
            vspace,
            hspace,
            lanes,
            bits,
            fontsize,
            bigendian: self.bigendian.unwrap_or(false),
            fontfamily: self
                .fontfamily
                .unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
            fontweight: self
                .fontweight
                .unwrap_or_else(|| DEFAULT_FONT_WEIGHT.to_string()),
        };
        tracing::debug!(
            vspace,
            hspace,
            lanes,
            bits,
            fontsize,
            lane_width = options.lane_width(),
            "resolved render options"
        );
        Ok(options)
    }
}

fn bounded(option: OptionName, value: Option<i64>, default: i64) -> Result<i64, OptionError> {
    let Some(value) = value else {
        return Ok(default);
    };
    if value <= option.min() {
        return Err(OptionError::InvalidOption {
            option,
            min: option.min(),
            value,
        });
    }
    if value > option.max() {
        return Err(OptionError::TooLarge {
            option,
            max: option.max(),
            value,
        });
    }
    Ok(value)
}

/// Validated, immutable render configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    vspace: i64,
    hspace: i64,
    lanes: i64,
    bits: i64,
    fontsize: i64,
    bigendian: bool,
    fontfamily: String,
    fontweight: String,
}

impl RenderOptions {
    /// Row height.
    pub fn vspace(&self) -> i64 {
        self.vspace
    }

    /// Row width.
    pub fn hspace(&self) -> i64 {
        self.hspace
    }

    pub fn lanes(&self) -> i64 {
        self.lanes
    }

    /// Total register width.
    pub fn bits(&self) -> i64 {
        self.bits
    }

    pub fn fontsize(&self) -> i64 {
        self.fontsize
    }

    /// Accepted and carried, but not consulted by the layout.
    pub fn bigendian(&self) -> bool {
        self.bigendian
    }

    pub fn fontfamily(&self) -> &str {
        &self.fontfamily
    }

    pub fn fontweight(&self) -> &str {
        &self.fontweight
    }

    /// Bits per lane. A remainder of `bits % lanes` is never drawn.
    pub fn lane_width(&self) -> i64 {
        self.bits / self.lanes
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            vspace: DEFAULT_VSPACE,
            hspace: DEFAULT_HSPACE,
            lanes: DEFAULT_LANES,
            bits: DEFAULT_BITS,
            fontsize: DEFAULT_FONT_SIZE,
            bigendian: false,
            fontfamily: DEFAULT_FONT_FAMILY.to_string(),
            fontweight: DEFAULT_FONT_WEIGHT.to_string(),
        }
    }
}

impl TryFrom<OptionsSpec> for RenderOptions {
    type Error = OptionError;

    fn try_from(spec: OptionsSpec) -> Result<Self, Self::Error> {
        spec.build()
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<OptionsSpec> {
    let Some(path) = path else {
        return Ok(OptionsSpec::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let parsed: OptionsSpec = serde_json::from_str(&contents)?;
    Ok(parsed)
}
