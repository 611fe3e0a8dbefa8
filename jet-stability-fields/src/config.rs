use crate::ambient::AmbientConditions;
use crate::case::CaseSelector;
use crate::conversion::PressureScaling;
use crate::query::{DomainWindow, FieldLabel};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Location of the solver outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub root: PathBuf,
}

impl DataConfig {
    fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(anyhow!("data.root must not be empty"));
        }
        Ok(())
    }
}

/// Operating case and forcing frequency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseConfig {
    pub case_id: i64,
    pub strouhal: f64,
}

impl CaseConfig {
    fn validate(&self) -> Result<()> {
        CaseSelector::new(self.case_id, self.strouhal).map_err(|e| anyhow!("case: {}", e))?;
        Ok(())
    }
}

/// Total-field reconstruction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalConfig {
    #[serde(default)]
    pub phase_percent: f64,
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    #[serde(default = "default_frames")]
    pub frames: usize,
}

fn default_amplitude() -> f64 {
    crate::perturbation::DEFAULT_AMPLITUDE
}

fn default_frames() -> usize {
    1
}

impl Default for TotalConfig {
    fn default() -> Self {
        Self {
            phase_percent: 0.0,
            amplitude: default_amplitude(),
            frames: default_frames(),
        }
    }
}

impl TotalConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.phase_percent) {
            return Err(anyhow!(
                "phase_percent must be in [0, 100], got {}",
                self.phase_percent
            ));
        }
        if !(self.amplitude >= 0.0) {
            return Err(anyhow!("amplitude must be non-negative, got {}", self.amplitude));
        }
        if self.frames == 0 {
            return Err(anyhow!("frames must be at least 1"));
        }
        Ok(())
    }

    /// Phases rendered: the configured phase alone, or `frames` evenly spaced
    /// phases over one period starting from it.
    pub fn phases(&self) -> Vec<f64> {
        if self.frames == 1 {
            return vec![self.phase_percent];
        }
        (0..self.frames)
            .map(|n| (self.phase_percent + 100.0 * n as f64 / self.frames as f64) % 100.0)
            .collect()
    }
}

/// Reference-system conversion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionConfig {
    #[serde(default)]
    pub pressure_scaling: PressureScaling,
    #[serde(default)]
    pub ambient: AmbientConditions,
}

impl ConversionConfig {
    fn validate(&self) -> Result<()> {
        self.ambient
            .validate()
            .map_err(|e| anyhow!("conversion.ambient: {}", e))
    }
}

/// Visualization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
    #[serde(default)]
    pub x_min: f64,
    #[serde(default = "default_x_max")]
    pub x_max: f64,
    #[serde(default)]
    pub r_min: f64,
    #[serde(default = "default_r_max")]
    pub r_max: f64,
    #[serde(default = "default_image_width")]
    pub image_width: u32,
    #[serde(default = "default_image_height")]
    pub image_height: u32,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Also plot the local wavenumber alpha(x) of the stability record
    #[serde(default)]
    pub plot_alpha: bool,
}

fn default_fields() -> Vec<String> {
    vec!["total:ux".to_string()]
}

fn default_x_max() -> f64 {
    10.0
}

fn default_r_max() -> f64 {
    3.0
}

fn default_image_width() -> u32 {
    1200
}

fn default_image_height() -> u32 {
    600
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            fields: default_fields(),
            x_min: 0.0,
            x_max: default_x_max(),
            r_min: 0.0,
            r_max: default_r_max(),
            image_width: default_image_width(),
            image_height: default_image_height(),
            output_dir: default_output_dir(),
            plot_alpha: false,
        }
    }
}

impl VisualizationConfig {
    fn validate(&self) -> Result<()> {
        self.labels()?;
        self.window()?;
        if self.image_width == 0 || self.image_height == 0 {
            return Err(anyhow!(
                "Image dimensions must be positive (width={}, height={})",
                self.image_width,
                self.image_height
            ));
        }
        Ok(())
    }

    pub fn labels(&self) -> Result<Vec<FieldLabel>> {
        self.fields
            .iter()
            .map(|f| {
                f.parse::<FieldLabel>()
                    .map_err(|e| anyhow!("Invalid field '{}': {}", f, e))
            })
            .collect()
    }

    pub fn window(&self) -> Result<DomainWindow> {
        DomainWindow::new(self.x_min, self.x_max, self.r_min, self.r_max)
            .context("Invalid visualization window")
    }
}

/// `.npy` export of total fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub dir: PathBuf,
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub case: CaseConfig,
    #[serde(default)]
    pub total: TotalConfig,
    #[serde(default)]
    pub conversion: ConversionConfig,
    #[serde(default)]
    pub visualization: VisualizationConfig,
    #[serde(default)]
    pub export: Option<ExportConfig>,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| anyhow!("Failed to parse TOML config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.data.validate()?;
        self.case.validate()?;
        self.total.validate()?;
        self.conversion.validate()?;
        self.visualization.validate()?;
        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        println!("=== Jet Field Configuration ===");
        println!("Data: {}", self.data.root.display());
        println!(
            "Case: {} at St={}",
            self.case.case_id, self.case.strouhal
        );
        println!(
            "Total field: amplitude={}, phase={}%, {} frame(s)",
            self.total.amplitude, self.total.phase_percent, self.total.frames
        );
        println!("Pressure scaling: {:?}", self.conversion.pressure_scaling);
        println!(
            "Visualization: {} over x/D in [{}, {}], r/D in [{}, {}], {}x{} px -> {}",
            self.visualization.fields.join(", "),
            self.visualization.x_min,
            self.visualization.x_max,
            self.visualization.r_min,
            self.visualization.r_max,
            self.visualization.image_width,
            self.visualization.image_height,
            self.visualization.output_dir.display()
        );
        if self.visualization.plot_alpha {
            println!("Alpha plot: on");
        }
        if let Some(export) = &self.export {
            println!("Export: {}", export.dir.display());
        }
        println!("===============================");
    }
}
