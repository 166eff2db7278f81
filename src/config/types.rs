use mediaprobe_av::ProbeConfig;
use serde::{Deserialize, Serialize};

/// Contents of a `mediaprobe.toml` file.
///
/// ```toml
/// [probe]
/// io_buffer_size = 32768
///
/// [probe.loader]
/// lib_dir = "~/ffmpeg-3.4/lib"
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Print JSON instead of text, as if `--json` were always given
    #[serde(default)]
    pub json: bool,

    /// Probe through an in-memory buffer, as if `--buffer` were always given
    #[serde(default)]
    pub buffer: bool,
}
