use clap::Parser;
use tripline_lib::{Filter, LayerOptions, StyleRule, Symbol};

/// Style used when `--options` does not set one: two vendors plus a fallback
pub fn vendor_style() -> Vec<StyleRule> {
    vec![
        StyleRule::new(Filter::equals("vendor", 0), Symbol::new("rgb(253, 128, 93)")),
        StyleRule::new(Filter::equals("vendor", 1), Symbol::new("#17b8be")),
        StyleRule::new(true, Symbol::new("white").with_opacity(0.8)),
    ]
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Tripline Demo - Animate trips through a headless trail renderer
pub struct Settings {
    /// Layer options as a JSON object with camelCase keys; flags below override it
    #[clap(long, value_name = "JSON")]
    pub options: Option<String>,

    /// Time-scale multiplier
    #[clap(long)]
    pub speed: Option<f64>,

    /// Glow window length in timestamp units
    #[clap(long)]
    pub trail_length: Option<f64>,

    /// Animation period in timestamp units
    #[clap(long)]
    pub loop_time: Option<f64>,

    /// Global trail opacity (0-1)
    #[clap(long)]
    pub opacity: Option<f64>,

    /// Feature attribute holding the timestamp series
    #[clap(long)]
    pub time_property: Option<String>,

    /// Number of synthetic trips
    #[clap(long, default_value = "200")]
    pub trips: usize,

    /// Points per synthetic trip
    #[clap(long, default_value = "120")]
    pub points_per_trip: usize,

    /// Number of frames to draw
    #[clap(short, long, default_value = "300")]
    pub frames: usize,

    /// Seconds between frames
    #[clap(long, default_value = "0.1")]
    pub frame_interval: f64,

    /// Map centre longitude
    #[clap(long, default_value = "-74.0", allow_negative_numbers = true)]
    pub lon: f64,

    /// Map centre latitude
    #[clap(long, default_value = "40.72", allow_negative_numbers = true)]
    pub lat: f64,

    /// Screen pixels panned east per frame during the opening pan
    #[clap(long, default_value = "4.0", allow_negative_numbers = true)]
    pub pan_step: f64,

    /// Map zoom level at startup
    #[clap(short, long, default_value = "12.0")]
    pub zoom: f64,

    /// Sleep between frames and use the wall clock instead of simulated time
    #[clap(long, default_value = "false")]
    pub realtime: bool,
}

impl Settings {
    /// Merge the JSON options (if any) with the command-line overrides
    pub fn layer_options(&self) -> Result<LayerOptions, serde_json::Error> {
        let mut options = match &self.options {
            Some(json) => {
                let value: serde_json::Value = serde_json::from_str(json)?;
                let has_style = value.get("style").is_some();
                let mut options: LayerOptions = serde_json::from_value(value)?;
                if !has_style {
                    options.style = vendor_style();
                }
                options
            }
            None => LayerOptions {
                style: vendor_style(),
                ..Default::default()
            },
        };
        if let Some(speed) = self.speed {
            options.speed = speed;
        }
        if let Some(trail_length) = self.trail_length {
            options.trail_length = trail_length;
        }
        if let Some(loop_time) = self.loop_time {
            options.loop_time = loop_time;
        }
        if let Some(opacity) = self.opacity {
            options.opacity = opacity;
        }
        if let Some(time_property) = &self.time_property {
            options.time_property = time_property.clone();
        }
        Ok(options)
    }
}
