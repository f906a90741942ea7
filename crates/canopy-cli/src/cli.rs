use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "canopy",
    about = "Canopy: adjust urban-canopy and land-cover fraction rasters from polygon attributes",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Classify a rule file into its processing mode
    Classify {
        /// Path to a JSON rule file (`{"IMD.tif": "pct", ...}`)
        #[arg(long)]
        rules: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check vector-mask attributes against MASK-mode constraints
    Validate {
        /// Path to a JSON rule file
        #[arg(long)]
        rules: String,

        /// Path to the GeoJSON vector mask
        #[arg(long)]
        vector: String,

        /// Layer that must not fall below `--lower`
        #[arg(long, default_value = "IMD")]
        upper: String,

        /// Layer bounded above by `--upper`
        #[arg(long, default_value = "BSF")]
        lower: String,

        /// Prefix marking sum-to-one fraction layers
        #[arg(long, default_value = "F_")]
        fraction_prefix: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a full adjustment from a TOML run config
    Apply {
        /// Path to the run config
        #[arg(long, default_value = "canopy.toml")]
        config: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compare raster CRS identifiers against the vector mask
    CrsCheck {
        /// Path to the run config
        #[arg(long, default_value = "canopy.toml")]
        config: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report cells where the upper raster falls below the lower raster
    Consistency {
        /// Upper raster (.json or .asc)
        #[arg(long)]
        upper: String,

        /// Lower raster (.json or .asc)
        #[arg(long)]
        lower: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
