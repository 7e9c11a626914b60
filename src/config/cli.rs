use crate::domain::model::{FilterCriteria, MAX_HOURLY_RATE_BOUND, MAX_RATING};
use crate::utils::error::Result;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "waqti")]
#[command(about = "Browse the Waqti time-bank catalog and manage your session")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "waqti.toml")]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List services matching the given filters
    Services(FilterArgs),
    /// Top rated services
    Popular {
        #[arg(long, default_value = "6")]
        limit: usize,
    },
    /// Show a single service
    Show { id: String },
    /// List the locations present in the catalog
    Locations,
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        phone: String,
    },
    Logout,
    /// Print the signed-in member
    Whoami,
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    #[arg(long, default_value = "")]
    pub search: String,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub location: Option<String>,

    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=MAX_RATING as i64))]
    pub min_rating: u8,

    #[arg(long, default_value_t = MAX_HOURLY_RATE_BOUND, value_parser = clap::value_parser!(u32).range(1..=MAX_HOURLY_RATE_BOUND as i64))]
    pub max_hours: u32,
}

impl FilterArgs {
    pub fn to_criteria(&self) -> Result<FilterCriteria> {
        Ok(FilterCriteria {
            search: self.search.clone(),
            category: self.category.as_deref().map(str::parse).transpose()?,
            location: self.location.clone().filter(|l| !l.is_empty()),
            min_rating: self.min_rating,
            max_hourly_rate: self.max_hours,
        })
    }
}
